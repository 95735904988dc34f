//! TUI rendering for the Pinpoint tracker
//!
//! Draws the single tracker screen with `ratatui`: a world map centered on
//! the current position, the coordinate readout, the resolved address and
//! the share link panel, plus demo-mode and error banners.

use crate::app::App;
use ratatui::{
    prelude::*,
    widgets::{canvas::*, *},
};

use ratatui::text::Line;

/// Renders one frame of the TUI based on current application state.
///
/// # Arguments
///
/// * `f` - The ratatui frame to draw into (from `terminal.draw()`).
/// * `app` - Current application state.
pub fn render(f: &mut Frame, app: &App) {
    let banner_height = |shown: bool, h: u16| if shown { h } else { 0 };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(banner_height(app.demo_mode, 1)),
            Constraint::Length(banner_height(app.state.error.is_some(), 3)),
            Constraint::Min(10),
            Constraint::Length(1),
        ])
        .split(f.size());

    render_header(f, app, rows[0]);
    if app.demo_mode {
        let demo = Paragraph::new(
            " ⚠ Demo mode - set PINPOINT_MAPS_API_KEY for address lookup",
        )
        .style(Style::default().fg(Color::Yellow));
        f.render_widget(demo, rows[1]);
    }
    if let Some(ref error) = app.state.error {
        let banner = Paragraph::new(format!(" ⚠ {}", error))
            .style(Style::default().fg(Color::LightRed))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            );
        f.render_widget(banner, rows[2]);
    }

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(rows[3]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(4)])
        .split(body[0]);
    render_map(f, app, left[0]);
    render_readout(f, app, left[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(6)])
        .split(body[1]);
    render_details(f, app, right[0]);
    render_share(f, app, right[1]);

    let help = Paragraph::new(" r refresh   c copy link   +/- zoom   q quit")
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, rows[4]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let status = if app.state.tracking {
        // Cheap spinner driven by the tick counter
        let frames = ['◐', '◓', '◑', '◒'];
        Span::styled(
            format!("{} Tracking...", frames[app.tick_count % frames.len()]),
            Style::default().fg(Color::Cyan),
        )
    } else {
        Span::styled(app.state.source.label(), Style::default().fg(Color::Magenta))
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " ⌖ Location Tracker ",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("│ "),
        status,
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(header, area);
}

fn render_map(f: &mut Frame, app: &App, area: Rect) {
    let pos = app.state.position;
    let span = app.map_span;

    // Terminal cells are roughly twice as tall as wide
    let map = Canvas::default()
        .block(Block::bordered().title(" Your Location on Map "))
        .marker(symbols::Marker::Braille)
        .x_bounds([pos.longitude - span * 2.0, pos.longitude + span * 2.0])
        .y_bounds([pos.latitude - span, pos.latitude + span])
        .paint(move |ctx| {
            ctx.draw(&Map {
                color: Color::Rgb(70, 70, 90),
                resolution: MapResolution::High,
            });
            ctx.layer();
            ctx.print(
                pos.longitude,
                pos.latitude,
                Line::from(Span::styled(
                    "◉",
                    Style::default()
                        .fg(Color::LightBlue)
                        .add_modifier(Modifier::BOLD),
                )),
            );
        });
    f.render_widget(map, area);
}

fn render_readout(f: &mut Frame, app: &App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let pos = app.state.position;
    let coords = Paragraph::new(format!(" {:.6}, {:.6}", pos.latitude, pos.longitude))
        .block(Block::bordered().title(" Coordinates "));
    f.render_widget(coords, cols[0]);

    let accuracy = match pos.accuracy {
        Some(meters) => format!(" ±{:.2} meters", meters),
        None => " Unknown".to_string(),
    };
    f.render_widget(
        Paragraph::new(accuracy).block(Block::bordered().title(" Accuracy ")),
        cols[1],
    );
}

fn render_details(f: &mut Frame, app: &App, area: Rect) {
    let label = Style::default().add_modifier(Modifier::BOLD);
    let captured = app
        .state
        .position
        .captured_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "—".to_string());

    let lines = vec![
        Line::from(Span::styled("Approximate Address", label)),
        Line::from(Span::styled(
            app.state.address.display(),
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Captured: ", label),
            Span::raw(captured),
        ]),
    ];

    let details = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(" Location Details ")
            .borders(Borders::ALL)
            .padding(Padding::horizontal(1)),
    );
    f.render_widget(details, area);
}

fn render_share(f: &mut Frame, app: &App, area: Rect) {
    let link = match app.state.share_link.as_deref() {
        Some(link) => Span::styled(link, Style::default().fg(Color::Yellow)),
        None if app.state.tracking => Span::styled(
            "Generating share link...",
            Style::default().fg(Color::DarkGray),
        ),
        None => Span::styled("No link yet", Style::default().fg(Color::DarkGray)),
    };
    let copy = if app.is_copied() {
        Span::styled("Copied!", Style::default().fg(Color::Green))
    } else if app.state.share_link.is_some() {
        Span::raw("Press c to copy")
    } else {
        Span::raw("")
    };

    let lines = vec![
        Line::from("Share this link to show your current location:"),
        Line::from(""),
        Line::from(link),
        Line::from(""),
        Line::from(copy),
        Line::from(Span::styled(
            "The link only contains your coordinates.",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let share = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(" Share Your Location ")
            .borders(Borders::ALL)
            .padding(Padding::horizontal(1)),
    );
    f.render_widget(share, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::events::Event;
    use crate::geocode::ResolveError;
    use crate::location::AcquisitionError;
    use ratatui::backend::TestBackend;

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(200, 50)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn unavailable_address_still_shows_link_and_map() {
        let mut app = App::new(&Config::default(), true);
        app.start(Some("?lat=51.5&lng=-0.12&t=123"));
        app.handle_event(Event::AddressResolved {
            generation: 1,
            result: Err(ResolveError::CapabilityUnavailable),
        });

        let text = screen(&app);
        assert!(text.to_lowercase().contains("address not available"));
        assert!(text.contains("Your Location on Map"));
        assert!(text.contains("51.500000, -0.120000"));
        assert!(text.contains("lat=51.5&lng=-0.12"));
        assert!(text.contains("Demo mode"));
    }

    #[test]
    fn permission_error_is_bannered() {
        let mut app = App::new(&Config::default(), false);
        app.start(None);
        app.handle_event(Event::Located(Err(AcquisitionError::PermissionDenied)));

        let text = screen(&app);
        assert!(text.contains("allow location access"));
        assert!(text.contains("No link yet"));
    }
}
