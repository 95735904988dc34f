use clap::Parser;
use color_eyre::Result;
use pinpoint_tui::{
    app::{Action, App},
    clipboard,
    config::{self, Config},
    events::{Event, EventHandler},
    geocode::{AddressResolver, GoogleGeocoder},
    location::Acquirer,
    logging, ui,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, path::PathBuf, sync::Arc};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};

/// Find your location, see it on a map and share it as a link.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Shared link (or bare `?lat=..&lng=..` query) to open instead of locating
    link: Option<String>,

    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config);

    // Instrumentation and safety
    let _log_guard = logging::initialize_logging(&config.logging);
    color_eyre::install()?;
    install_panic_hook();
    info!("Configuration loaded from {}", args.config.display());

    let geocoder = GoogleGeocoder::new(config::maps_api_key())?;
    if !geocoder.is_available() {
        info!("No maps API key configured, running in demo mode");
    }
    let demo_mode = !geocoder.is_available();
    let resolver: Arc<dyn AddressResolver> = Arc::new(geocoder);
    let acquirer = Arc::new(Acquirer::from_config(&config.location));

    // Ready terminal and state
    let mut terminal = setup_terminal()?;
    let mut app = App::new(&config, demo_mode);
    let mut event_handler = EventHandler::new(config.ui.tick_rate_ms);
    let tx = event_handler.tx.clone();

    let actions = app.start(args.link.as_deref());
    dispatch(actions, &mut app, &acquirer, &resolver, &tx);

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        match event_handler.next().await {
            Some(event) => {
                let actions = app.handle_event(event);
                dispatch(actions, &mut app, &acquirer, &resolver, &tx);
            }
            None => break,
        }
    }

    restore_terminal(terminal)?;
    Ok(())
}

/// Carries out the side effects the session asked for. Lookups run as
/// background tasks and report back through `tx`; a send after shutdown
/// is simply dropped.
fn dispatch(
    actions: Vec<Action>,
    app: &mut App,
    acquirer: &Arc<Acquirer>,
    resolver: &Arc<dyn AddressResolver>,
    tx: &UnboundedSender<Event>,
) {
    for action in actions {
        match action {
            Action::Acquire => {
                let acquirer = Arc::clone(acquirer);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = acquirer.acquire().await;
                    let _ = tx.send(Event::Located(result));
                });
            }
            Action::Resolve {
                generation,
                position,
            } => {
                let resolver = Arc::clone(resolver);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = resolver.resolve(&position).await;
                    let _ = tx.send(Event::AddressResolved { generation, result });
                });
            }
            Action::Copy(link) => match clipboard::copy(&link) {
                Ok(()) => app.on_copied(true),
                Err(e) => {
                    error!("Clipboard write failed: {}", e);
                    app.on_copied(false);
                }
            },
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen, crossterm::cursor::Hide)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show)?;
    Ok(())
}

fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Force terminal cleanup!
        crossterm::terminal::disable_raw_mode().ok();
        crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show).ok();
        original_hook(panic_info);
    }));
}
