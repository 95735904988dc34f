use crate::config::{Config, ShareConfig};
use crate::events::Event;
use crate::geocode::ResolveError;
use crate::link::{self, DecodeError};
use crate::location::AcquisitionError;
use crate::models::{Position, PositionSource};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const COPY_FEEDBACK: Duration = Duration::from_secs(2);
const MIN_SPAN: f64 = 0.01;
const MAX_SPAN: f64 = 90.0;

/// Side effects requested by the session. `main.rs` carries them out and
/// feeds the outcome back as an [`Event`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Acquire,
    Resolve { generation: u64, position: Position },
    Copy(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AddressState {
    Idle,
    Loading,
    Resolved(String),
    Failed(ResolveError),
}

impl AddressState {
    pub fn display(&self) -> &str {
        match self {
            AddressState::Idle => "Address not available",
            AddressState::Loading => "Resolving address...",
            AddressState::Resolved(address) => address.as_str(),
            AddressState::Failed(e) => e.placeholder(),
        }
    }
}

/// Everything the tracker screen shows. Replaced as a whole on each
/// transition, never patched field by field from the outside.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerState {
    pub position: Position,
    pub source: PositionSource,
    /// An acquisition is in flight; no second one may start.
    pub tracking: bool,
    pub share_link: Option<String>,
    pub address: AddressState,
    pub error: Option<String>,
    pub copied_at: Option<Instant>,
}

pub struct App {
    pub state: TrackerState,
    pub share: ShareConfig,
    pub demo_mode: bool,
    pub map_span: f64,
    /// Bumped on every position change so stale lookups can be dropped.
    pub generation: u64,
    pub tick_count: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: &Config, demo_mode: bool) -> Self {
        Self {
            state: TrackerState {
                position: Position::new(config.location.fallback_lat, config.location.fallback_lon),
                source: PositionSource::Fallback,
                tracking: false,
                share_link: None,
                address: AddressState::Idle,
                error: None,
                copied_at: None,
            },
            share: config.share.clone(),
            demo_mode,
            map_span: config.ui.map_span_degrees.clamp(MIN_SPAN, MAX_SPAN),
            generation: 0,
            tick_count: 0,
            should_quit: false,
        }
    }

    /// Initial transition. A valid incoming link wins over acquisition.
    pub fn start(&mut self, incoming: Option<&str>) -> Vec<Action> {
        let Some(raw) = incoming else {
            return self.refresh();
        };

        match link::decode_link(raw) {
            Ok(position) => {
                info!(
                    "Opened shared position ({}, {})",
                    position.latitude, position.longitude
                );
                self.adopt(position, PositionSource::Link)
            }
            Err(DecodeError::MissingField(field)) => {
                warn!("Incoming link has no `{}`; locating instead", field);
                self.refresh()
            }
            Err(e) => {
                warn!("Rejected incoming link {:?}: {}", raw, e);
                self.transition(TrackerState {
                    error: Some(format!("Invalid coordinates in link: {}", e)),
                    ..self.state.clone()
                });
                Vec::new()
            }
        }
    }

    /// Starts an acquisition unless one is already running.
    pub fn refresh(&mut self) -> Vec<Action> {
        if self.state.tracking {
            debug!("Refresh ignored, acquisition already in flight");
            return Vec::new();
        }
        self.transition(TrackerState {
            tracking: true,
            error: None,
            ..self.state.clone()
        });
        vec![Action::Acquire]
    }

    pub fn handle_event(&mut self, event: Event) -> Vec<Action> {
        // Results arriving after teardown are dropped.
        if self.should_quit {
            return Vec::new();
        }

        match event {
            Event::Tick => {
                self.on_tick();
                Vec::new()
            }
            Event::Input(key) => self.handle_key(key),
            Event::Located(result) => self.on_located(result),
            Event::AddressResolved { generation, result } => {
                self.on_address(generation, result);
                Vec::new()
            }
            Event::InputClosed => {
                warn!("Terminal input closed, shutting down");
                self.should_quit = true;
                Vec::new()
            }
        }
    }

    pub fn on_tick(&mut self) {
        self.tick_count += 1;

        if let Some(at) = self.state.copied_at {
            if at.elapsed() >= COPY_FEEDBACK {
                self.transition(TrackerState {
                    copied_at: None,
                    ..self.state.clone()
                });
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('c') => match self.state.share_link.clone() {
                Some(link) => vec![Action::Copy(link)],
                None => Vec::new(),
            },
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.map_span = (self.map_span / 2.0).max(MIN_SPAN);
                Vec::new()
            }
            KeyCode::Char('-') => {
                self.map_span = (self.map_span * 2.0).min(MAX_SPAN);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Records the outcome of a clipboard write.
    pub fn on_copied(&mut self, ok: bool) {
        let next = if ok {
            TrackerState {
                copied_at: Some(Instant::now()),
                ..self.state.clone()
            }
        } else {
            TrackerState {
                error: Some(
                    "Failed to copy to clipboard. Please copy the link manually.".to_string(),
                ),
                ..self.state.clone()
            }
        };
        self.transition(next);
    }

    pub fn is_copied(&self) -> bool {
        self.state.copied_at.is_some()
    }

    fn on_located(&mut self, result: Result<Position, AcquisitionError>) -> Vec<Action> {
        match result {
            Ok(position) => {
                let actions = self.adopt(position, PositionSource::Fix);
                self.transition(TrackerState {
                    tracking: false,
                    ..self.state.clone()
                });
                actions
            }
            Err(e) => {
                warn!("Error getting location: {}", e);
                self.transition(TrackerState {
                    tracking: false,
                    error: Some(e.user_message()),
                    ..self.state.clone()
                });
                Vec::new()
            }
        }
    }

    fn on_address(&mut self, generation: u64, result: Result<String, ResolveError>) {
        if generation != self.generation {
            debug!(
                "Dropping address for generation {} (current {})",
                generation, self.generation
            );
            return;
        }
        let address = match result {
            Ok(address) => AddressState::Resolved(address),
            Err(e) => {
                info!("Address lookup failed: {}", e);
                AddressState::Failed(e)
            }
        };
        self.transition(TrackerState {
            address,
            ..self.state.clone()
        });
    }

    fn adopt(&mut self, position: Position, source: PositionSource) -> Vec<Action> {
        self.generation += 1;
        let share_link = link::encode(&position, &self.share.origin, &self.share.path);
        debug!("Share link regenerated: {}", share_link);

        self.transition(TrackerState {
            position,
            source,
            share_link: Some(share_link),
            address: AddressState::Loading,
            error: None,
            ..self.state.clone()
        });
        vec![Action::Resolve {
            generation: self.generation,
            position,
        }]
    }

    fn transition(&mut self, next: TrackerState) {
        self.state = next;
    }
}
