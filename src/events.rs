//! Event types and the main event loop driver for the Pinpoint TUI.
//!
//! This module defines the [`Event`] enum (keyboard input, ticks, and the
//! results of background lookups) and the [`EventHandler`], which runs a
//! background task that polls crossterm for key events and emits periodic
//! [`Event::Tick`]s. Lookup tasks spawned by `main.rs` report back through
//! [`EventHandler::tx`].

use crate::geocode::ResolveError;
use crate::location::AcquisitionError;
use crate::models::Position;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::error;

/// Events processed by the application event loop.
#[derive(Debug)]
pub enum Event {
    /// Periodic tick used for UI refresh and copy-feedback expiry.
    Tick,
    /// User key press from the terminal.
    Input(KeyEvent),
    /// Outcome of a position acquisition.
    Located(Result<Position, AcquisitionError>),
    /// Outcome of an address lookup.
    AddressResolved {
        /// Position generation the lookup was issued for.
        generation: u64,
        result: Result<String, ResolveError>,
    },
    /// The terminal can no longer be read; no more input will arrive.
    InputClosed,
}

/// Multiplexes terminal input and ticks into a single event stream.
///
/// Holds an unbounded channel: the sender ([`tx`](EventHandler::tx)) can be
/// cloned and given to lookup tasks, while the receiver is consumed by
/// [`next`](EventHandler::next) in the main loop.
pub struct EventHandler {
    /// Sender for posting events from background tasks.
    pub tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Creates a new event handler and spawns the input/tick task.
    ///
    /// The spawned task polls crossterm with a timeout of `tick_rate_ms`;
    /// when a key is pressed it sends [`Event::Input`], and when the tick
    /// interval elapses it sends [`Event::Tick`]. It stops once the receiver
    /// is dropped, or sends [`Event::InputClosed`] and stops when the
    /// terminal can no longer be read.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::spawn(async move {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::from_secs(0));
                match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            if event_tx.send(Event::Input(key)).is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("Terminal read failed: {}", e);
                            event_tx.send(Event::InputClosed).ok();
                            break;
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        error!("Terminal poll failed: {}", e);
                        event_tx.send(Event::InputClosed).ok();
                        break;
                    }
                }
                if last_tick.elapsed() >= tick_rate {
                    if event_tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { tx, rx }
    }

    /// Receives the next event from the channel.
    ///
    /// Returns `None` when all senders have been dropped.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
