//! Clipboard writes through the terminal.
//!
//! Uses the OSC 52 escape sequence, which most modern terminal emulators
//! (and tmux with `set-clipboard on`) forward to the system clipboard.

use base64::Engine as _;
use std::io::{self, Write};

/// Builds the OSC 52 "set clipboard" sequence for `text`.
pub fn osc52_sequence(text: &str) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{}\x07", payload)
}

/// Asks the terminal to place `text` on the clipboard.
pub fn copy(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(osc52_sequence(text).as_bytes())?;
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_wraps_base64_payload() {
        assert_eq!(osc52_sequence("hi"), "\x1b]52;c;aGk=\x07");
    }
}
