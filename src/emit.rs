//! The textual command stream read by the actuator firmware.
//!
//! One line per instant: the time in milliseconds followed by the command codes.
//!
//! ```text
//! 0 02
//! 20 06
//! 25 08
//! ```

use std::fmt;

use crate::actuator::{Command, Operation, StringId};
use crate::schedule::Tick;

impl Operation {
    /// Single character code of the operation.
    /// Moves are encoded by their target position.
    pub fn code(self) -> char {
        match self {
            Operation::Move(position) => char::from(b'0' + position),
            Operation::Press => '6',
            Operation::Release => '7',
            Operation::FretConfirm => '8',
        }
    }
}

/// `A` for the first string, `B` for the second, and so on.
fn string_letter(string: StringId) -> char {
    char::from(b'A' + string.index())
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Command::String { string, op } => write!(f, "{:x}{}", string.index(), op.code()),
            Command::Brush { first, last } => {
                write!(f, "{}{}", string_letter(first), string_letter(last))
            }
        }
    }
}

/// One line without the terminating newline.
impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.time)?;
        for command in &self.commands {
            write!(f, " {}", command)?;
        }
        Ok(())
    }
}

/// Render all ticks, one line each.
pub fn render(ticks: &[Tick]) -> String {
    ticks.iter().map(|tick| format!("{}\n", tick)).collect()
}
