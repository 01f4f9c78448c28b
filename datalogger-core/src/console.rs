//! Serial command line
//!
//! One ASCII character per command. Line endings and spaces typed around a command are
//! dropped silently, anything else unknown gets a notice.

use crate::controller::Intent;

pub const HELP: &str = "\
=== COMMANDS ===
s - start/stop recording
m - mount SD card
u - unmount SD card
l - list files on SD
f - SD capacity
r - reset sensor
h - show this help
================
";

/// Classified byte received on the serial line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleInput {
    Command(Intent),
    /// Whitespace and line endings
    Ignored,
    Unknown(u8),
}

impl ConsoleInput {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b's' => ConsoleInput::Command(Intent::ToggleRecording),
            b'm' => ConsoleInput::Command(Intent::Mount),
            b'u' => ConsoleInput::Command(Intent::Unmount),
            b'l' => ConsoleInput::Command(Intent::ListFiles),
            b'f' => ConsoleInput::Command(Intent::ShowSpace),
            b'r' => ConsoleInput::Command(Intent::ResetSensor),
            b'h' => ConsoleInput::Command(Intent::Help),
            b'\r' | b'\n' | b' ' | b'\t' => ConsoleInput::Ignored,
            other => ConsoleInput::Unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_table() {
        let table = [
            (b's', Intent::ToggleRecording),
            (b'm', Intent::Mount),
            (b'u', Intent::Unmount),
            (b'l', Intent::ListFiles),
            (b'f', Intent::ShowSpace),
            (b'r', Intent::ResetSensor),
            (b'h', Intent::Help),
        ];
        for (byte, intent) in table {
            assert_eq!(ConsoleInput::from_byte(byte), ConsoleInput::Command(intent));
        }
    }

    #[test]
    fn line_endings_are_ignored() {
        for byte in [b'\r', b'\n', b' '] {
            assert_eq!(ConsoleInput::from_byte(byte), ConsoleInput::Ignored);
        }
    }

    #[test]
    fn commands_are_case_sensitive() {
        assert_eq!(ConsoleInput::from_byte(b'S'), ConsoleInput::Unknown(b'S'));
        assert_eq!(ConsoleInput::from_byte(b'x'), ConsoleInput::Unknown(b'x'));
    }
}
