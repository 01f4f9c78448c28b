//! Display view model
//!
//! What the screen shows is derived from a [`SystemState`] snapshot and nothing else. The
//! firmware driver only lays the text out; it keeps no state of its own.

use core::fmt::Write;

use embassy_time::Instant;
use heapless::{String, Vec};

use crate::state::{Phase, SystemState};

/// First line of every screen
pub const TITLE: &str = "IMU DATALOGGER";

/// Characters per line on a 128 px wide panel with a 6 px font
pub const LINE_WIDTH: usize = 21;

/// Status lines below the title
pub const MAX_STATUS_LINES: usize = 3;

pub type TextLine = String<LINE_WIDTH>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ViewModel {
    pub phase: Phase,
    pub storage_mounted: bool,
    pub sample_count: u32,
    pub elapsed_secs: u32,
}

impl ViewModel {
    pub fn from_state(state: &SystemState, now: Instant) -> Self {
        Self {
            phase: state.phase,
            storage_mounted: state.storage_mounted,
            sample_count: state.sample_count,
            elapsed_secs: state.elapsed(now).as_secs().min(u32::MAX as u64) as u32,
        }
    }

    /// Status text shown under the title
    pub fn status_lines(&self) -> Vec<TextLine, MAX_STATUS_LINES> {
        let mut lines = Vec::new();
        let mut push = |args: core::fmt::Arguments<'_>| {
            let mut line = TextLine::new();
            // overlong text is cut at the panel edge
            let _ = line.write_fmt(args);
            let _ = lines.push(line);
        };

        match self.phase {
            Phase::Initializing => {
                push(format_args!("Initializing..."));
                push(format_args!("Please wait"));
            }
            Phase::Ready if self.storage_mounted => {
                push(format_args!("System ready"));
                push(format_args!("A=rec B=SD"));
            }
            Phase::Ready => {
                push(format_args!("No SD card"));
                push(format_args!("B=mount SD"));
            }
            Phase::Mounting => push(format_args!("Mounting SD...")),
            Phase::Unmounting => push(format_args!("Unmounting SD...")),
            Phase::Recording => {
                push(format_args!("RECORDING..."));
                push(format_args!("Samples: {}", self.sample_count));
                push(format_args!("Time: {}s", self.elapsed_secs));
            }
            Phase::Error => {
                push(format_args!("ERROR!"));
                push(format_args!("Check SD"));
                push(format_args!("B=try again"));
            }
        }
        lines
    }
}
