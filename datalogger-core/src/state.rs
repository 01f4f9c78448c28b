//! System State
//!
//! The single authoritative snapshot of what the logger is doing. It is owned by the
//! [`SystemController`](crate::controller::SystemController) and replaced as a whole on
//! every change; renderers only ever see complete snapshots.
//!
//! # Invariants
//! - `recording` implies `storage_mounted`
//! - `phase == Recording` exactly when `recording` is set
//! - `Error` is left only through a successful mount or sensor re-initialisation

use embassy_time::{Duration, Instant};

/// Top level mode of the logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Boot, sensor not verified yet
    Initializing,
    /// Idle, with or without a mounted card
    Ready,
    /// Mount in progress
    Mounting,
    /// Unmount in progress
    Unmounting,
    /// A recording session is open
    Recording,
    /// A fault needs user action
    Error,
}

/// Complete runtime state of the logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SystemState {
    pub phase: Phase,
    pub storage_mounted: bool,
    /// Raised around blocking storage I/O
    pub storage_busy: bool,
    pub recording: bool,
    /// Samples written in the current (or last) session
    pub sample_count: u32,
    /// Start of the current session, display only
    pub session_start: Option<Instant>,
}

impl SystemState {
    /// State at power on
    pub const fn initial() -> Self {
        Self {
            phase: Phase::Initializing,
            storage_mounted: false,
            storage_busy: false,
            recording: false,
            sample_count: 0,
            session_start: None,
        }
    }

    /// Checks the cross-field invariants
    pub fn is_consistent(&self) -> bool {
        (!self.recording || self.storage_mounted) && ((self.phase == Phase::Recording) == self.recording)
    }

    /// Time spent in the current session
    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.session_start {
            Some(start) if self.recording => now.saturating_duration_since(start),
            _ => Duration::from_ticks(0),
        }
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::initial()
    }
}
