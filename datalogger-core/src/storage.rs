//! Storage Session Manager
//!
//! Owns the mount lifecycle of the removable card. It is the only component that calls
//! the [`Storage`] primitives; the recording session reaches the card through the
//! `open_log`/`write_line`/`close_log` pass-throughs below.
//!
//! # Lifecycle
//! - `mount`: mount primitive, then verify by reading capacity. Only a verified volume
//!   counts as mounted. Failures are reported, never retried on a timer.
//! - `unmount`: any open recording is stopped first, then the volume is released. The
//!   manager considers itself unmounted afterwards whatever the primitive reports.
//! - `poll_health`: periodic responsiveness check. Losing the card while mounted is a
//!   surprise removal: the recording is stopped and the volume released.

use embassy_time::Instant;

use crate::error::StorageError;
use crate::interface::{FileInfo, SpaceInfo, Storage};
use crate::recording::RecordingSession;

/// Outcome of a health poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HealthStatus {
    /// Nothing mounted, nothing checked
    NotMounted,
    Healthy,
    /// Check failed but the failure threshold is not reached yet
    Degraded(u8),
    /// The card stopped responding; storage is now unmounted
    Removed,
}

pub struct StorageSessionManager<S: Storage> {
    storage: S,
    mounted: bool,
    last_health_check: Option<Instant>,
    consecutive_failures: u8,
    failure_threshold: u8,
}

impl<S: Storage> StorageSessionManager<S> {
    pub fn new(storage: S, failure_threshold: u8) -> Self {
        Self {
            storage,
            mounted: false,
            last_health_check: None,
            consecutive_failures: 0,
            failure_threshold: failure_threshold.max(1),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    #[cfg(test)]
    pub fn last_health_check(&self) -> Option<Instant> {
        self.last_health_check
    }

    /// Mounts and verifies the volume. Already mounted is a successful no-op.
    pub fn mount(&mut self) -> Result<(), StorageError> {
        if self.mounted {
            debug!("Storage already mounted");
            return Ok(());
        }

        if let Err(e) = self.storage.mount() {
            error!("Mount primitive failed: {:?}", e);
            return Err(StorageError::MountFailed);
        }

        // a card can report a successful mount and still be unreadable
        match self.storage.query_space() {
            Ok(space) => {
                info!("Storage mounted, {} KiB total", space.total_kib);
                self.mounted = true;
                self.consecutive_failures = 0;
                Ok(())
            }
            Err(e) => {
                error!("Mounted volume failed verification: {:?}", e);
                if let Err(e) = self.storage.unmount() {
                    warn!("Release after failed verification: {:?}", e);
                }
                Err(StorageError::MountFailed)
            }
        }
    }

    /// Stops `recording` if needed, then releases the volume
    pub fn unmount(&mut self, recording: &mut RecordingSession<S::File>) -> Result<(), StorageError> {
        if !self.mounted {
            debug!("Storage not mounted, nothing to release");
            return Ok(());
        }
        if recording.is_active() {
            info!("Stopping recording before unmount");
            recording.stop(self);
        }
        let result = self.storage.unmount();
        self.mounted = false;
        self.consecutive_failures = 0;
        match result {
            Ok(()) => info!("Storage unmounted"),
            Err(e) => warn!("Unmount primitive reported {:?}, treating storage as released", e),
        }
        result
    }

    /// Checks the medium. On removal the recording is stopped and storage released.
    pub fn poll_health(&mut self, recording: &mut RecordingSession<S::File>, now: Instant) -> HealthStatus {
        if !self.mounted {
            return HealthStatus::NotMounted;
        }
        self.last_health_check = Some(now);

        if self.storage.is_healthy() {
            if self.consecutive_failures > 0 {
                info!("Storage responsive again after {} failed checks", self.consecutive_failures);
            }
            self.consecutive_failures = 0;
            return HealthStatus::Healthy;
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures < self.failure_threshold {
            warn!(
                "Storage health check failed ({} of {})",
                self.consecutive_failures, self.failure_threshold
            );
            return HealthStatus::Degraded(self.consecutive_failures);
        }

        warn!("Storage stopped responding, treating card as removed");
        if recording.is_active() {
            recording.stop(self);
        }
        if let Err(e) = self.storage.unmount() {
            debug!("Release of removed card: {:?}", e);
        }
        self.mounted = false;
        self.consecutive_failures = 0;
        HealthStatus::Removed
    }

    /// Capacity of the mounted volume
    pub fn query_space(&mut self) -> Result<SpaceInfo, StorageError> {
        if !self.mounted {
            return Err(StorageError::NotMounted);
        }
        self.storage.query_space()
    }

    /// Walks the root directory of the mounted volume
    pub fn list_files(&mut self, visit: &mut dyn FnMut(&FileInfo)) -> Result<(), StorageError> {
        if !self.mounted {
            return Err(StorageError::NotMounted);
        }
        self.storage.list_files(visit)
    }

    pub(crate) fn open_log(&mut self, name: &str) -> Result<S::File, StorageError> {
        if !self.mounted {
            return Err(StorageError::NotMounted);
        }
        self.storage.open_log(name)
    }

    pub(crate) fn write_line(&mut self, file: &mut S::File, line: &str) -> Result<(), StorageError> {
        self.storage.write_line(file, line)
    }

    pub(crate) fn close_log(&mut self, file: S::File) -> Result<(), StorageError> {
        self.storage.close(file)
    }
}
