//! Error taxonomy
//!
//! None of these ever leave the controller loop: each is consumed at its call site and
//! turned into a phase change, a console notice or an indicator pattern.

use core::fmt;

/// Motion sensor failures. Transient by themselves, escalated by the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Bus transaction failed (NACK, arbitration loss, timeout)
    Bus,
    /// WHO_AM_I returned an unexpected value
    InvalidDevice(u8),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Bus => f.write_str("sensor bus error"),
            SensorError::InvalidDevice(id) => write!(f, "unexpected sensor id 0x{:02x}", id),
        }
    }
}

impl core::error::Error for SensorError {}

/// Removable storage failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Mount primitive failed or the mounted volume could not be verified
    MountFailed,
    /// Operation needs a mounted card
    NotMounted,
    /// File could not be created or opened
    OpenFailed,
    /// Write to an open file failed
    WriteFailed,
    /// Directory or metadata read failed
    ReadFailed,
    /// Card stopped responding while mounted
    Removed,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageError::MountFailed => "mount failed",
            StorageError::NotMounted => "storage not mounted",
            StorageError::OpenFailed => "could not open file",
            StorageError::WriteFailed => "write failed",
            StorageError::ReadFailed => "read failed",
            StorageError::Removed => "card removed",
        })
    }
}

impl core::error::Error for StorageError {}

/// Recording session failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// A session is already open
    AlreadyActive,
    /// No session is open
    NotActive,
    /// Storage must be mounted before a session can start
    StorageNotMounted,
    /// The sample counter cannot number another line; the session is closed
    SessionFull,
    /// The underlying storage operation failed; the session is closed
    Storage(StorageError),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::AlreadyActive => f.write_str("recording already active"),
            RecordError::NotActive => f.write_str("no active recording"),
            RecordError::StorageNotMounted => f.write_str("storage not mounted"),
            RecordError::SessionFull => f.write_str("sample counter exhausted"),
            RecordError::Storage(e) => write!(f, "storage: {}", e),
        }
    }
}

impl core::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            RecordError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for RecordError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotMounted => RecordError::StorageNotMounted,
            other => RecordError::Storage(other),
        }
    }
}
