//! Seams to the hardware
//!
//! The core never touches a bus, a pin or a filesystem directly. The firmware implements
//! these traits on top of its drivers and hands the implementations to the controller.

use heapless::String;

use crate::display::ViewModel;
use crate::error::{SensorError, StorageError};
use crate::sample::Sample;

/// Motion sensor delivering raw accelerometer and gyroscope readings
pub trait Sensor {
    /// Wakes the device and verifies it answers on the bus
    fn init(&mut self) -> Result<(), SensorError>;

    /// Reads one raw sample
    fn read(&mut self) -> Result<Sample, SensorError>;

    /// Issues a device reset followed by the wake sequence
    fn reset(&mut self) -> Result<(), SensorError>;
}

/// Capacity report of a mounted volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpaceInfo {
    pub total_kib: u64,
    /// `None` when the backend cannot count free clusters cheaply
    pub free_kib: Option<u64>,
}

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EntryKind {
    WritableFile,
    ReadOnlyFile,
    Directory,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::WritableFile => "writable file",
            EntryKind::ReadOnlyFile => "read only file",
            EntryKind::Directory => "directory",
        }
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String<16>,
    pub kind: EntryKind,
    pub size: u32,
}

/// Filesystem on the removable card
///
/// File handles are owned values: whoever holds a `File` is the only one able to write
/// to it, and [`Storage::close`] consumes it.
pub trait Storage {
    type File;

    /// Mounts the volume. Success is not trusted by the caller without a follow up
    /// [`Storage::query_space`].
    fn mount(&mut self) -> Result<(), StorageError>;

    /// Releases the volume. Must be tolerant of a card that is already gone.
    fn unmount(&mut self) -> Result<(), StorageError>;

    /// Cheap responsiveness check of the medium
    fn is_healthy(&mut self) -> bool;

    /// Reads capacity information from the mounted volume
    fn query_space(&mut self) -> Result<SpaceInfo, StorageError>;

    /// Creates `name`, truncating any previous content, and opens it for writing
    fn open_log(&mut self, name: &str) -> Result<Self::File, StorageError>;

    /// Appends `line` followed by a line terminator
    fn write_line(&mut self, file: &mut Self::File, line: &str) -> Result<(), StorageError>;

    /// Flushes and closes the file
    fn close(&mut self, file: Self::File) -> Result<(), StorageError>;

    /// Calls `visit` for every entry of the root directory
    fn list_files(&mut self, visit: &mut dyn FnMut(&FileInfo)) -> Result<(), StorageError>;
}

/// Small status display
pub trait Display {
    fn render(&mut self, view: &ViewModel);
}

/// RGB status LED and buzzer
pub trait Indicator {
    fn set_rgb(&mut self, red: bool, green: bool, blue: bool);

    /// Starts a tone; returns immediately, the tone ends by itself after `duration_ms`
    fn tone(&mut self, freq_hz: u16, duration_ms: u16);
}
