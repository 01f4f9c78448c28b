//! In-memory collaborators for host tests
//!
//! Every fake is a cheap handle over shared state, so a test keeps one clone for
//! inspection after handing the other to the component under test.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::{String, ToString};
use std::vec::Vec;

use crate::display::ViewModel;
use crate::error::{SensorError, StorageError};
use crate::interface::{Display, EntryKind, FileInfo, Indicator, Sensor, SpaceInfo, Storage};
use crate::sample::Sample;

// -- sensor ----------------------------------------------------------------

#[derive(Default)]
struct SensorInner {
    init_error: Option<SensorError>,
    failing: bool,
    queued: VecDeque<Sample>,
    reads: u32,
    inits: u32,
    resets: u32,
}

/// Scripted motion sensor
#[derive(Clone, Default)]
pub struct FakeSensor(Rc<RefCell<SensorInner>>);

impl FakeSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `init` (and the wake step of `reset`) fail with `error`
    pub fn fail_init(&self, error: Option<SensorError>) {
        self.0.borrow_mut().init_error = error;
    }

    /// Every read fails with a bus error while set
    pub fn set_failing(&self, failing: bool) {
        self.0.borrow_mut().failing = failing;
    }

    /// Samples returned by the next reads, in order. Reads return zeros afterwards.
    pub fn queue(&self, samples: &[Sample]) {
        self.0.borrow_mut().queued.extend(samples.iter().copied());
    }

    pub fn reads(&self) -> u32 {
        self.0.borrow().reads
    }

    pub fn inits(&self) -> u32 {
        self.0.borrow().inits
    }

    pub fn resets(&self) -> u32 {
        self.0.borrow().resets
    }
}

impl Sensor for FakeSensor {
    fn init(&mut self) -> Result<(), SensorError> {
        let mut inner = self.0.borrow_mut();
        inner.inits += 1;
        inner.init_error.map_or(Ok(()), Err)
    }

    fn read(&mut self) -> Result<Sample, SensorError> {
        let mut inner = self.0.borrow_mut();
        inner.reads += 1;
        if inner.failing {
            return Err(SensorError::Bus);
        }
        Ok(inner.queued.pop_front().unwrap_or_default())
    }

    fn reset(&mut self) -> Result<(), SensorError> {
        let mut inner = self.0.borrow_mut();
        inner.resets += 1;
        inner.init_error.map_or(Ok(()), Err)
    }
}

// -- storage ---------------------------------------------------------------

struct CardInner {
    present: bool,
    unreadable: bool,
    fail_open: bool,
    fail_writes: bool,
    mounted: bool,
    files: Vec<(String, Vec<String>)>,
    open_handles: usize,
    mount_calls: u32,
    unmount_calls: u32,
    close_calls: u32,
    space_queries: u32,
    write_attempts: u32,
}

/// Removable card with inspectable files
#[derive(Clone)]
pub struct FakeCard(Rc<RefCell<CardInner>>);

/// Handle into [`FakeCard`], deliberately not `Clone`
#[derive(Debug)]
pub struct FakeFile {
    index: usize,
}

impl FakeCard {
    pub const TOTAL_KIB: u64 = 7_745_536;
    pub const FREE_KIB: u64 = 7_700_000;

    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(CardInner {
            present: true,
            unreadable: false,
            fail_open: false,
            fail_writes: false,
            mounted: false,
            files: Vec::new(),
            open_handles: 0,
            mount_calls: 0,
            unmount_calls: 0,
            close_calls: 0,
            space_queries: 0,
            write_attempts: 0,
        })))
    }

    /// Pulling the card makes every later operation fail
    pub fn set_present(&self, present: bool) {
        self.0.borrow_mut().present = present;
    }

    /// Mount succeeds but the volume cannot be read
    pub fn set_unreadable(&self, unreadable: bool) {
        self.0.borrow_mut().unreadable = unreadable;
    }

    pub fn fail_open(&self, fail: bool) {
        self.0.borrow_mut().fail_open = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.0.borrow_mut().fail_writes = fail;
    }

    /// Stores a file as if it had been left on the card earlier
    pub fn insert_file(&self, name: &str, lines: &[&str]) {
        self.0
            .borrow_mut()
            .files
            .push((name.to_string(), lines.iter().map(|l| l.to_string()).collect()));
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.0.borrow().files.iter().any(|(n, _)| n == name)
    }

    /// Lines of `name` including the header, empty if the file does not exist
    pub fn lines(&self, name: &str) -> Vec<String> {
        self.0
            .borrow()
            .files
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, lines)| lines.clone())
            .unwrap_or_default()
    }

    pub fn open_handles(&self) -> usize {
        self.0.borrow().open_handles
    }

    pub fn mount_calls(&self) -> u32 {
        self.0.borrow().mount_calls
    }

    pub fn unmount_calls(&self) -> u32 {
        self.0.borrow().unmount_calls
    }

    pub fn close_calls(&self) -> u32 {
        self.0.borrow().close_calls
    }

    pub fn space_queries(&self) -> u32 {
        self.0.borrow().space_queries
    }

    pub fn write_attempts(&self) -> u32 {
        self.0.borrow().write_attempts
    }
}

impl Default for FakeCard {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for FakeCard {
    type File = FakeFile;

    fn mount(&mut self) -> Result<(), StorageError> {
        let mut inner = self.0.borrow_mut();
        inner.mount_calls += 1;
        if !inner.present {
            return Err(StorageError::MountFailed);
        }
        inner.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) -> Result<(), StorageError> {
        let mut inner = self.0.borrow_mut();
        inner.unmount_calls += 1;
        inner.mounted = false;
        if inner.present {
            Ok(())
        } else {
            Err(StorageError::Removed)
        }
    }

    fn is_healthy(&mut self) -> bool {
        let inner = self.0.borrow();
        inner.present && inner.mounted
    }

    fn query_space(&mut self) -> Result<SpaceInfo, StorageError> {
        let mut inner = self.0.borrow_mut();
        inner.space_queries += 1;
        if !inner.present || !inner.mounted || inner.unreadable {
            return Err(StorageError::ReadFailed);
        }
        Ok(SpaceInfo {
            total_kib: Self::TOTAL_KIB,
            free_kib: Some(Self::FREE_KIB),
        })
    }

    fn open_log(&mut self, name: &str) -> Result<FakeFile, StorageError> {
        let mut inner = self.0.borrow_mut();
        if !inner.present || !inner.mounted || inner.fail_open {
            return Err(StorageError::OpenFailed);
        }
        let index = match inner.files.iter().position(|(n, _)| n == name) {
            Some(index) => {
                inner.files[index].1.clear();
                index
            }
            None => {
                inner.files.push((name.to_string(), Vec::new()));
                inner.files.len() - 1
            }
        };
        inner.open_handles += 1;
        Ok(FakeFile { index })
    }

    fn write_line(&mut self, file: &mut FakeFile, line: &str) -> Result<(), StorageError> {
        let mut inner = self.0.borrow_mut();
        inner.write_attempts += 1;
        if !inner.present || !inner.mounted || inner.fail_writes {
            return Err(StorageError::WriteFailed);
        }
        inner.files[file.index].1.push(line.to_string());
        Ok(())
    }

    fn close(&mut self, _file: FakeFile) -> Result<(), StorageError> {
        let mut inner = self.0.borrow_mut();
        inner.close_calls += 1;
        inner.open_handles -= 1;
        if inner.present {
            Ok(())
        } else {
            Err(StorageError::WriteFailed)
        }
    }

    fn list_files(&mut self, visit: &mut dyn FnMut(&FileInfo)) -> Result<(), StorageError> {
        let inner = self.0.borrow();
        if !inner.present || !inner.mounted {
            return Err(StorageError::ReadFailed);
        }
        for (name, lines) in inner.files.iter() {
            let mut short = heapless::String::new();
            let _ = short.push_str(name);
            visit(&FileInfo {
                name: short,
                kind: EntryKind::WritableFile,
                size: lines.iter().map(|l| l.len() as u32 + 1).sum(),
            });
        }
        Ok(())
    }
}

// -- display and indicator ---------------------------------------------------

/// Keeps every rendered view model
#[derive(Clone, Default)]
pub struct FakeDisplay(Rc<RefCell<Vec<ViewModel>>>);

impl FakeDisplay {
    pub fn renders(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn last(&self) -> Option<ViewModel> {
        self.0.borrow().last().copied()
    }
}

impl Display for FakeDisplay {
    fn render(&mut self, view: &ViewModel) {
        self.0.borrow_mut().push(*view);
    }
}

#[derive(Default)]
struct IndicatorInner {
    levels: Vec<(bool, bool, bool)>,
    tones: Vec<(u16, u16)>,
}

/// Records LED writes and started tones
#[derive(Clone, Default)]
pub struct FakeIndicator(Rc<RefCell<IndicatorInner>>);

impl FakeIndicator {
    /// Current LED levels, all off before the first write
    pub fn rgb(&self) -> (bool, bool, bool) {
        self.0.borrow().levels.last().copied().unwrap_or_default()
    }

    /// Every LED write so far
    pub fn levels(&self) -> Vec<(bool, bool, bool)> {
        self.0.borrow().levels.clone()
    }

    /// Every tone started so far as (frequency, duration)
    pub fn tones(&self) -> Vec<(u16, u16)> {
        self.0.borrow().tones.clone()
    }
}

impl Indicator for FakeIndicator {
    fn set_rgb(&mut self, red: bool, green: bool, blue: bool) {
        self.0.borrow_mut().levels.push((red, green, blue));
    }

    fn tone(&mut self, freq_hz: u16, duration_ms: u16) {
        self.0.borrow_mut().tones.push((freq_hz, duration_ms));
    }
}

// -- console -----------------------------------------------------------------

/// Serial console capturing everything printed
#[derive(Clone, Default)]
pub struct FakeConsole(Rc<RefCell<String>>);

impl FakeConsole {
    pub fn text(&self) -> String {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl core::fmt::Write for FakeConsole {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.0.borrow_mut().push_str(s);
        Ok(())
    }
}
