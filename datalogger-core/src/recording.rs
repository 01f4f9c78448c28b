//! Recording Session
//!
//! Holds the one open log file and the running sample counter. The file handle never
//! leaves this struct; every write goes through the storage manager with the handle
//! borrowed from here.
//!
//! The sample number written for the Nth successful write is always N. A failed write
//! closes the session on the spot, so the file on the card never has a gap in its numbering.

use embassy_time::Instant;
use heapless::String;

use crate::error::{RecordError, StorageError};
use crate::interface::Storage;
use crate::sample::{Sample, CSV_HEADER};
use crate::storage::StorageSessionManager;

/// Longest file name a session accepts
pub const MAX_FILENAME_LEN: usize = 32;

struct ActiveSession<F> {
    file: F,
    filename: String<MAX_FILENAME_LEN>,
    samples: u32,
    started_at: Instant,
}

/// At most one open log file, `None` while idle
pub struct RecordingSession<F> {
    active: Option<ActiveSession<F>>,
}

impl<F> RecordingSession<F> {
    pub const fn new() -> Self {
        Self { active: None }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Samples written in the open session, 0 while idle
    #[cfg(test)]
    pub fn sample_count(&self) -> u32 {
        self.active.as_ref().map_or(0, |s| s.samples)
    }

    #[cfg(test)]
    pub fn started_at(&self) -> Option<Instant> {
        self.active.as_ref().map(|s| s.started_at)
    }

    pub fn filename(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.filename.as_str())
    }

    /// Creates (or truncates) `filename`, writes the CSV header and opens the session
    pub fn start<S>(
        &mut self,
        storage: &mut StorageSessionManager<S>,
        filename: &str,
        now: Instant,
    ) -> Result<(), RecordError>
    where
        S: Storage<File = F>,
    {
        if self.active.is_some() {
            return Err(RecordError::AlreadyActive);
        }
        if !storage.is_mounted() {
            return Err(RecordError::StorageNotMounted);
        }

        let mut name = String::new();
        if name.push_str(filename).is_err() {
            error!("Log file name too long");
            return Err(RecordError::Storage(StorageError::OpenFailed));
        }

        let mut file = storage.open_log(filename)?;
        if let Err(e) = storage.write_line(&mut file, CSV_HEADER) {
            error!("Header write failed: {:?}", e);
            if let Err(e) = storage.close_log(file) {
                debug!("Close after failed header: {:?}", e);
            }
            return Err(e.into());
        }

        info!("Recording started: {}", filename);
        self.active = Some(ActiveSession {
            file,
            filename: name,
            samples: 0,
            started_at: now,
        });
        Ok(())
    }

    /// Appends one sample. Returns the sample number written.
    ///
    /// A failed write closes the session before the error is returned.
    pub fn log_sample<S>(
        &mut self,
        storage: &mut StorageSessionManager<S>,
        sample: &Sample,
    ) -> Result<u32, RecordError>
    where
        S: Storage<File = F>,
    {
        let session = self.active.as_mut().ok_or(RecordError::NotActive)?;

        let Some(number) = session.samples.checked_add(1) else {
            warn!("Sample counter exhausted, closing session");
            self.stop(storage);
            return Err(RecordError::SessionFull);
        };
        let line = sample.to_csv_line(number);
        match storage.write_line(&mut session.file, &line) {
            Ok(()) => {
                session.samples = number;
                Ok(number)
            }
            Err(e) => {
                error!("Write of sample {} failed: {:?}, closing session", number, e);
                self.stop(storage);
                Err(RecordError::Storage(match e {
                    StorageError::NotMounted => StorageError::WriteFailed,
                    other => other,
                }))
            }
        }
    }

    /// Closes the open session. Idle is a no-op. Returns the number of samples written.
    pub fn stop<S>(&mut self, storage: &mut StorageSessionManager<S>) -> Option<u32>
    where
        S: Storage<File = F>,
    {
        let session = self.active.take()?;
        if let Err(e) = storage.close_log(session.file) {
            warn!("Closing {} failed: {:?}", session.filename.as_str(), e);
        }
        info!("Recording stopped after {} samples", session.samples);
        Some(session.samples)
    }
}

impl<F> Default for RecordingSession<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCard;

    const LOG: &str = "imu_data.csv";

    fn mounted() -> (StorageSessionManager<FakeCard>, FakeCard) {
        let card = FakeCard::new();
        let mut storage = StorageSessionManager::new(card.clone(), 1);
        storage.mount().unwrap();
        (storage, card)
    }

    #[test]
    fn start_requires_mounted_storage() {
        let card = FakeCard::new();
        let mut storage = StorageSessionManager::new(card.clone(), 1);
        let mut recording = RecordingSession::new();
        assert_eq!(
            recording.start(&mut storage, LOG, Instant::from_millis(0)),
            Err(RecordError::StorageNotMounted)
        );
        assert!(!recording.is_active());
        assert!(!card.has_file(LOG));
    }

    #[test]
    fn start_writes_header() {
        let (mut storage, card) = mounted();
        let mut recording = RecordingSession::new();
        recording.start(&mut storage, LOG, Instant::from_millis(42)).unwrap();
        assert!(recording.is_active());
        assert_eq!(recording.sample_count(), 0);
        assert_eq!(recording.started_at(), Some(Instant::from_millis(42)));
        assert_eq!(recording.filename(), Some(LOG));
        assert_eq!(card.lines(LOG), vec![CSV_HEADER.to_string()]);
    }

    #[test]
    fn second_start_conflicts() {
        let (mut storage, card) = mounted();
        let mut recording = RecordingSession::new();
        recording.start(&mut storage, LOG, Instant::from_millis(0)).unwrap();
        assert_eq!(
            recording.start(&mut storage, "other.csv", Instant::from_millis(1)),
            Err(RecordError::AlreadyActive)
        );
        assert!(!card.has_file("other.csv"));
        assert_eq!(card.open_handles(), 1);
    }

    #[test]
    fn samples_are_numbered_from_one() {
        let (mut storage, card) = mounted();
        let mut recording = RecordingSession::new();
        recording.start(&mut storage, LOG, Instant::from_millis(0)).unwrap();

        let samples = [
            Sample::new([1, 2, 3], [4, 5, 6]),
            Sample::new([-1, -2, -3], [-4, -5, -6]),
            Sample::new([100, 0, -100], [7, 8, 9]),
        ];
        for (i, sample) in samples.iter().enumerate() {
            assert_eq!(recording.log_sample(&mut storage, sample), Ok(i as u32 + 1));
        }
        assert_eq!(recording.stop(&mut storage), Some(3));

        assert_eq!(
            card.lines(LOG),
            vec![
                CSV_HEADER.to_string(),
                "1,1,2,3,4,5,6".to_string(),
                "2,-1,-2,-3,-4,-5,-6".to_string(),
                "3,100,0,-100,7,8,9".to_string(),
            ]
        );
        assert_eq!(card.open_handles(), 0);
    }

    #[test]
    fn log_without_session_is_rejected() {
        let (mut storage, card) = mounted();
        let mut recording = RecordingSession::new();
        assert_eq!(
            recording.log_sample(&mut storage, &Sample::default()),
            Err(RecordError::NotActive)
        );
        assert_eq!(card.write_attempts(), 0);
    }

    #[test]
    fn write_failure_closes_session() {
        let (mut storage, card) = mounted();
        let mut recording = RecordingSession::new();
        recording.start(&mut storage, LOG, Instant::from_millis(0)).unwrap();
        recording.log_sample(&mut storage, &Sample::default()).unwrap();

        card.fail_writes(true);
        assert_eq!(
            recording.log_sample(&mut storage, &Sample::default()),
            Err(RecordError::Storage(StorageError::WriteFailed))
        );
        assert!(!recording.is_active());
        assert_eq!(card.open_handles(), 0);

        let attempts = card.write_attempts();
        assert_eq!(
            recording.log_sample(&mut storage, &Sample::default()),
            Err(RecordError::NotActive)
        );
        assert_eq!(card.write_attempts(), attempts);
        assert_eq!(card.lines(LOG).len(), 2);
    }

    #[test]
    fn exhausted_counter_closes_session() {
        let (mut storage, card) = mounted();
        let mut recording = RecordingSession::new();
        recording.start(&mut storage, LOG, Instant::from_millis(0)).unwrap();
        if let Some(session) = recording.active.as_mut() {
            session.samples = u32::MAX - 1;
        }

        assert_eq!(
            recording.log_sample(&mut storage, &Sample::default()),
            Ok(u32::MAX)
        );
        let attempts = card.write_attempts();
        assert_eq!(
            recording.log_sample(&mut storage, &Sample::default()),
            Err(RecordError::SessionFull)
        );
        assert!(!recording.is_active());
        assert_eq!(card.open_handles(), 0);
        assert_eq!(card.write_attempts(), attempts);
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut storage, card) = mounted();
        let mut recording = RecordingSession::new();
        assert_eq!(recording.stop(&mut storage), None);
        recording.start(&mut storage, LOG, Instant::from_millis(0)).unwrap();
        assert_eq!(recording.stop(&mut storage), Some(0));
        assert_eq!(recording.stop(&mut storage), None);
        assert_eq!(card.close_calls(), 1);
    }

    #[test]
    fn restart_truncates_previous_log() {
        let (mut storage, card) = mounted();
        let mut recording = RecordingSession::new();
        recording.start(&mut storage, LOG, Instant::from_millis(0)).unwrap();
        recording.log_sample(&mut storage, &Sample::default()).unwrap();
        recording.log_sample(&mut storage, &Sample::default()).unwrap();
        recording.stop(&mut storage);

        recording.start(&mut storage, LOG, Instant::from_millis(10)).unwrap();
        assert_eq!(card.lines(LOG), vec![CSV_HEADER.to_string()]);
        assert_eq!(recording.sample_count(), 0);
    }

    #[test]
    fn failed_open_leaves_session_idle() {
        let (mut storage, card) = mounted();
        let mut recording = RecordingSession::new();
        card.fail_open(true);
        assert_eq!(
            recording.start(&mut storage, LOG, Instant::from_millis(0)),
            Err(RecordError::Storage(StorageError::OpenFailed))
        );
        assert!(!recording.is_active());
    }

    #[test]
    fn failed_header_releases_the_handle() {
        let (mut storage, card) = mounted();
        let mut recording = RecordingSession::new();
        card.fail_writes(true);
        assert_eq!(
            recording.start(&mut storage, LOG, Instant::from_millis(0)),
            Err(RecordError::Storage(StorageError::WriteFailed))
        );
        assert!(!recording.is_active());
        assert_eq!(card.open_handles(), 0);
    }
}
