//! Sampler
//!
//! Called once per sample period. While a recording is open it reads the sensor and hands
//! the sample to the session. Single read failures are tolerated; `threshold` failures in a
//! row mean the sensor is gone and the session is stopped.

use crate::error::{RecordError, SensorError, StorageError};
use crate::interface::{Sensor, Storage};
use crate::recording::RecordingSession;
use crate::sample::Sample;
use crate::storage::StorageSessionManager;

/// What one sampler tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleOutcome {
    /// No recording open, the sensor was not touched
    Idle,
    /// Sample written under this number
    Logged { number: u32, sample: Sample },
    /// Read failed, this many in a row so far
    SensorGlitch(u8),
    /// Threshold reached, the session has been stopped
    SensorFault,
    /// The session closed itself after a failed write
    WriteFailed(StorageError),
    /// The session closed itself, its sample counter is exhausted
    SessionFull,
}

pub struct Sampler<S: Sensor> {
    sensor: S,
    consecutive_errors: u8,
    threshold: u8,
}

impl<S: Sensor> Sampler<S> {
    pub fn new(sensor: S, threshold: u8) -> Self {
        Self {
            sensor,
            consecutive_errors: 0,
            threshold: threshold.max(1),
        }
    }

    #[cfg(test)]
    pub fn consecutive_errors(&self) -> u8 {
        self.consecutive_errors
    }

    /// Wakes the sensor and takes one test reading
    pub fn init_sensor(&mut self) -> Result<Sample, SensorError> {
        self.consecutive_errors = 0;
        self.sensor.init()?;
        self.sensor.read()
    }

    /// Resets the sensor and takes one test reading
    pub fn reset_sensor(&mut self) -> Result<Sample, SensorError> {
        self.consecutive_errors = 0;
        self.sensor.reset()?;
        self.sensor.read()
    }

    pub fn tick<St: Storage>(
        &mut self,
        recording: &mut RecordingSession<St::File>,
        storage: &mut StorageSessionManager<St>,
    ) -> SampleOutcome {
        if !recording.is_active() {
            self.consecutive_errors = 0;
            return SampleOutcome::Idle;
        }

        let sample = match self.sensor.read() {
            Ok(sample) => sample,
            Err(e) => {
                self.consecutive_errors = self.consecutive_errors.saturating_add(1);
                warn!(
                    "Sensor read failed ({} of {}): {:?}",
                    self.consecutive_errors, self.threshold, e
                );
                if self.consecutive_errors < self.threshold {
                    return SampleOutcome::SensorGlitch(self.consecutive_errors);
                }
                error!("Sensor unresponsive, stopping recording");
                self.consecutive_errors = 0;
                recording.stop(storage);
                return SampleOutcome::SensorFault;
            }
        };
        self.consecutive_errors = 0;

        match recording.log_sample(storage, &sample) {
            Ok(number) => SampleOutcome::Logged { number, sample },
            Err(RecordError::Storage(e)) => SampleOutcome::WriteFailed(e),
            Err(RecordError::SessionFull) => SampleOutcome::SessionFull,
            Err(e) => {
                // session vanished between the check above and the write
                debug!("Sample dropped: {:?}", e);
                SampleOutcome::Idle
            }
        }
    }
}
