//! Runtime configuration
//!
//! Every period of the cooperative loop and every failure threshold in one place. The
//! defaults reproduce a 100 Hz logger with a 200 ms button debounce.

use embassy_time::Duration;

/// Sensor sampling period (100 Hz)
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// How often pending button presses are consumed and dispatched
pub const BUTTON_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Indicator re-evaluation period, shorter than the fastest blink half period (100 ms)
pub const INDICATOR_INTERVAL: Duration = Duration::from_millis(50);

/// Display refresh period
pub const DISPLAY_INTERVAL: Duration = Duration::from_millis(200);

/// Storage health poll period
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Minimum spacing between two accepted edges of the same button
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

/// Consecutive sensor read failures tolerated before the session is aborted
pub const SENSOR_FAILURE_THRESHOLD: u8 = 5;

/// Consecutive failed health checks before the card is considered removed
pub const HEALTH_FAILURE_THRESHOLD: u8 = 1;

/// Log file written by every recording session
pub const LOG_FILENAME: &str = "imu_data.csv";

/// A progress line is logged every this many samples (5 s at 100 Hz)
pub const PROGRESS_LOG_EVERY: u32 = 500;

/// Configuration of the system controller and its subordinate components
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoggerConfig {
    pub sample_interval: Duration,
    pub button_poll_interval: Duration,
    pub indicator_interval: Duration,
    pub display_interval: Duration,
    pub health_poll_interval: Duration,
    pub sensor_failure_threshold: u8,
    pub health_failure_threshold: u8,
    pub log_filename: &'static str,
    pub progress_log_every: u32,
    /// Attempt a mount right after a successful boot. A failed attempt is not retried.
    pub mount_on_boot: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            sample_interval: SAMPLE_INTERVAL,
            button_poll_interval: BUTTON_POLL_INTERVAL,
            indicator_interval: INDICATOR_INTERVAL,
            display_interval: DISPLAY_INTERVAL,
            health_poll_interval: HEALTH_POLL_INTERVAL,
            sensor_failure_threshold: SENSOR_FAILURE_THRESHOLD,
            health_failure_threshold: HEALTH_FAILURE_THRESHOLD,
            log_filename: LOG_FILENAME,
            progress_log_every: PROGRESS_LOG_EVERY,
            mount_on_boot: false,
        }
    }
}

impl LoggerConfig {
    /// Sampling rate derived from the sample interval
    pub fn sample_rate_hz(&self) -> u32 {
        let micros = self.sample_interval.as_micros().max(1);
        (1_000_000 / micros) as u32
    }
}
