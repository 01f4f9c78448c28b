//! System Controller
//!
//! The cooperative scheduler of the logger. [`SystemController::poll`] is called from a
//! single loop; every activity runs on its own [`Periodic`](crate::schedule::Periodic)
//! timer and reports facts back here, where they are merged into the one authoritative
//! [`SystemState`]. Nothing else writes that state.
//!
//! Buttons and serial commands funnel into [`SystemController::dispatch`], so there is one
//! code path per user intent whatever triggered it.
//!
//! Faults never leave this module. Each result is consumed where it is produced and turned
//! into a phase change, a console notice and the matching indicator feedback.

use core::fmt::{self, Write};

use embassy_time::{Duration, Instant};
use heapless::String;

use crate::config::LoggerConfig;
use crate::console::{ConsoleInput, HELP};
use crate::display::ViewModel;
use crate::error::RecordError;
use crate::indicator::{self, BuzzerSequencer, IndicatorTarget, Motif};
use crate::input::{ButtonId, InputTracker};
use crate::interface::{Display, EntryKind, FileInfo, Indicator, Sensor, Storage};
use crate::recording::{RecordingSession, MAX_FILENAME_LEN};
use crate::sampler::{SampleOutcome, Sampler};
use crate::schedule::{Periodic, Schedule};
use crate::state::{Phase, SystemState};
use crate::storage::{HealthStatus, StorageSessionManager};

/// User requests, whatever their source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Intent {
    /// Button A, serial `s`
    ToggleRecording,
    /// Serial `m`
    Mount,
    /// Serial `u`
    Unmount,
    /// Button B
    ToggleStorage,
    /// Serial `l`
    ListFiles,
    /// Serial `f`
    ShowSpace,
    /// Serial `r`
    ResetSensor,
    /// Serial `h`
    Help,
}

pub struct SystemController<'a, S, St, D, I, C>
where
    S: Sensor,
    St: Storage,
    D: Display,
    I: Indicator,
    C: Write,
{
    config: LoggerConfig,
    state: SystemState,
    inputs: &'a InputTracker,
    storage: StorageSessionManager<St>,
    recording: RecordingSession<St::File>,
    sampler: Sampler<S>,
    display: D,
    indicator: I,
    console: C,
    buzzer: BuzzerSequencer,
    schedule: Schedule,
    /// Pattern on the LED and when it first appeared
    pattern: Option<(IndicatorTarget, Instant)>,
    led: Option<(bool, bool, bool)>,
}

impl<'a, S, St, D, I, C> SystemController<'a, S, St, D, I, C>
where
    S: Sensor,
    St: Storage,
    D: Display,
    I: Indicator,
    C: Write,
{
    pub fn new(
        config: LoggerConfig,
        inputs: &'a InputTracker,
        sensor: S,
        storage: St,
        display: D,
        indicator: I,
        console: C,
    ) -> Self {
        Self {
            state: SystemState::initial(),
            inputs,
            storage: StorageSessionManager::new(storage, config.health_failure_threshold),
            recording: RecordingSession::new(),
            sampler: Sampler::new(sensor, config.sensor_failure_threshold),
            display,
            indicator,
            console,
            buzzer: BuzzerSequencer::new(),
            schedule: Schedule {
                buttons: Periodic::new(config.button_poll_interval),
                indicator: Periodic::new(config.indicator_interval),
                sampler: Periodic::new(config.sample_interval),
                display: Periodic::new(config.display_interval),
                health: Periodic::new(config.health_poll_interval),
            },
            pattern: None,
            led: None,
            config,
        }
    }

    /// Current snapshot
    pub fn state(&self) -> &SystemState {
        &self.state
    }

    /// Brings the sensor up and leaves the system in `Ready` or `Error`
    pub fn boot(&mut self, now: Instant) {
        self.say(format_args!("\n{}\n", crate::display::TITLE));
        info!("Booting, sample rate {} Hz", self.config.sample_rate_hz());
        self.state = SystemState::initial();
        self.render_display(now);
        self.render_indicator(now);
        self.buzzer.play(Motif::Init);

        let phase = match self.sampler.init_sensor() {
            Ok(sample) => {
                info!("Sensor test read: {:?}", sample);
                self.say(format_args!(
                    "Sensor ok, accel {:?} gyro {:?}\n",
                    sample.accel, sample.gyro
                ));
                Phase::Ready
            }
            Err(e) => {
                error!("Sensor init failed: {:?}", e);
                self.say(format_args!("Sensor init failed: {}\n", e));
                Phase::Error
            }
        };
        self.commit(SystemState { phase, ..self.state });

        self.say(format_args!(
            "Buttons: A=record B=SD\nSample rate: {} Hz\nType 'h' for help\n",
            self.config.sample_rate_hz()
        ));

        if self.config.mount_on_boot && phase == Phase::Ready {
            self.mount(now);
        }
        self.render_display(now);
        self.render_indicator(now);
    }

    /// One pass of the cooperative loop
    pub fn poll(&mut self, now: Instant) {
        if self.schedule.buttons.due(now) {
            if self.inputs.take_pressed(ButtonId::A) {
                info!("Button A");
                self.dispatch(Intent::ToggleRecording, now);
            }
            if self.inputs.take_pressed(ButtonId::B) {
                info!("Button B");
                self.dispatch(Intent::ToggleStorage, now);
            }
        }

        self.buzzer.poll(now, &mut self.indicator);
        if self.schedule.indicator.due(now) {
            self.render_indicator(now);
        }

        if self.schedule.sampler.due(now) {
            self.sample();
        }

        if self.schedule.display.due(now) {
            self.render_display(now);
        }

        if self.schedule.health.due(now) {
            self.check_storage(now);
        }
    }

    /// Feeds one byte received on the serial console
    pub fn handle_serial(&mut self, byte: u8, now: Instant) {
        match ConsoleInput::from_byte(byte) {
            ConsoleInput::Command(intent) => self.dispatch(intent, now),
            ConsoleInput::Ignored => {}
            ConsoleInput::Unknown(other) => {
                debug!("Unknown command byte {}", other);
                if other.is_ascii_graphic() {
                    self.say(format_args!(
                        "Unknown command '{}'. Type 'h' for help.\n",
                        other as char
                    ));
                } else {
                    self.say(format_args!(
                        "Unknown command {:#04x}. Type 'h' for help.\n",
                        other
                    ));
                }
            }
        }
    }

    pub fn dispatch(&mut self, intent: Intent, now: Instant) {
        debug!("Dispatch {:?}", intent);
        match intent {
            Intent::ToggleRecording => {
                if self.recording.is_active() {
                    self.stop_recording(now);
                } else {
                    self.start_recording(now);
                }
            }
            Intent::Mount => self.mount(now),
            Intent::Unmount => self.unmount(now),
            Intent::ToggleStorage => {
                if self.storage.is_mounted() {
                    self.unmount(now);
                } else {
                    self.mount(now);
                }
            }
            Intent::ListFiles => self.list_files(now),
            Intent::ShowSpace => self.show_space(now),
            Intent::ResetSensor => self.reset_sensor(),
            Intent::Help => self.say(format_args!("{}", HELP)),
        }
        self.render_indicator(now);
    }

    fn start_recording(&mut self, now: Instant) {
        if self.state.phase == Phase::Error {
            warn!("Start refused in error phase");
            self.say(format_args!(
                "System in error state. Mount the SD card (B) or reset the sensor (r) first.\n"
            ));
            return;
        }

        let filename = self.config.log_filename;
        let result = if self.storage.is_mounted() {
            self.with_storage_busy(now, |this| {
                this.recording.start(&mut this.storage, filename, now)
            })
        } else {
            self.recording.start(&mut self.storage, filename, now)
        };

        match result {
            Ok(()) => {
                self.schedule.sampler.reset();
                self.commit(SystemState {
                    phase: Phase::Recording,
                    recording: true,
                    sample_count: 0,
                    session_start: Some(now),
                    ..self.state
                });
                self.say(format_args!("Recording to {}\n", filename));
            }
            Err(RecordError::StorageNotMounted) => {
                warn!("Start refused, storage not mounted");
                self.buzzer.play(Motif::Error);
                self.say(format_args!("SD not mounted. Mount it first with 'm' or B.\n"));
            }
            Err(RecordError::AlreadyActive)
            | Err(RecordError::NotActive)
            | Err(RecordError::SessionFull) => {
                warn!("Recording state conflict");
            }
            Err(RecordError::Storage(e)) => {
                error!("Recording could not start: {:?}", e);
                self.commit(SystemState {
                    phase: Phase::Error,
                    ..self.state
                });
                self.say(format_args!("Could not start recording: {}\n", e));
            }
        }
    }

    fn stop_recording(&mut self, now: Instant) {
        let filename: String<MAX_FILENAME_LEN> = self
            .recording
            .filename()
            .and_then(|name| String::try_from(name).ok())
            .unwrap_or_default();
        let stopped = self.with_storage_busy(now, |this| this.recording.stop(&mut this.storage));
        let Some(samples) = stopped else {
            self.say(format_args!("Not recording\n"));
            return;
        };
        self.commit(SystemState {
            phase: Phase::Ready,
            recording: false,
            sample_count: samples,
            ..self.state
        });
        self.say(format_args!(
            "Recording stopped, {} samples written to {}\n",
            samples, filename
        ));
    }

    fn mount(&mut self, now: Instant) {
        if self.storage.is_mounted() {
            if self.state.phase == Phase::Error {
                self.reverify_mount(now);
            } else {
                self.say(format_args!("SD already mounted\n"));
            }
            return;
        }

        self.commit(SystemState {
            phase: Phase::Mounting,
            ..self.state
        });
        self.say(format_args!("Mounting SD...\n"));
        self.render_display(now);

        match self.with_storage_busy(now, |this| this.storage.mount()) {
            Ok(()) => {
                // a good mount also clears a sticky error
                self.commit(SystemState {
                    phase: Phase::Ready,
                    storage_mounted: true,
                    ..self.state
                });
                self.say(format_args!("SD mounted\n"));
            }
            Err(e) => {
                self.commit(SystemState {
                    phase: Phase::Error,
                    storage_mounted: false,
                    ..self.state
                });
                self.say(format_args!("SD mount failed: {}\n", e));
            }
        }
        self.render_display(now);
    }

    /// Mounting a mounted card is a no-op success, but it still has to clear an error. The
    /// volume is read once more so a card that went bad is not reported as fine.
    fn reverify_mount(&mut self, now: Instant) {
        match self.with_storage_busy(now, |this| this.storage.query_space()) {
            Ok(_) => {
                self.commit(SystemState {
                    phase: Phase::Ready,
                    ..self.state
                });
                self.say(format_args!("SD already mounted, error cleared\n"));
            }
            Err(e) => {
                warn!("Mounted volume unreadable: {:?}", e);
                self.say(format_args!("SD mounted but unreadable: {}\n", e));
            }
        }
        self.render_display(now);
    }

    fn unmount(&mut self, now: Instant) {
        if !self.storage.is_mounted() {
            self.say(format_args!("SD not mounted\n"));
            return;
        }
        if self.recording.is_active() {
            self.stop_recording(now);
            self.say(format_args!("Recording stopped for unmount\n"));
        }

        let resume = if self.state.phase == Phase::Error {
            Phase::Error
        } else {
            Phase::Ready
        };
        self.commit(SystemState {
            phase: Phase::Unmounting,
            ..self.state
        });
        self.say(format_args!("Unmounting SD...\n"));
        self.render_display(now);

        let result = self.with_storage_busy(now, |this| this.storage.unmount(&mut this.recording));
        if let Err(e) = result {
            warn!("Unmount reported {:?}", e);
        }
        self.commit(SystemState {
            phase: resume,
            storage_mounted: false,
            recording: false,
            ..self.state
        });
        self.say(format_args!("SD unmounted\n"));
        self.render_display(now);
    }

    fn list_files(&mut self, now: Instant) {
        if !self.storage.is_mounted() {
            self.say(format_args!("SD not mounted. Mount it first with 'm'.\n"));
            return;
        }
        self.say(format_args!("Files on SD:\n"));
        let mut count = 0u32;
        let result = self.with_storage_busy(now, |this| {
            let console = &mut this.console;
            this.storage.list_files(&mut |entry: &FileInfo| {
                count += 1;
                let _ = write!(console, "  {} [{}]", entry.name.as_str(), entry.kind.label());
                if entry.kind != EntryKind::Directory {
                    let _ = write!(console, " [size={}]", entry.size);
                }
                let _ = console.write_char('\n');
            })
        });
        match result {
            Ok(()) => self.say(format_args!("{} entries\n", count)),
            Err(e) => {
                warn!("Listing failed: {:?}", e);
                self.say(format_args!("Listing failed: {}\n", e));
            }
        }
    }

    fn show_space(&mut self, now: Instant) {
        if !self.storage.is_mounted() {
            self.say(format_args!("SD not mounted. Mount it first with 'm'.\n"));
            return;
        }
        match self.with_storage_busy(now, |this| this.storage.query_space()) {
            Ok(space) => {
                self.say(format_args!("Total: {} KiB\n", space.total_kib));
                match space.free_kib {
                    Some(free) => self.say(format_args!("Free: {} KiB\n", free)),
                    None => self.say(format_args!("Free: unknown\n")),
                }
            }
            Err(e) => {
                warn!("Space query failed: {:?}", e);
                self.say(format_args!("Space query failed: {}\n", e));
            }
        }
    }

    fn reset_sensor(&mut self) {
        if self.recording.is_active() {
            self.say(format_args!("Stop recording before resetting the sensor\n"));
            return;
        }
        match self.sampler.reset_sensor() {
            Ok(_) => {
                let phase = match self.state.phase {
                    Phase::Error => Phase::Ready,
                    other => other,
                };
                self.commit(SystemState { phase, ..self.state });
                self.say(format_args!("Sensor reset ok\n"));
            }
            Err(e) => {
                error!("Sensor reset failed: {:?}", e);
                self.commit(SystemState {
                    phase: Phase::Error,
                    ..self.state
                });
                self.say(format_args!("Sensor reset failed: {}\n", e));
            }
        }
    }

    fn sample(&mut self) {
        match self.sampler.tick(&mut self.recording, &mut self.storage) {
            SampleOutcome::Idle | SampleOutcome::SensorGlitch(_) => {}
            SampleOutcome::Logged { number, sample } => {
                self.state = SystemState {
                    sample_count: number,
                    ..self.state
                };
                let every = self.config.progress_log_every;
                if every > 0 && number % every == 0 {
                    info!("Sample {}: {:?}", number, sample);
                    self.say(format_args!(
                        "Sample {}: accel {:?} gyro {:?}\n",
                        number, sample.accel, sample.gyro
                    ));
                }
            }
            SampleOutcome::SensorFault => {
                self.commit(SystemState {
                    phase: Phase::Error,
                    recording: false,
                    ..self.state
                });
                self.say(format_args!("Too many sensor read errors, recording stopped\n"));
            }
            SampleOutcome::SessionFull => {
                self.commit(SystemState {
                    phase: Phase::Ready,
                    recording: false,
                    ..self.state
                });
                self.say(format_args!("Sample counter exhausted, recording stopped\n"));
            }
            SampleOutcome::WriteFailed(e) => {
                let sample = self.state.sample_count + 1;
                self.commit(SystemState {
                    phase: Phase::Error,
                    recording: false,
                    ..self.state
                });
                self.say(format_args!(
                    "Writing sample {} failed ({}), recording stopped\n",
                    sample, e
                ));
            }
        }
    }

    fn check_storage(&mut self, now: Instant) {
        match self.storage.poll_health(&mut self.recording, now) {
            HealthStatus::NotMounted | HealthStatus::Healthy | HealthStatus::Degraded(_) => {}
            HealthStatus::Removed => {
                // removal is an expected event, not a fault
                let phase = match self.state.phase {
                    Phase::Error => Phase::Error,
                    _ => Phase::Ready,
                };
                self.commit(SystemState {
                    phase,
                    storage_mounted: false,
                    recording: false,
                    ..self.state
                });
                self.say(format_args!("SD card removed\n"));
                self.render_display(now);
            }
        }
    }

    /// Raises `storage_busy` around `op` and shows it before the blocking call starts
    fn with_storage_busy<R>(&mut self, now: Instant, op: impl FnOnce(&mut Self) -> R) -> R {
        self.commit(SystemState {
            storage_busy: true,
            ..self.state
        });
        self.render_indicator(now);
        let result = op(self);
        self.commit(SystemState {
            storage_busy: false,
            ..self.state
        });
        result
    }

    /// Replaces the state snapshot and queues the buzzer feedback of the transition
    fn commit(&mut self, next: SystemState) {
        debug_assert!(next.is_consistent(), "inconsistent state {:?}", next);
        if let Some(motif) = Motif::for_transition(&self.state, &next) {
            debug!("Transition feedback {:?}", motif);
            self.buzzer.play(motif);
        }
        if next.phase != self.state.phase {
            info!("Phase {:?} -> {:?}", self.state.phase, next.phase);
        }
        self.state = next;
    }

    fn render_indicator(&mut self, now: Instant) {
        let target = indicator::evaluate(&self.state);
        let since = match self.pattern {
            Some((shown, since)) if shown == target => since,
            _ => {
                self.pattern = Some((target, now));
                now
            }
        };
        let shown_for = now
            .checked_duration_since(since)
            .unwrap_or(Duration::from_ticks(0));
        let rgb = target.rgb_at(shown_for);
        if self.led != Some(rgb) {
            self.indicator.set_rgb(rgb.0, rgb.1, rgb.2);
            self.led = Some(rgb);
        }
    }

    fn render_display(&mut self, now: Instant) {
        self.display.render(&ViewModel::from_state(&self.state, now));
    }

    fn say(&mut self, args: fmt::Arguments<'_>) {
        // console output is best effort
        let _ = self.console.write_fmt(args);
    }
}
