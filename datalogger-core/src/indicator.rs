//! Indicator Policy
//!
//! The LED pattern is a pure function of the [`SystemState`]: [`evaluate`] walks a fixed
//! priority table top to bottom and the first matching row wins. The pattern carries no
//! state of its own; the blink phase is counted from the moment the pattern was first
//! shown, so every blink opens with its lit half.
//!
//! Buzzer feedback is tied to transitions instead: [`Motif::for_transition`] compares the
//! previous and the next state, and [`BuzzerSequencer`] plays the chosen motif one tone at a
//! time without ever blocking the caller.

use embassy_time::{Duration, Instant};
use heapless::Deque;

use crate::interface::Indicator;
use crate::state::{Phase, SystemState};

/// Half period of the storage access blink
pub const STORAGE_BLINK: Duration = Duration::from_millis(100);

/// Half period of the error / no card blink
pub const ATTENTION_BLINK: Duration = Duration::from_millis(300);

/// Motifs waiting behind the one currently playing
const MOTIF_QUEUE_DEPTH: usize = 4;

/// LED colors available from the three channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Color {
    Off,
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
}

impl Color {
    /// Channel levels as (red, green, blue)
    pub const fn rgb(self) -> (bool, bool, bool) {
        match self {
            Color::Off => (false, false, false),
            Color::Red => (true, false, false),
            Color::Green => (false, true, false),
            Color::Blue => (false, false, true),
            Color::Yellow => (true, true, false),
            Color::Purple => (true, false, true),
        }
    }
}

/// Target LED pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorTarget {
    Solid(Color),
    Blink { color: Color, half_period: Duration },
}

impl IndicatorTarget {
    /// Channel levels to drive `shown_for` after the pattern first appeared
    pub fn rgb_at(&self, shown_for: Duration) -> (bool, bool, bool) {
        match *self {
            IndicatorTarget::Solid(color) => color.rgb(),
            IndicatorTarget::Blink { color, half_period } => {
                let half = half_period.as_ticks().max(1);
                if (shown_for.as_ticks() / half) % 2 == 0 {
                    color.rgb()
                } else {
                    Color::Off.rgb()
                }
            }
        }
    }
}

/// Maps the system state to the LED pattern
pub fn evaluate(state: &SystemState) -> IndicatorTarget {
    if state.storage_busy {
        return IndicatorTarget::Blink {
            color: Color::Blue,
            half_period: STORAGE_BLINK,
        };
    }
    match state.phase {
        Phase::Error => IndicatorTarget::Blink {
            color: Color::Purple,
            half_period: ATTENTION_BLINK,
        },
        Phase::Recording => IndicatorTarget::Solid(Color::Red),
        Phase::Mounting | Phase::Unmounting | Phase::Initializing => IndicatorTarget::Solid(Color::Yellow),
        Phase::Ready if state.storage_mounted => IndicatorTarget::Solid(Color::Green),
        Phase::Ready => IndicatorTarget::Blink {
            color: Color::Purple,
            half_period: ATTENTION_BLINK,
        },
    }
}

/// One step of a buzzer motif
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tone {
    pub freq_hz: u16,
    pub duration_ms: u16,
    /// Silence after the tone before the next step
    pub gap_ms: u16,
}

impl Tone {
    const fn new(freq_hz: u16, duration_ms: u16, gap_ms: u16) -> Self {
        Self {
            freq_hz,
            duration_ms,
            gap_ms,
        }
    }

    fn length(&self) -> Duration {
        Duration::from_millis(self.duration_ms as u64 + self.gap_ms as u64)
    }
}

const INIT_STEPS: &[Tone] = &[Tone::new(440, 100, 0)];
const STARTED_STEPS: &[Tone] = &[Tone::new(800, 150, 0)];
const STOPPED_STEPS: &[Tone] = &[Tone::new(600, 100, 50), Tone::new(600, 100, 0)];
const ERROR_STEPS: &[Tone] = &[Tone::new(200, 300, 100), Tone::new(200, 300, 0)];
const MOUNTED_STEPS: &[Tone] = &[Tone::new(1000, 80, 30), Tone::new(1200, 80, 0)];
const UNMOUNTED_STEPS: &[Tone] = &[Tone::new(800, 100, 0)];

/// Buzzer feedback sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Motif {
    Init,
    RecordingStarted,
    RecordingStopped,
    Error,
    Mounted,
    Unmounted,
}

impl Motif {
    pub const fn steps(self) -> &'static [Tone] {
        match self {
            Motif::Init => INIT_STEPS,
            Motif::RecordingStarted => STARTED_STEPS,
            Motif::RecordingStopped => STOPPED_STEPS,
            Motif::Error => ERROR_STEPS,
            Motif::Mounted => MOUNTED_STEPS,
            Motif::Unmounted => UNMOUNTED_STEPS,
        }
    }

    /// Picks the feedback for a state change, if any. Steady states never produce one.
    pub fn for_transition(prev: &SystemState, next: &SystemState) -> Option<Motif> {
        if next.phase == Phase::Error && prev.phase != Phase::Error {
            Some(Motif::Error)
        } else if prev.recording && !next.recording {
            Some(Motif::RecordingStopped)
        } else if !prev.recording && next.recording {
            Some(Motif::RecordingStarted)
        } else if !prev.storage_mounted && next.storage_mounted {
            Some(Motif::Mounted)
        } else if prev.storage_mounted && !next.storage_mounted {
            Some(Motif::Unmounted)
        } else {
            None
        }
    }
}

/// Motif currently being played
#[derive(Debug, Clone, Copy)]
struct Playing {
    motif: Motif,
    step: usize,
    step_started: Instant,
}

/// Plays motifs step by step from the controller loop
pub struct BuzzerSequencer {
    queue: Deque<Motif, MOTIF_QUEUE_DEPTH>,
    playing: Option<Playing>,
}

impl BuzzerSequencer {
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
            playing: None,
        }
    }

    /// Queues `motif` behind anything already playing
    pub fn play(&mut self, motif: Motif) {
        if self.queue.push_back(motif).is_err() {
            warn!("Buzzer queue full, dropping {:?}", motif);
        }
    }

    pub fn is_idle(&self) -> bool {
        self.playing.is_none() && self.queue.is_empty()
    }

    /// Starts the next tone when the current step is over
    pub fn poll<I: Indicator>(&mut self, now: Instant, indicator: &mut I) {
        if let Some(playing) = self.playing {
            let steps = playing.motif.steps();
            if now.saturating_duration_since(playing.step_started) < steps[playing.step].length() {
                return;
            }
            let step = playing.step + 1;
            if step < steps.len() {
                indicator.tone(steps[step].freq_hz, steps[step].duration_ms);
                self.playing = Some(Playing {
                    step,
                    step_started: now,
                    ..playing
                });
                return;
            }
            self.playing = None;
        }

        if let Some(motif) = self.queue.pop_front() {
            if let Some(first) = motif.steps().first() {
                indicator.tone(first.freq_hz, first.duration_ms);
                self.playing = Some(Playing {
                    motif,
                    step: 0,
                    step_started: now,
                });
            }
        }
    }
}

impl Default for BuzzerSequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeIndicator;

    fn ready(mounted: bool) -> SystemState {
        SystemState {
            phase: Phase::Ready,
            storage_mounted: mounted,
            ..SystemState::initial()
        }
    }

    fn recording() -> SystemState {
        SystemState {
            phase: Phase::Recording,
            storage_mounted: true,
            recording: true,
            ..SystemState::initial()
        }
    }

    #[test]
    fn storage_busy_wins_over_error() {
        let state = SystemState {
            phase: Phase::Error,
            storage_busy: true,
            ..SystemState::initial()
        };
        assert_eq!(
            evaluate(&state),
            IndicatorTarget::Blink {
                color: Color::Blue,
                half_period: Duration::from_millis(100)
            }
        );
    }

    #[test]
    fn storage_busy_wins_over_recording() {
        let state = SystemState {
            storage_busy: true,
            ..recording()
        };
        assert!(matches!(evaluate(&state), IndicatorTarget::Blink { color: Color::Blue, .. }));
    }

    #[test]
    fn priority_table() {
        let error = SystemState {
            phase: Phase::Error,
            ..ready(true)
        };
        assert_eq!(
            evaluate(&error),
            IndicatorTarget::Blink {
                color: Color::Purple,
                half_period: Duration::from_millis(300)
            }
        );
        assert_eq!(evaluate(&recording()), IndicatorTarget::Solid(Color::Red));
        for phase in [Phase::Mounting, Phase::Unmounting, Phase::Initializing] {
            let state = SystemState { phase, ..ready(false) };
            assert_eq!(evaluate(&state), IndicatorTarget::Solid(Color::Yellow));
        }
        assert_eq!(evaluate(&ready(true)), IndicatorTarget::Solid(Color::Green));
        assert_eq!(
            evaluate(&ready(false)),
            IndicatorTarget::Blink {
                color: Color::Purple,
                half_period: Duration::from_millis(300)
            }
        );
    }

    #[test]
    fn blink_alternates_every_half_period() {
        let target = IndicatorTarget::Blink {
            color: Color::Purple,
            half_period: Duration::from_millis(300),
        };
        assert_eq!(target.rgb_at(Duration::from_millis(0)), (true, false, true));
        assert_eq!(target.rgb_at(Duration::from_millis(299)), (true, false, true));
        assert_eq!(target.rgb_at(Duration::from_millis(300)), (false, false, false));
        assert_eq!(target.rgb_at(Duration::from_millis(600)), (true, false, true));
    }

    #[test]
    fn transitions_select_motifs() {
        assert_eq!(Motif::for_transition(&ready(true), &recording()), Some(Motif::RecordingStarted));
        assert_eq!(Motif::for_transition(&recording(), &ready(true)), Some(Motif::RecordingStopped));
        assert_eq!(Motif::for_transition(&ready(false), &ready(true)), Some(Motif::Mounted));
        assert_eq!(Motif::for_transition(&ready(true), &ready(false)), Some(Motif::Unmounted));
        let failed = SystemState {
            phase: Phase::Error,
            ..ready(true)
        };
        assert_eq!(Motif::for_transition(&recording(), &failed), Some(Motif::Error));
        assert_eq!(Motif::for_transition(&failed, &failed), None);
        assert_eq!(Motif::for_transition(&ready(true), &ready(true)), None);
    }

    #[test]
    fn sequencer_plays_steps_with_gaps() {
        let mut indicator = FakeIndicator::default();
        let mut buzzer = BuzzerSequencer::new();
        buzzer.play(Motif::Error);

        buzzer.poll(Instant::from_millis(0), &mut indicator);
        assert_eq!(indicator.tones(), vec![(200, 300)]);

        // tone plus gap is 400 ms
        buzzer.poll(Instant::from_millis(399), &mut indicator);
        assert_eq!(indicator.tones().len(), 1);

        buzzer.poll(Instant::from_millis(400), &mut indicator);
        assert_eq!(indicator.tones(), vec![(200, 300), (200, 300)]);
        assert!(!buzzer.is_idle());

        buzzer.poll(Instant::from_millis(700), &mut indicator);
        assert!(buzzer.is_idle());
    }

    #[test]
    fn queued_motifs_follow_each_other() {
        let mut indicator = FakeIndicator::default();
        let mut buzzer = BuzzerSequencer::new();
        buzzer.play(Motif::RecordingStopped);
        buzzer.play(Motif::Unmounted);

        let mut now = 0;
        while !buzzer.is_idle() && now < 2_000 {
            buzzer.poll(Instant::from_millis(now), &mut indicator);
            now += 10;
        }
        assert_eq!(indicator.tones(), vec![(600, 100), (600, 100), (800, 100)]);
    }
}
