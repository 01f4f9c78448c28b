//! RGB status LED and buzzer front
//!
//! The LED channels are plain GPIO outputs. Tones are only handed to the buzzer task, so
//! starting one never blocks the controller loop.

use datalogger_core::interface::Indicator;
use embassy_rp::gpio::{Level, Output};

use crate::system::event;
use crate::system::resources::StatusLedResources;

pub struct StatusIndicator {
    red: Output<'static>,
    green: Output<'static>,
    blue: Output<'static>,
}

impl StatusIndicator {
    pub fn new(r: StatusLedResources) -> Self {
        Self {
            red: Output::new(r.red, Level::Low),
            green: Output::new(r.green, Level::Low),
            blue: Output::new(r.blue, Level::Low),
        }
    }
}

impl Indicator for StatusIndicator {
    fn set_rgb(&mut self, red: bool, green: bool, blue: bool) {
        self.red.set_level(Level::from(red));
        self.green.set_level(Level::from(green));
        self.blue.set_level(Level::from(blue));
    }

    fn tone(&mut self, freq_hz: u16, duration_ms: u16) {
        event::play_tone(freq_hz, duration_ms);
    }
}
