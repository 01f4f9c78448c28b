//! Inter-task handoffs
//!
//! The controller loop is the only place where decisions are made. The small tasks around
//! it only hand raw inputs in and tone requests out through the statics below.

use datalogger_core::config::DEBOUNCE_WINDOW;
use datalogger_core::input::InputTracker;
use defmt::Format;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::Duration;

/// Debounced button state, written by the button tasks and consumed by the controller
pub static INPUTS: InputTracker = InputTracker::new(DEBOUNCE_WINDOW);

/// Bytes received on the serial console, capacity of 32
pub static SERIAL_RX: Channel<CriticalSectionRawMutex, u8, 32> = Channel::new();

/// Next tone for the buzzer task
pub static TONE: Signal<CriticalSectionRawMutex, ToneRequest> = Signal::new();

/// One buzzer tone
#[derive(Debug, Clone, Copy, Format)]
pub struct ToneRequest {
    pub freq_hz: u16,
    pub duration: Duration,
}

/// Queues a received byte, dropping it when the controller falls behind
pub fn send_serial(byte: u8) -> bool {
    SERIAL_RX.try_send(byte).is_ok()
}

/// Takes the next received byte without waiting
pub fn try_receive_serial() -> Option<u8> {
    SERIAL_RX.try_receive().ok()
}

/// Starts a tone; a tone still playing is cut short
pub fn play_tone(freq_hz: u16, duration_ms: u16) {
    TONE.signal(ToneRequest {
        freq_hz,
        duration: Duration::from_millis(duration_ms as u64),
    });
}

/// Waits for the next tone request
pub async fn wait_tone() -> ToneRequest {
    TONE.wait().await
}
