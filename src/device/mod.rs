//! Drivers behind the core's hardware seams
pub mod oled;
pub mod sd_card;
pub mod serial;
pub mod status_led;
