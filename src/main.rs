//! IMU data logger firmware entry point
//!
//! Initializes the peripherals and spawns the controller loop together with the small
//! tasks feeding it.

#![no_std]
#![no_main]

use crate::device::serial::SerialConsole;
use crate::task::{
    button_handle::{button_a_handle, button_b_handle},
    buzzer_play::buzzer_play,
    orchestrate::orchestrate,
    serial_read::serial_read,
};
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_rp::config::Config;
use system::resources::{
    AssignedResources, BuzzerResources, ButtonAResources, ButtonBResources, DisplayResources,
    ImuResources, SdCardResources, SerialResources, StatusLedResources,
};
use {defmt_rtt as _, panic_probe as _};

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// Drivers behind the core's hardware seams
mod device;
/// System core modules
mod system;
/// Task implementations
mod task;

/// Firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Config::default());

    // Split the resources into separate groups, one owner each
    let r = split_resources!(p);

    let (console, serial_rx) = SerialConsole::new(r.serial);

    // Input tasks first so no early press or byte is lost
    spawner.spawn(serial_read(serial_rx)).unwrap();
    spawner.spawn(button_a_handle(r.button_a)).unwrap();
    spawner.spawn(button_b_handle(r.button_b)).unwrap();
    spawner.spawn(buzzer_play(r.buzzer)).unwrap();
    spawner
        .spawn(orchestrate(r.imu, r.display, r.sd_card, r.status_led, console))
        .unwrap();
}
