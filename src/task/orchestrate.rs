//! System orchestration
//!
//! Owns the drivers and the system controller. Every pass drains the serial input, lets
//! the controller run whatever component is due and yields for a millisecond.

use datalogger_core::config::LoggerConfig;
use datalogger_core::controller::SystemController;
use datalogger_core::mpu6050::Mpu6050;
use defmt::info;
use embassy_rp::i2c::{self, I2c};
use embassy_time::{Delay, Duration, Instant, Timer};

use crate::device::oled::Oled;
use crate::device::sd_card::SdStorage;
use crate::device::serial::SerialConsole;
use crate::device::status_led::StatusIndicator;
use crate::system::event;
use crate::system::resources::{DisplayResources, ImuResources, SdCardResources, StatusLedResources};

/// Pause between two passes of the controller loop
const LOOP_INTERVAL: Duration = Duration::from_millis(1);

const IMU_I2C_FREQUENCY_HZ: u32 = 400_000;

/// Main orchestrator task
///
/// Brings up the sensor, card, display and status LED drivers and hands them to the
/// system controller. The controller then owns them for the lifetime of the firmware;
/// this task only feeds it serial bytes and the current time.
///
/// # Arguments
///
/// * `imu` - I2C0 and pins of the MPU6050
/// * `display` - I2C1 and pins of the SSD1306 panel
/// * `sd_card` - SPI0 and pins of the SD card, chip select included
/// * `status_led` - Red, green and blue LED pins
/// * `console` - Transmit half of the serial console
#[embassy_executor::task]
pub async fn orchestrate(
    imu: ImuResources,
    display: DisplayResources,
    sd_card: SdCardResources,
    status_led: StatusLedResources,
    console: SerialConsole,
) {
    let mut config = i2c::Config::default();
    config.frequency = IMU_I2C_FREQUENCY_HZ;
    let imu_bus = I2c::new_blocking(imu.i2c, imu.scl, imu.sda, config);

    let mut controller = SystemController::new(
        LoggerConfig::default(),
        &event::INPUTS,
        Mpu6050::new(imu_bus, Delay),
        SdStorage::new(sd_card),
        Oled::new(display),
        StatusIndicator::new(status_led),
        console,
    );

    controller.boot(Instant::now());
    info!("Entering controller loop in {:?}", controller.state().phase);

    loop {
        while let Some(byte) = event::try_receive_serial() {
            controller.handle_serial(byte, Instant::now());
        }
        controller.poll(Instant::now());
        Timer::after(LOOP_INTERVAL).await;
    }
}
