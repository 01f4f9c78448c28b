//! Hardware Resource Management
//!
//! Allocates pins and peripherals to the tasks and drivers that own them. Every resource
//! has exactly one owner; nothing here is shared between tasks.
//!
//! # Resource Groups
//! - IMU: MPU6050 on I2C0
//! - Display: SSD1306 128x64 OLED on I2C1
//! - SD card: SPI0 with a GPIO chip select
//! - Status LED: three GPIO driven channels
//! - Buttons A and B: active low, internal pull-up
//! - Buzzer: PWM slice 2, channel B
//! - Serial console: UART1 with DMA

use assign_resources::assign_resources;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::{self, UART1};
use embassy_rp::uart::InterruptHandler as UartInterruptHandler;

assign_resources! {
    /// MPU6050 6-axis IMU
    imu: ImuResources {
        i2c: I2C0,
        sda: PIN_0,
        scl: PIN_1,
    },
    /// SSD1306 OLED status display
    display: DisplayResources {
        i2c: I2C1,
        sda: PIN_14,
        scl: PIN_15,
    },
    /// SD card in SPI mode
    sd_card: SdCardResources {
        spi: SPI0,
        sck: PIN_18,
        mosi: PIN_19,
        miso: PIN_16,
        cs: PIN_17,
    },
    /// RGB status LED, one GPIO per channel
    status_led: StatusLedResources {
        red: PIN_13,
        green: PIN_11,
        blue: PIN_12,
    },
    /// Button A, toggles recording
    button_a: ButtonAResources {
        pin: PIN_5,
    },
    /// Button B, mounts and unmounts the SD card
    button_b: ButtonBResources {
        pin: PIN_6,
    },
    /// Passive buzzer
    buzzer: BuzzerResources {
        slice: PWM_SLICE2,
        pin: PIN_21,
    },
    /// Serial command line
    serial: SerialResources {
        uart: UART1,
        tx: PIN_8,
        rx: PIN_9,
        tx_dma: DMA_CH0,
        rx_dma: DMA_CH1,
    },
}

bind_interrupts!(pub struct Irqs {
    UART1_IRQ => UartInterruptHandler<UART1>;
});
