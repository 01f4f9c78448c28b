//! MPU6050 register level driver
//!
//! Only what the logger needs: wake, identity check, one burst read of the raw
//! accelerometer and gyroscope registers, and a full device reset.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::SensorError;
use crate::interface::Sensor;
use crate::sample::Sample;

/// I2C address with AD0 low
pub const DEFAULT_ADDRESS: u8 = 0x68;

/// Expected value of `WHO_AM_I`
pub const WHO_AM_I_VALUE: u8 = 0x68;

mod reg {
    pub const ACCEL_XOUT_H: u8 = 0x3B;
    pub const PWR_MGMT_1: u8 = 0x6B;
    pub const WHO_AM_I: u8 = 0x75;
}

const DEVICE_RESET: u8 = 0x80;
const WAKE: u8 = 0x00;

/// Accel (6), temperature (2), gyro (6), all big endian
const BURST_LEN: usize = 14;

pub struct Mpu6050<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<I2C: I2c, D: DelayNs> Mpu6050<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_address(i2c, delay, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I2C, delay: D, address: u8) -> Self {
        Self { i2c, delay, address }
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), SensorError> {
        self.i2c.write(self.address, &[register, value]).map_err(bus_error)
    }

    fn read_registers(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), SensorError> {
        self.i2c
            .write_read(self.address, &[register], buffer)
            .map_err(bus_error)
    }

    fn wake(&mut self) -> Result<(), SensorError> {
        self.write_register(reg::PWR_MGMT_1, WAKE)
    }
}

fn bus_error<E: embedded_hal::i2c::Error>(e: E) -> SensorError {
    #[cfg(feature = "defmt")]
    debug!("I2C error: {}", defmt::Debug2Format(&e.kind()));
    #[cfg(not(feature = "defmt"))]
    let _ = e;
    SensorError::Bus
}

impl<I2C: I2c, D: DelayNs> Sensor for Mpu6050<I2C, D> {
    fn init(&mut self) -> Result<(), SensorError> {
        self.wake()?;
        self.delay.delay_ms(100);

        let mut id = [0u8];
        self.read_registers(reg::WHO_AM_I, &mut id)?;
        if id[0] != WHO_AM_I_VALUE {
            warn!("MPU6050 answered with id {:#x}", id[0]);
            return Err(SensorError::InvalidDevice(id[0]));
        }
        info!("MPU6050 ready at {:#x}", self.address);
        Ok(())
    }

    fn read(&mut self) -> Result<Sample, SensorError> {
        let mut raw = [0u8; BURST_LEN];
        self.read_registers(reg::ACCEL_XOUT_H, &mut raw)?;

        let word = |i: usize| i16::from_be_bytes([raw[i], raw[i + 1]]);
        Ok(Sample::new([word(0), word(2), word(4)], [word(8), word(10), word(12)]))
    }

    fn reset(&mut self) -> Result<(), SensorError> {
        self.write_register(reg::PWR_MGMT_1, DEVICE_RESET)?;
        self.delay.delay_ms(100);
        self.wake()?;
        self.delay.delay_ms(10);
        info!("MPU6050 reset");
        Ok(())
    }
}
