//! Serial input
//!
//! Forwards every received byte to the controller. Command parsing is left to the core.

use defmt::warn;

use crate::device::serial::SerialRx;
use crate::system::event;

/// Serial receive task
///
/// # Arguments
///
/// * `rx` - Receive half of the serial console
#[embassy_executor::task]
pub async fn serial_read(mut rx: SerialRx) {
    let mut buf = [0u8; 1];
    loop {
        match rx.read(&mut buf).await {
            Ok(()) => {
                if !event::send_serial(buf[0]) {
                    warn!("Serial input dropped, controller busy");
                }
            }
            Err(e) => warn!("Serial read error: {:?}", e),
        }
    }
}
