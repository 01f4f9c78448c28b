//! Serial console on UART1
//!
//! The transmit half stays with the controller as a blocking `fmt::Write` sink. The
//! receive half goes to its own task, see `task::serial_read`.

use core::fmt;

use embassy_rp::peripherals::UART1;
use embassy_rp::uart::{self, Async, Uart, UartRx, UartTx};

use crate::system::resources::{Irqs, SerialResources};

const BAUD_RATE: u32 = 115_200;

pub type SerialRx = UartRx<'static, UART1, Async>;

pub struct SerialConsole {
    tx: UartTx<'static, UART1, Async>,
}

impl SerialConsole {
    /// Splits the UART into the console and the receiver for the read task
    pub fn new(r: SerialResources) -> (Self, SerialRx) {
        let mut config = uart::Config::default();
        config.baudrate = BAUD_RATE;
        let uart = Uart::new(r.uart, r.tx, r.rx, Irqs, r.tx_dma, r.rx_dma, config);
        let (tx, rx) = uart.split();
        (Self { tx }, rx)
    }

    fn send(&mut self, bytes: &[u8]) -> fmt::Result {
        self.tx.blocking_write(bytes).map_err(|_| fmt::Error)
    }
}

impl fmt::Write for SerialConsole {
    /// Terminals expect CRLF, every `\n` goes out as `\r\n`
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for (i, part) in s.split('\n').enumerate() {
            if i > 0 {
                self.send(b"\r\n")?;
            }
            if !part.is_empty() {
                self.send(part.as_bytes())?;
            }
        }
        Ok(())
    }
}
