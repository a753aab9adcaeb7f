//! SPI transport trait
//!
//! The receiver is read by clocking out a filler byte and sampling what comes
//! back on MISO, one byte per transfer. Implementations only provide the raw
//! transfer, a way to (re)open the device, and a delay; [`SpiTransport::read_byte`]
//! layers the polling protocol on top.
//!
//! ## Example: Implementing a transport
//!
//! ```ignore
//! impl SpiTransport for MyBus {
//!     fn connect(&mut self) -> Result<()> {
//!         self.reopen().map_err(|_| Error::ConnectFailed)
//!     }
//!
//!     fn transfer_byte(&mut self, tx: u8) -> Result<u8> {
//!         self.xfer(tx).map_err(|_| Error::TransferFailed)
//!     }
//!
//!     fn delay_us(&mut self, us: u32) {
//!         std::thread::sleep(std::time::Duration::from_micros(us as u64));
//!     }
//! }
//! ```

use crate::error::Result;

/// Byte sent while polling; the receiver ignores it
pub const FILLER_BYTE: u8 = 0xFF;

/// Settling time after each transfer, from the receiver datasheet
pub const SETTLE_US: u32 = 1_000;

/// A full-duplex byte link to the GPS receiver
pub trait SpiTransport {
    /// Open the device, or reopen it after a fault
    ///
    /// Must be safe to call repeatedly; any previously open handle is
    /// released first.
    fn connect(&mut self) -> Result<()>;

    /// Clock out `tx` and return the byte received in the same transfer
    fn transfer_byte(&mut self, tx: u8) -> Result<u8>;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);

    /// Poll one byte from the receiver
    ///
    /// Sends [`FILLER_BYTE`], then waits [`SETTLE_US`] before returning
    /// the received byte.
    fn read_byte(&mut self) -> Result<u8> {
        let byte = self.transfer_byte(FILLER_BYTE)?;
        self.delay_us(SETTLE_US);
        Ok(byte)
    }
}
