//! Error types for spipty-core
//!
//! This module provides a no_std compatible error type shared by the
//! transport drivers and the control loop. Driver crates keep their own
//! detailed error types and map them onto this one at the trait boundary.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Transport errors
    /// Opening or configuring the SPI device failed
    ConnectFailed,
    /// The device is not open (never connected, or dropped after a fault)
    NotConnected,
    /// SPI transfer failed (device unplugged, bus error)
    TransferFailed,

    // Output errors
    /// Writing or flushing a sentence to the output failed
    OutputFailed,
    /// The output is full because nobody is reading it
    OutputBlocked,
}

impl Error {
    /// Whether this fault came from the SPI link and calls for a reconnect
    pub fn is_transport_fault(&self) -> bool {
        matches!(self, Self::NotConnected | Self::TransferFailed)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "failed to open SPI device"),
            Self::NotConnected => write!(f, "SPI device not connected"),
            Self::TransferFailed => write!(f, "SPI transfer failed"),
            Self::OutputFailed => write!(f, "failed to write sentence to output"),
            Self::OutputBlocked => write!(f, "output not drained, sentence dropped"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
