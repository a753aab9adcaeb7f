//! spipty-linux-spi - Linux spidev transport
//!
//! This crate polls a GPS receiver through the `/dev/spidevX.Y` character
//! device interface, one full-duplex byte per transfer.
//!
//! # Overview
//!
//! The Linux SPI driver exposes SPI controllers through character devices
//! at `/dev/spidevX.Y` where X is the bus number and Y is the chip select.
//! The receiver sits on bus 1, chip select 1 and is clocked at 125 kHz in
//! SPI mode 0, which is what [`LinuxSpiConfig::default`] selects.
//!
//! # Example
//!
//! ```no_run
//! use spipty_linux_spi::{LinuxSpi, LinuxSpiConfig};
//! use spipty_core::SpiTransport;
//!
//! // Open /dev/spidev1.1 at 125 kHz, mode 0
//! let mut spi = LinuxSpi::open(&LinuxSpiConfig::default())?;
//!
//! // Or with custom settings
//! let config = LinuxSpiConfig::for_bus(0, 0)
//!     .with_speed(250_000)
//!     .with_mode(0);
//! let mut spi = LinuxSpi::open(&config)?;
//!
//! let byte = spi.read_byte()?;
//! println!("received 0x{:02X}", byte);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device
//! - May require adding user to `spi` group or using udev rules

pub mod device;
pub mod error;

// Re-exports
pub use device::{mode, LinuxSpi, LinuxSpiConfig, DEFAULT_SPEED_HZ};
pub use error::{LinuxSpiError, Result};
