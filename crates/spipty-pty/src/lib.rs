//! spipty-pty - Pseudo-terminal endpoint
//!
//! Consumers such as gpsd expect a serial device. This crate allocates a
//! pty pair, points a stable symlink (e.g. `/dev/gps0`) at the slave side
//! and makes it world read/write. Sentences are written to the master.
//!
//! # Example
//!
//! ```no_run
//! use spipty_pty::PtyBridge;
//! use spipty_core::nmea;
//!
//! let mut pty = PtyBridge::open("/dev/gps0")?;
//! let sentence = nmea::validate(b"$GPAAA,1,2*55").unwrap();
//! pty.emit(&sentence)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bridge;
pub mod error;

pub use bridge::{PtyBridge, SLAVE_MODE};
pub use error::{PtyError, Result};
