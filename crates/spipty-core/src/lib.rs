//! spipty-core - Core library for the SPI GPS pty bridge
//!
//! This crate turns the byte stream polled from a GPS receiver over SPI into
//! checksum-verified NMEA sentences. The framing and validation logic is
//! `no_std` compatible and has no hardware dependency; the control loop that
//! drives a transport and writes to an output needs `std`.
//!
//! # Features
//!
//! - `std` - Enable the control loop ([`bridge`]) (default)
//!
//! # Example
//!
//! ```
//! use spipty_core::nmea;
//!
//! let sentence = nmea::validate(b"$GPAAA,1,2*55\r").unwrap();
//! assert_eq!(sentence.as_str(), "$GPAAA,1,2*55\n");
//!
//! assert!(nmea::validate(b"$GPAAA,1,2*00").is_err());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
pub mod bridge;
pub mod error;
pub mod framer;
pub mod nmea;
pub mod transport;

pub use error::{Error, Result};
pub use framer::{Framer, Step};
pub use nmea::{validate, Rejection, Sentence};
pub use transport::SpiTransport;
