//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gps-spi-pty")]
#[command(
    author,
    version,
    about = "Expose an SPI-attached GPS receiver as a pseudo-terminal",
    long_about = "Polls NMEA sentences from a GPS receiver on a Linux spidev device, \
                  drops corrupted lines, and writes the rest to a pseudo-terminal whose \
                  slave side is linked at PTY_PATH. Point gpsd (or any serial consumer) \
                  at PTY_PATH."
)]
pub struct Cli {
    /// Path of the symlink to the pty slave (e.g. /dev/gps0)
    pub pty_path: PathBuf,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// spidev device the receiver is attached to
    #[arg(long, default_value = "/dev/spidev1.1")]
    pub device: String,

    /// SPI clock speed in kHz
    #[arg(long, default_value_t = 125)]
    pub spispeed: u32,

    /// SPI mode (0-3)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
    pub mode: u8,

    /// Delay between read attempts in milliseconds
    #[arg(long, default_value_t = 30)]
    pub poll_interval: u64,
}
