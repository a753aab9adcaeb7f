//! gps-spi-pty - Expose an SPI-attached GPS receiver as a pseudo-terminal
//!
//! Terminal-oriented consumers such as gpsd expect a serial port. This tool
//! polls a receiver over Linux spidev, keeps only the NMEA sentences that
//! pass framing and checksum validation, and writes them to a pty whose
//! slave side is linked at a stable path.
//!
//! # Architecture
//!
//! ```text
//! spidev ──► LinuxSpi ──► Framer/validate ──► PtyBridge ──► /dev/gps0 ──► gpsd
//!            (spipty-linux-spi) (spipty-core)  (spipty-pty)
//! ```
//!
//! The process runs until SIGINT or SIGTERM and then exits with
//! `128 + signal`.

mod cli;
mod notify;
mod signal;

use clap::Parser;
use cli::Cli;
use spipty_core::bridge::{Bridge, BridgeConfig};
use spipty_linux_spi::{LinuxSpi, LinuxSpiConfig};
use spipty_pty::PtyBridge;
use std::time::Duration;

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Set up the bridge and run it until a shutdown signal; returns the exit code
fn run(cli: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    signal::install()?;

    let spi_config = LinuxSpiConfig::new(cli.device.as_str())
        .with_speed(cli.spispeed.saturating_mul(1000))
        .with_mode(cli.mode);
    let spi = LinuxSpi::open(&spi_config)?;

    let pty = PtyBridge::open(&cli.pty_path)?;

    match notify::ready() {
        Ok(true) => log::debug!("Notified service manager"),
        Ok(false) => {}
        Err(e) => log::warn!("{}", e),
    }

    let config =
        BridgeConfig::default().with_poll_interval(Duration::from_millis(cli.poll_interval));
    let mut bridge = Bridge::new(spi, pty, config);

    log::info!(
        "Bridging {} to {}",
        cli.device,
        cli.pty_path.display()
    );
    let stats = bridge.run(signal::shutdown_flag());

    if let Err(e) = notify::stopping() {
        log::debug!("{}", e);
    }
    log::info!(
        "Shutting down: {} sentences sent, {} rejected, {} dropped, {} aborted reads, {} reconnects, {} other faults",
        stats.emitted,
        stats.rejected,
        stats.dropped,
        stats.aborted,
        stats.reconnects,
        stats.faults
    );

    let (spi, pty) = bridge.into_parts();
    pty.close();
    drop(spi);

    Ok(signal::exit_code())
}
