//! Linux SPI device implementation
//!
//! This module provides the `LinuxSpi` struct that implements the
//! `SpiTransport` trait using Linux's spidev interface.

use crate::error::{LinuxSpiError, Result};

use spipty_core::error::Result as CoreResult;
use spipty_core::transport::SpiTransport;

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Default SPI bus of the GPS receiver
pub const DEFAULT_BUS: u8 = 1;

/// Default chip select of the GPS receiver
pub const DEFAULT_CHIP_SELECT: u8 = 1;

/// Default SPI clock speed in Hz (125 kHz)
pub const DEFAULT_SPEED_HZ: u32 = 125_000;

/// SPI mode constants
pub mod mode {
    /// SPI mode 0: CPOL=0, CPHA=0
    pub const MODE_0: u8 = 0;
    /// SPI mode 1: CPOL=0, CPHA=1
    pub const MODE_1: u8 = 1;
    /// SPI mode 2: CPOL=1, CPHA=0
    pub const MODE_2: u8 = 2;
    /// SPI mode 3: CPOL=1, CPHA=1
    pub const MODE_3: u8 = 3;
}

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_write_ptr;

    // SPI ioctl magic number
    const SPI_IOC_MAGIC: u8 = b'k';

    // SPI ioctl type numbers
    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    /// Size of spi_ioc_transfer struct (for 64-bit systems)
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// Calculate ioctl number for SPI_IOC_MESSAGE(n)
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        // _IOW(SPI_IOC_MAGIC, 0, char[size]) with _IOC_WRITE = 1
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

/// Configuration for opening a Linux SPI device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxSpiConfig {
    /// Device path (e.g., "/dev/spidev1.1")
    pub device: String,
    /// SPI clock speed in Hz (default: 125 kHz)
    pub speed_hz: u32,
    /// SPI mode (0-3, default: 0)
    pub mode: u8,
}

impl Default for LinuxSpiConfig {
    fn default() -> Self {
        Self::for_bus(DEFAULT_BUS, DEFAULT_CHIP_SELECT)
    }
}

impl LinuxSpiConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            speed_hz: DEFAULT_SPEED_HZ,
            mode: mode::MODE_0,
        }
    }

    /// Configuration for `/dev/spidev<bus>.<chip_select>`
    pub fn for_bus(bus: u8, chip_select: u8) -> Self {
        Self::new(format!("/dev/spidev{}.{}", bus, chip_select))
    }

    /// Set the SPI clock speed in Hz
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Set the SPI mode (0-3)
    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = mode;
        self
    }

    /// Check the configuration before touching the device
    pub fn validate(&self) -> Result<()> {
        if self.device.is_empty() {
            return Err(LinuxSpiError::NoDevice);
        }
        if self.mode > mode::MODE_3 {
            return Err(LinuxSpiError::InvalidParameter(format!(
                "SPI mode {} (must be 0-3)",
                self.mode
            )));
        }
        if self.speed_hz == 0 {
            return Err(LinuxSpiError::InvalidParameter(
                "SPI speed must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// GPS receiver link over a Linux spidev device
///
/// The device handle is dropped after a transfer fault and re-created by
/// [`SpiTransport::connect`].
pub struct LinuxSpi {
    /// Settings reapplied on every (re)connect
    config: LinuxSpiConfig,
    /// File handle for spidev device, `None` while disconnected
    file: Option<File>,
}

impl LinuxSpi {
    /// Create a disconnected transport; call `connect` before reading
    pub fn new(config: LinuxSpiConfig) -> Self {
        Self { config, file: None }
    }

    /// Open a Linux SPI device with the given configuration
    pub fn open(config: &LinuxSpiConfig) -> Result<Self> {
        let mut spi = Self::new(config.clone());
        spi.reopen()?;
        Ok(spi)
    }

    /// Open a device with default settings
    pub fn open_device(device: &str) -> Result<Self> {
        Self::open(&LinuxSpiConfig::new(device))
    }

    /// The configuration this transport (re)opens with
    pub fn config(&self) -> &LinuxSpiConfig {
        &self.config
    }

    /// Whether a device handle is currently held
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Close any open handle, then open and configure the device
    pub fn reopen(&mut self) -> Result<()> {
        self.config.validate()?;
        self.file = None;

        let config = &self.config;
        log::debug!("linux_spi: Opening device {}", config.device);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| LinuxSpiError::OpenFailed {
                path: config.device.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        // Set SPI mode
        let mode = config.mode;
        unsafe {
            ioctl::spi_ioc_wr_mode(fd, &mode).map_err(|e| LinuxSpiError::SetModeFailed {
                mode,
                source: std::io::Error::from_raw_os_error(e as i32),
            })?;
        }

        // Set bits per word (always 8)
        let bits: u8 = 8;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits).map_err(|e| {
                LinuxSpiError::SetBitsPerWordFailed {
                    bits,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        // Set clock speed
        let speed = config.speed_hz;
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed).map_err(|e| {
                LinuxSpiError::SetSpeedFailed {
                    speed,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        log::info!(
            "linux_spi: Opened {} (mode={}, speed={} kHz)",
            config.device,
            mode,
            speed / 1000
        );

        self.file = Some(file);
        Ok(())
    }

    /// Perform one full-duplex single-byte transfer
    fn spi_transfer(&mut self, tx: u8) -> Result<u8> {
        let fd = match &self.file {
            Some(file) => file.as_raw_fd(),
            None => return Err(LinuxSpiError::NotOpen(self.config.device.clone())),
        };

        let tx_buf = [tx];
        let mut rx_buf = [0u8; 1];
        let transfer = SpiIocTransfer {
            tx_buf: tx_buf.as_ptr() as u64,
            rx_buf: rx_buf.as_mut_ptr() as u64,
            len: 1,
            speed_hz: self.config.speed_hz,
            bits_per_word: 8,
            ..Default::default()
        };

        let ioctl_num = ioctl::spi_ioc_message(1);
        let ret = unsafe { libc::ioctl(fd, ioctl_num, &transfer as *const SpiIocTransfer) };

        if ret < 0 {
            return Err(LinuxSpiError::TransferFailed(
                std::io::Error::last_os_error(),
            ));
        }

        Ok(rx_buf[0])
    }
}

impl SpiTransport for LinuxSpi {
    fn connect(&mut self) -> CoreResult<()> {
        // Repeats every poll while unplugged; the bridge decides what to report
        self.reopen().map_err(|e| {
            log::debug!("linux_spi: {}", e);
            e.into()
        })
    }

    fn transfer_byte(&mut self, tx: u8) -> CoreResult<u8> {
        self.spi_transfer(tx).map_err(|e| {
            log::debug!("linux_spi: {}", e);
            // Drop the handle so a failed reconnect is seen as not connected
            if matches!(e, LinuxSpiError::TransferFailed(_)) {
                self.file = None;
            }
            e.into()
        })
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(us as u64));
    }
}
