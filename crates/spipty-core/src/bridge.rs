//! Control loop: SPI transport in, validated sentences out
//!
//! [`Bridge`] owns the transport and the output for the lifetime of the
//! process. Each iteration performs one read attempt (poll bytes until a
//! line feed or a bad transfer), writes the sentence if it validated, then
//! sleeps for the poll interval. Faults never end the loop: transport faults
//! trigger a reconnect, anything else is logged. The stop flag is checked
//! before every polled byte, so a receiver that never ends a frame cannot
//! hold off shutdown.

use crate::error::{Error, Result};
use crate::framer::{Framer, Step};
use crate::nmea::{Rejection, Sentence};
use crate::transport::SpiTransport;

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Default delay between read attempts
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(30);

/// Control loop configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Delay after every read attempt, whatever its outcome
    pub poll_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl BridgeConfig {
    /// Set the delay between read attempts
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Result of one successful read attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// A sentence validated and was written to the output
    Emitted(Sentence),
    /// A frame was read but failed validation
    Rejected(Rejection),
    /// The receiver returned a bad transfer before the frame ended
    Aborted,
    /// Shutdown was requested before the frame ended
    Interrupted,
}

/// Counters kept by the control loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Read attempts started
    pub attempts: u64,
    /// Sentences written to the output
    pub emitted: u64,
    /// Frames dropped by validation
    pub rejected: u64,
    /// Attempts abandoned on a bad transfer
    pub aborted: u64,
    /// Reconnects after a transport fault
    pub reconnects: u64,
    /// Valid sentences dropped because the consumer was not reading
    pub dropped: u64,
    /// Other faults (output errors)
    pub faults: u64,
}

/// The SPI to output bridge
pub struct Bridge<T, W> {
    transport: T,
    output: W,
    framer: Framer,
    config: BridgeConfig,
    stats: BridgeStats,
    link_down: bool,
    output_stalled: bool,
}

impl<T: SpiTransport, W: Write> Bridge<T, W> {
    /// Create a bridge over an already connected transport
    pub fn new(transport: T, output: W, config: BridgeConfig) -> Self {
        Self {
            transport,
            output,
            framer: Framer::new(),
            config,
            stats: BridgeStats::default(),
            link_down: false,
            output_stalled: false,
        }
    }

    /// Counters accumulated so far
    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Borrow the output
    pub fn output(&self) -> &W {
        &self.output
    }

    /// Take the transport and output back, closing nothing
    pub fn into_parts(self) -> (T, W) {
        (self.transport, self.output)
    }

    /// Poll the receiver until one frame ends, and emit it if valid
    ///
    /// Every attempt starts from an empty buffer. Errors are returned
    /// unhandled; [`Bridge::step`] applies the fault policy.
    pub fn read_attempt(&mut self) -> Result<Attempt> {
        self.attempt(&AtomicBool::new(false))
    }

    fn attempt(&mut self, stop: &AtomicBool) -> Result<Attempt> {
        self.framer.reset();
        loop {
            if stop.load(Ordering::SeqCst) {
                return Ok(Attempt::Interrupted);
            }
            let byte = self.transport.read_byte()?;
            match self.framer.push(byte) {
                Step::Pending => {}
                Step::Aborted => return Ok(Attempt::Aborted),
                Step::Frame(Err(rejection)) => {
                    log::trace!("dropped frame: {}", rejection);
                    return Ok(Attempt::Rejected(rejection));
                }
                Step::Frame(Ok(sentence)) => {
                    self.emit(&sentence)?;
                    return Ok(Attempt::Emitted(sentence));
                }
            }
        }
    }

    /// One read attempt with fault containment, without the poll delay
    ///
    /// Returns `None` when the attempt ended in a fault.
    pub fn step(&mut self) -> Option<Attempt> {
        self.step_until(&AtomicBool::new(false))
    }

    fn step_until(&mut self, stop: &AtomicBool) -> Option<Attempt> {
        self.stats.attempts += 1;
        match self.attempt(stop) {
            Ok(attempt) => {
                if self.link_down {
                    log::info!("SPI link recovered");
                    self.link_down = false;
                }
                match &attempt {
                    Attempt::Emitted(_) => self.stats.emitted += 1,
                    Attempt::Rejected(_) => self.stats.rejected += 1,
                    Attempt::Aborted => self.stats.aborted += 1,
                    Attempt::Interrupted => {}
                }
                Some(attempt)
            }
            Err(e) if e.is_transport_fault() => {
                self.reconnect(e);
                None
            }
            Err(Error::OutputBlocked) => {
                self.stats.dropped += 1;
                None
            }
            Err(e) => {
                self.stats.faults += 1;
                log::error!("{}", e);
                None
            }
        }
    }

    /// Run until `stop` is set, returning the final counters
    pub fn run(&mut self, stop: &AtomicBool) -> BridgeStats {
        log::debug!(
            "bridge: polling every {} ms",
            self.config.poll_interval.as_millis()
        );
        while !stop.load(Ordering::SeqCst) {
            self.step_until(stop);
            if !self.config.poll_interval.is_zero() && !stop.load(Ordering::SeqCst) {
                std::thread::sleep(self.config.poll_interval);
            }
        }
        self.stats
    }

    fn emit(&mut self, sentence: &Sentence) -> Result<()> {
        let written = self
            .output
            .write_all(sentence.as_bytes())
            .and_then(|_| self.output.flush());
        match written {
            Ok(()) => {
                if self.output_stalled {
                    log::info!("Consumer resumed reading");
                    self.output_stalled = false;
                }
                log::trace!("bridge: sent {}", sentence.as_str().trim_end());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if self.output_stalled {
                    log::debug!("bridge: dropped {}", sentence.kind());
                } else {
                    log::warn!("Consumer is not reading; dropping sentences");
                    self.output_stalled = true;
                }
                Err(Error::OutputBlocked)
            }
            Err(e) => {
                log::debug!("bridge: write of {} failed: {}", sentence.kind(), e);
                Err(Error::OutputFailed)
            }
        }
    }

    fn reconnect(&mut self, cause: Error) {
        // An unplugged device faults on every attempt; only report the first
        if self.link_down {
            log::debug!("{}; reconnecting", cause);
        } else {
            log::warn!("{}; reconnecting", cause);
            self.link_down = true;
        }
        self.stats.reconnects += 1;
        if let Err(e) = self.transport.connect() {
            log::debug!("reconnect failed: {}", e);
        }
    }
}
