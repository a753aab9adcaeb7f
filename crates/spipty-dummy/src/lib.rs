//! spipty-dummy - Scripted GPS receiver for testing
//!
//! This crate provides a transport that replays a prepared byte stream as if
//! it were polled from a receiver over SPI. Transfer faults and failing
//! reconnects can be injected at any point, which makes the control loop
//! testable without hardware.

use std::collections::VecDeque;

use spipty_core::error::{Error, Result};
use spipty_core::framer::{BAD_TRANSFER, LINE_FEED};
use spipty_core::transport::SpiTransport;

/// One scripted transfer outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The receiver clocks out this byte
    Byte(u8),
    /// The transfer fails, as when the device is unplugged
    Fault,
}

/// Scripted receiver
///
/// Once the script is exhausted every transfer returns `0xFF`, which is what
/// an idle receiver clocks out. After a fault the device stays disconnected
/// until [`SpiTransport::connect`] succeeds.
#[derive(Debug, Clone)]
pub struct ScriptedSpi {
    script: VecDeque<Event>,
    connected: bool,
    failing_connects: usize,
    connects: usize,
    transfers: usize,
    delay_us: u64,
}

impl Default for ScriptedSpi {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSpi {
    /// Create a connected receiver with an empty script
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            connected: true,
            failing_connects: 0,
            connects: 0,
            transfers: 0,
            delay_us: 0,
        }
    }

    /// Queue raw bytes
    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.script.extend(bytes.iter().map(|&b| Event::Byte(b)));
        self
    }

    /// Queue a line as the receiver sends it, terminated by CR LF
    pub fn line(self, text: &str) -> Self {
        self.bytes(text.as_bytes()).bytes(&[b'\r', LINE_FEED])
    }

    /// Queue a bad transfer (`0xFF`)
    pub fn bad_transfer(self) -> Self {
        self.bytes(&[BAD_TRANSFER])
    }

    /// Queue a failing transfer
    pub fn fault(mut self) -> Self {
        self.script.push_back(Event::Fault);
        self
    }

    /// Make the next `count` connect attempts fail
    pub fn failing_connects(mut self, count: usize) -> Self {
        self.failing_connects = count;
        self
    }

    /// Number of connect calls so far
    pub fn connects(&self) -> usize {
        self.connects
    }

    /// Number of transfers attempted so far
    pub fn transfers(&self) -> usize {
        self.transfers
    }

    /// Total delay requested by the caller, in microseconds
    pub fn delayed_us(&self) -> u64 {
        self.delay_us
    }

    /// Whether the device is currently open
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Scripted events not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl SpiTransport for ScriptedSpi {
    fn connect(&mut self) -> Result<()> {
        self.connects += 1;
        if self.failing_connects > 0 {
            self.failing_connects -= 1;
            self.connected = false;
            log::debug!("dummy: connect refused");
            return Err(Error::ConnectFailed);
        }
        self.connected = true;
        Ok(())
    }

    fn transfer_byte(&mut self, _tx: u8) -> Result<u8> {
        self.transfers += 1;
        if !self.connected {
            return Err(Error::NotConnected);
        }
        match self.script.pop_front() {
            Some(Event::Byte(b)) => Ok(b),
            Some(Event::Fault) => {
                self.connected = false;
                Err(Error::TransferFailed)
            }
            None => Ok(BAD_TRANSFER),
        }
    }

    fn delay_us(&mut self, us: u32) {
        // No real bus to settle; just account for it
        self.delay_us += u64::from(us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use spipty_core::bridge::{Attempt, Bridge, BridgeConfig};
    use spipty_core::nmea::checksum;
    use std::io::{self, Write};
    use std::time::Duration;

    /// Output that records each flushed write separately
    #[derive(Default)]
    struct Recorder {
        pending: Vec<u8>,
        writes: Vec<Vec<u8>>,
    }

    impl Write for Recorder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.pending.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            if !self.pending.is_empty() {
                self.writes.push(std::mem::take(&mut self.pending));
            }
            Ok(())
        }
    }

    fn bridge(spi: ScriptedSpi) -> Bridge<ScriptedSpi, Recorder> {
        let config = BridgeConfig::default().with_poll_interval(Duration::ZERO);
        Bridge::new(spi, Recorder::default(), config)
    }

    fn nmea_line(body: &str) -> String {
        let body = format!("${}", body);
        format!("{}*{:02X}", body, checksum(&body))
    }

    #[test]
    fn test_read_byte_polls_with_filler_and_settles() {
        let mut spi = ScriptedSpi::new().bytes(b"$");
        assert_eq!(spi.read_byte(), Ok(b'$'));
        assert_eq!(spi.transfers(), 1);
        assert_eq!(spi.delayed_us(), 1_000);
    }

    #[test]
    fn test_idle_receiver_aborts_attempts() {
        let mut bridge = bridge(ScriptedSpi::new());
        assert_eq!(bridge.step(), Some(Attempt::Aborted));
        assert_eq!(bridge.step(), Some(Attempt::Aborted));
        assert!(bridge.output().writes.is_empty());
    }

    #[test]
    fn test_sentences_written_once_each_in_order() {
        let lines = [
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47",
            "$GPAAA,1,2*00",
            "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A",
        ];
        let spi = lines
            .iter()
            .fold(ScriptedSpi::new(), |spi, line| spi.line(line));
        let mut bridge = bridge(spi);
        for _ in 0..lines.len() {
            bridge.step();
        }

        let writes = &bridge.output().writes;
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], format!("{}\n", lines[0]).into_bytes());
        assert_eq!(writes[1], format!("{}\n", lines[2]).into_bytes());
        assert_eq!(bridge.stats().emitted, 2);
        assert_eq!(bridge.stats().rejected, 1);
    }

    #[test]
    fn test_bad_transfer_mid_sentence_does_not_leak() {
        let spi = ScriptedSpi::new()
            .bytes(b"$GPGGA,1235")
            .bad_transfer()
            .line("$GPAAA,1,2*55");
        let mut bridge = bridge(spi);

        assert_eq!(bridge.step(), Some(Attempt::Aborted));
        assert!(matches!(bridge.step(), Some(Attempt::Emitted(_))));
        assert_eq!(bridge.output().writes, vec![b"$GPAAA,1,2*55\n".to_vec()]);
    }

    #[test]
    fn test_fault_triggers_single_reconnect() {
        let spi = ScriptedSpi::new()
            .bytes(b"$GPA")
            .fault()
            .line("$GPAAA,1,2*55");
        let mut bridge = bridge(spi);

        assert_eq!(bridge.step(), None);
        assert_eq!(bridge.transport().connects(), 1);
        assert!(bridge.transport().is_connected());

        assert!(matches!(bridge.step(), Some(Attempt::Emitted(_))));
        assert_eq!(bridge.transport().connects(), 1);
        assert_eq!(bridge.output().writes.len(), 1);
    }

    #[test]
    fn test_unplugged_device_retried_every_attempt() {
        let spi = ScriptedSpi::new()
            .fault()
            .failing_connects(3)
            .line("$GPAAA,1,2*55");
        let mut bridge = bridge(spi);

        // fault, then three refused reconnects, then recovery
        for _ in 0..4 {
            assert_eq!(bridge.step(), None);
        }
        assert_eq!(bridge.transport().connects(), 4);
        assert!(bridge.transport().is_connected());

        assert!(matches!(bridge.step(), Some(Attempt::Emitted(_))));
        let stats = bridge.stats();
        assert_eq!(stats.reconnects, 4);
        assert_eq!(stats.emitted, 1);
        assert_eq!(stats.attempts, 5);
    }

    proptest! {
        #[test]
        fn prop_round_trip_preserves_count_and_order(
            bodies in proptest::collection::vec("GP[A-Z]{3}(,[0-9]{0,6}){1,6}", 0..12)
        ) {
            let lines: Vec<String> = bodies.iter().map(|b| nmea_line(b)).collect();
            let spi = lines.iter().fold(ScriptedSpi::new(), |spi, line| spi.line(line));
            let mut bridge = bridge(spi);
            for _ in 0..lines.len() {
                bridge.step();
            }

            let writes = &bridge.output().writes;
            prop_assert_eq!(writes.len(), lines.len());
            for (write, line) in writes.iter().zip(&lines) {
                prop_assert_eq!(write, &format!("{}\n", line).into_bytes());
                prop_assert_eq!(write.iter().filter(|&&b| b == b'\n').count(), 1);
            }
        }

        #[test]
        fn prop_fault_anywhere_reconnects_once(
            body in "GP[A-Z]{3}(,[0-9]{0,6}){1,6}",
            cut in 0usize..20
        ) {
            let line = nmea_line(&body);
            let cut = cut.min(line.len());
            let spi = ScriptedSpi::new()
                .bytes(&line.as_bytes()[..cut])
                .fault()
                .line(&line);
            let mut bridge = bridge(spi);

            prop_assert_eq!(bridge.step(), None);
            prop_assert_eq!(bridge.transport().connects(), 1);
            prop_assert!(matches!(bridge.step(), Some(Attempt::Emitted(_))));
            prop_assert_eq!(bridge.output().writes.len(), 1);
        }
    }
}
