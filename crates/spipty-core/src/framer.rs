//! Byte-at-a-time sentence framing
//!
//! The receiver is polled one byte per SPI transfer. [`Framer`] collects
//! those bytes until a line feed, then hands the frame to
//! [`validate`](crate::nmea::validate). A `0xFF` byte means the receiver had
//! nothing valid to send; the current read attempt is dropped.

use crate::nmea::{check_shape, validate, Rejection, Sentence, MAX_FRAME_LEN, START_DELIMITER};

/// Frame boundary
pub const LINE_FEED: u8 = b'\n';

/// Byte clocked out by the receiver when a transfer carried no data
pub const BAD_TRANSFER: u8 = 0xFF;

/// Outcome of feeding one byte to the framer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Byte accumulated, frame still open
    Pending,
    /// Bad transfer; the attempt was abandoned and the buffer cleared
    Aborted,
    /// Line feed seen; the frame was validated and the buffer cleared
    Frame(Result<Sentence, Rejection>),
}

/// Candidate sentence accumulator
///
/// Storage is bounded to the longest valid frame. Bytes past that are only
/// counted, which is enough for the length check to reject the frame.
#[derive(Debug, Default)]
pub struct Framer {
    buf: heapless::Vec<u8, MAX_FRAME_LEN>,
    len: usize,
    starts: usize,
}

impl Framer {
    /// Create an empty framer
    pub const fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
            len: 0,
            starts: 0,
        }
    }

    /// Feed one received byte
    pub fn push(&mut self, byte: u8) -> Step {
        match byte {
            BAD_TRANSFER => {
                self.reset();
                Step::Aborted
            }
            LINE_FEED => {
                let outcome = self.finish();
                self.reset();
                Step::Frame(outcome)
            }
            _ => {
                self.len = self.len.saturating_add(1);
                if byte == START_DELIMITER {
                    self.starts += 1;
                }
                // Overflow only matters to the length check
                let _ = self.buf.push(byte);
                Step::Pending
            }
        }
    }

    /// Drop any partially accumulated frame
    pub fn reset(&mut self) {
        self.buf.clear();
        self.len = 0;
        self.starts = 0;
    }

    /// Number of bytes seen since the last boundary
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no bytes were seen since the last boundary
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn finish(&self) -> Result<Sentence, Rejection> {
        check_shape(self.starts, self.len)?;
        validate(&self.buf)
    }
}
