//! NMEA sentence validation
//!
//! The SPI link to the receiver has no framing or error correction of its
//! own, so every candidate line is checked before it reaches the consumer.
//! [`validate`] is a pure function over the raw bytes collected between two
//! line feeds; the checks run in a fixed order and stop at the first failure.

use core::fmt;

/// Byte that starts every NMEA sentence (`$`)
pub const START_DELIMITER: u8 = b'$';

/// Separator between sentence body and checksum (`*`)
pub const CHECKSUM_DELIMITER: char = '*';

/// Longest frame accepted, in bytes, excluding the terminating line feed
pub const MAX_FRAME_LEN: usize = 83;

/// Capacity of an accepted sentence: the longest frame plus its `\n`
pub const SENTENCE_CAPACITY: usize = MAX_FRAME_LEN + 1;

/// Carriage return, the only control byte allowed inside a frame
const CR: u8 = 13;

/// Printable range accepted inside a frame (space through `z`)
const PRINTABLE_MIN: u8 = 32;
const PRINTABLE_MAX: u8 = 122;

/// Text the receiver emits when its transmit buffer allocation fails
const GARBAGE_MARKER: &str = "txbuf";

/// Why a candidate frame was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// `$` does not occur exactly once
    StartDelimiter {
        /// Number of `$` bytes seen
        count: usize,
    },
    /// Frame is 84 bytes or longer
    TooLong {
        /// Frame length in bytes
        len: usize,
    },
    /// A byte outside printable ASCII (and not CR) was found
    InvalidByte {
        /// The offending byte
        byte: u8,
        /// Its position in the frame
        offset: usize,
    },
    /// Frame contains the receiver's buffer allocation error text
    DeviceGarbage,
    /// Frame does not split into a body and one parseable checksum token
    ChecksumField,
    /// Computed checksum differs from the transmitted one
    ChecksumMismatch {
        /// Checksum carried by the frame
        expected: u32,
        /// Checksum computed over the body
        computed: u8,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartDelimiter { count } => {
                write!(f, "expected exactly one '$', found {}", count)
            }
            Self::TooLong { len } => {
                write!(f, "frame of {} bytes exceeds {} bytes", len, MAX_FRAME_LEN)
            }
            Self::InvalidByte { byte, offset } => {
                write!(f, "invalid byte 0x{:02X} at offset {}", byte, offset)
            }
            Self::DeviceGarbage => write!(f, "receiver txbuf allocation garbage"),
            Self::ChecksumField => write!(f, "malformed checksum field"),
            Self::ChecksumMismatch { expected, computed } => write!(
                f,
                "checksum mismatch: frame says 0x{:02X}, computed 0x{:02X}",
                expected, computed
            ),
        }
    }
}

/// A validated sentence, trimmed and terminated by a single `\n`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence(heapless::String<SENTENCE_CAPACITY>);

impl Sentence {
    /// The sentence text, including the trailing `\n`
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The sentence bytes as written to the consumer
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length in bytes, including the trailing `\n`
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; an accepted sentence holds at least `$` and `\n`
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Address field of the sentence, e.g. `GPGGA`
    pub fn kind(&self) -> &str {
        let text = self.as_str().trim_end();
        let start = text.find('$').map_or(0, |i| i + 1);
        let rest = &text[start..];
        let end = rest
            .find(|c: char| c == ',' || c == CHECKSUM_DELIMITER)
            .unwrap_or(rest.len());
        &rest[..end]
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a byte may appear inside a frame
pub fn is_allowed_byte(byte: u8) -> bool {
    (PRINTABLE_MIN..=PRINTABLE_MAX).contains(&byte) || byte == CR
}

/// XOR of every character of `body` after the first one
///
/// `body` is the text before the first `*`, so for a well-formed sentence
/// this skips the leading `$` and covers everything up to the `*`.
pub fn checksum(body: &str) -> u8 {
    body.bytes().skip(1).fold(0, |acc, b| acc ^ b)
}

/// Delimiter count and length checks, shared with the framer which may see
/// frames longer than it stores
pub(crate) fn check_shape(starts: usize, len: usize) -> Result<(), Rejection> {
    if starts != 1 {
        return Err(Rejection::StartDelimiter { count: starts });
    }
    if len > MAX_FRAME_LEN {
        return Err(Rejection::TooLong { len });
    }
    Ok(())
}

/// Validate one frame (the bytes between two line feeds, LF excluded)
pub fn validate(frame: &[u8]) -> Result<Sentence, Rejection> {
    let starts = frame.iter().filter(|&&b| b == START_DELIMITER).count();
    check_shape(starts, frame.len())?;

    if let Some(offset) = frame.iter().position(|&b| !is_allowed_byte(b)) {
        return Err(Rejection::InvalidByte {
            byte: frame[offset],
            offset,
        });
    }

    // Only ASCII is left at this point
    let text = core::str::from_utf8(frame).map_err(|e| Rejection::InvalidByte {
        byte: frame[e.valid_up_to()],
        offset: e.valid_up_to(),
    })?;

    if text.contains(GARBAGE_MARKER) {
        return Err(Rejection::DeviceGarbage);
    }

    let mut parts = text.splitn(3, CHECKSUM_DELIMITER);
    let (body, token) = match (parts.next(), parts.next(), parts.next()) {
        (Some(body), Some(token), None) => (body, token),
        _ => return Err(Rejection::ChecksumField),
    };

    let token = token.trim();
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    let expected = u32::from_str_radix(digits, 16).map_err(|_| Rejection::ChecksumField)?;
    let computed = checksum(body);
    if expected != u32::from(computed) {
        return Err(Rejection::ChecksumMismatch { expected, computed });
    }

    let mut sentence = heapless::String::new();
    let too_long = |_| Rejection::TooLong { len: frame.len() };
    sentence.push_str(text.trim()).map_err(too_long)?;
    sentence.push('\n').map_err(too_long)?;
    Ok(Sentence(sentence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    #[test]
    fn test_accepts_valid_sentence() {
        let sentence = validate(GGA.as_bytes()).unwrap();
        assert_eq!(sentence.as_str(), format!("{}\n", GGA));
        assert_eq!(sentence.kind(), "GPGGA");
    }

    #[test]
    fn test_accepts_trailing_cr() {
        let frame = b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r";
        let sentence = validate(frame).unwrap();
        assert_eq!(
            sentence.as_str(),
            "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\n"
        );
    }

    #[test]
    fn test_trims_surrounding_spaces() {
        // the leading space is the first character, so '$' is checksummed
        let body = " $GPAAA,1,2";
        let frame = format!("{}*{:02X} \r", body, checksum(body));
        let sentence = validate(frame.as_bytes()).unwrap();
        assert_eq!(sentence.as_str(), format!("{}*{:02X}\n", body.trim(), checksum(body)));
    }

    #[test]
    fn test_checksum_skips_first_character() {
        assert_eq!(checksum("$GPAAA,1,2"), 0x55);
        assert_eq!(checksum("$"), 0);
        assert_eq!(checksum(""), 0);
    }

    #[test]
    fn test_rejects_checksum_mismatch() {
        assert_eq!(
            validate(b"$GPAAA,1,2*00"),
            Err(Rejection::ChecksumMismatch {
                expected: 0,
                computed: 0x55
            })
        );
    }

    #[test]
    fn test_lowercase_checksum_accepted() {
        let frame = b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6a";
        assert!(validate(frame).is_ok());
    }

    #[test]
    fn test_hex_prefixed_checksum_accepted() {
        let sentence = validate(b"$GPAAA,1,2*0x55\r").unwrap();
        assert_eq!(sentence.as_str(), "$GPAAA,1,2*0x55\n");
        assert!(validate(b"$GPAAA,1,2*0X55").is_ok());
        assert_eq!(validate(b"$GPAAA,1,2*0x"), Err(Rejection::ChecksumField));
    }

    #[test]
    fn test_rejects_double_start() {
        assert_eq!(
            validate(b"$GPAAA,1,2*$3F"),
            Err(Rejection::StartDelimiter { count: 2 })
        );
    }

    #[test]
    fn test_rejects_missing_start() {
        assert_eq!(
            validate(b"GPAAA,1,2*2E"),
            Err(Rejection::StartDelimiter { count: 0 })
        );
        assert_eq!(validate(b""), Err(Rejection::StartDelimiter { count: 0 }));
    }

    #[test]
    fn test_rejects_oversized_frame() {
        let body = format!("$GPAAA,{}", "1".repeat(74));
        let frame = format!("{}*{:02X}", body, checksum(&body));
        assert_eq!(frame.len(), 84);
        assert_eq!(
            validate(frame.as_bytes()),
            Err(Rejection::TooLong { len: 84 })
        );

        let body = format!("$GPAAA,{}", "1".repeat(73));
        let frame = format!("{}*{:02X}", body, checksum(&body));
        assert_eq!(frame.len(), 83);
        assert!(validate(frame.as_bytes()).is_ok());
    }

    #[test]
    fn test_rejects_invalid_bytes() {
        assert_eq!(
            validate(b"$GPAAA,1\t,2*2E"),
            Err(Rejection::InvalidByte {
                byte: b'\t',
                offset: 8
            })
        );
        assert_eq!(
            validate(b"$GPAAA,{1,2*2E"),
            Err(Rejection::InvalidByte {
                byte: b'{',
                offset: 7
            })
        );
        assert_eq!(
            validate(&[b'$', b'G', 0xC3, b'*', b'0']),
            Err(Rejection::InvalidByte {
                byte: 0xC3,
                offset: 2
            })
        );
    }

    #[test]
    fn test_rejects_txbuf_garbage() {
        assert_eq!(
            validate(b"$txbuf alloc error*00"),
            Err(Rejection::DeviceGarbage)
        );
    }

    #[test]
    fn test_rejects_bad_checksum_field() {
        assert_eq!(validate(b"$GPAAA,1,2"), Err(Rejection::ChecksumField));
        assert_eq!(validate(b"$GPAAA,1,2*2E*00"), Err(Rejection::ChecksumField));
        assert_eq!(validate(b"$GPAAA,1,2*ZZ"), Err(Rejection::ChecksumField));
        assert_eq!(validate(b"$GPAAA,1,2*"), Err(Rejection::ChecksumField));
    }

    #[test]
    fn test_checks_short_circuit_in_order() {
        // two '$' and too long: delimiter check wins
        let frame = format!("$${}", "A".repeat(90));
        assert_eq!(
            validate(frame.as_bytes()),
            Err(Rejection::StartDelimiter { count: 2 })
        );
        // too long and invalid bytes: length check wins
        let frame = format!("${}", "\t".repeat(90));
        assert_eq!(
            validate(frame.as_bytes()),
            Err(Rejection::TooLong { len: 91 })
        );
    }

    fn body_strategy() -> impl Strategy<Value = String> {
        "[A-Z]{5}(,[A-Z0-9.]{0,8}){0,7}"
    }

    proptest! {
        #[test]
        fn prop_well_formed_frames_are_emitted(body in body_strategy(), cr in any::<bool>()) {
            let body = format!("${}", body);
            let mut frame = format!("{}*{:02X}", body, checksum(&body));
            prop_assume!(frame.len() < 83);
            let expected = format!("{}\n", frame);
            if cr {
                frame.push('\r');
            }
            let sentence = validate(frame.as_bytes()).unwrap();
            prop_assert_eq!(sentence.as_str(), expected.as_str());
        }

        #[test]
        fn prop_corrupted_checksum_is_rejected(body in body_strategy(), delta in 1u8..=255) {
            let body = format!("${}", body);
            let frame = format!("{}*{:02X}", body, checksum(&body) ^ delta);
            prop_assume!(frame.len() < 84);
            let rejected = matches!(
                validate(frame.as_bytes()),
                Err(Rejection::ChecksumMismatch { .. })
            );
            prop_assert!(rejected);
        }

        #[test]
        fn prop_no_start_delimiter_never_validates(
            frame in proptest::collection::vec(any::<u8>().prop_filter("no $", |b| *b != b'$'), 0..120)
        ) {
            prop_assert!(validate(&frame).is_err());
        }
    }
}
