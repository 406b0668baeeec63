use bytes::{BufMut, Bytes, BytesMut};

use crate::codes::{ETX, STX};
use crate::error::{FrameError, Result};

/// Fixed header/trailer overhead excluded from the declared length:
/// STX plus the five envelope bytes.
pub const LENGTH_OVERHEAD: usize = 6;

/// Offset of the two-digit ASCII length field.
pub const LENGTH_OFFSET: usize = 6;

/// Number of envelope bytes between STX and the length field.
pub const ENVELOPE_LEN: usize = 5;

/// Smallest possible frame: STX + envelope + length digits + ETX + LRC.
pub const MIN_FRAME_LEN: usize = 10;

/// Largest text that still fits the two-digit length field.
pub const MAX_TEXT_LEN: usize = 99 - (MIN_FRAME_LEN - LENGTH_OVERHEAD);

/// One complete, checksum-terminated unit of data on the wire.
///
/// Wire format:
/// ```text
/// ┌───────┬──────────────┬─────────────┬─────────┬───────┬───────┐
/// │ STX   │ Envelope     │ Length      │ Text    │ ETX   │ LRC   │
/// │ (1B)  │ (5B)         │ (2B ASCII)  │ (0-93B) │ (1B)  │ (1B)  │
/// └───────┴──────────────┴─────────────┴─────────┴───────┴───────┘
/// ```
///
/// The declared length counts every byte after the envelope (digits, text,
/// ETX and LRC), i.e. total length minus [`LENGTH_OVERHEAD`]. The LRC is the
/// XOR of every byte between STX (exclusive) and the LRC itself (exclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Validate a complete byte sequence as a frame.
    ///
    /// Runs the length check before the checksum check; a frame with a bad
    /// length field is invalid regardless of its LRC.
    pub fn parse(bytes: Bytes) -> Result<Self> {
        let len = bytes.len();
        if len < MIN_FRAME_LEN {
            return Err(FrameError::TooShort {
                len,
                min: MIN_FRAME_LEN,
            });
        }

        let declared = parse_length_field(&bytes)?;
        if declared != len - LENGTH_OVERHEAD {
            return Err(FrameError::LengthMismatch {
                declared,
                actual: len,
            });
        }

        let computed = lrc(&bytes[1..len - 1]);
        let found = bytes[len - 1];
        if computed != found {
            return Err(FrameError::ChecksumMismatch { computed, found });
        }

        Ok(Self { bytes })
    }

    /// Construct a well-formed frame from an envelope and message text.
    pub fn build(envelope: &[u8; ENVELOPE_LEN], text: &[u8]) -> Result<Self> {
        if text.len() > MAX_TEXT_LEN {
            return Err(FrameError::TextTooLong {
                len: text.len(),
                max: MAX_TEXT_LEN,
            });
        }

        let declared = text.len() + (MIN_FRAME_LEN - LENGTH_OVERHEAD);
        let mut buf = BytesMut::with_capacity(MIN_FRAME_LEN + text.len());
        buf.put_u8(STX);
        buf.put_slice(envelope);
        buf.put_u8(b'0' + (declared / 10) as u8);
        buf.put_u8(b'0' + (declared % 10) as u8);
        buf.put_slice(text);
        buf.put_u8(ETX);
        let checksum = lrc(&buf[1..]);
        buf.put_u8(checksum);

        Ok(Self { bytes: buf.freeze() })
    }

    /// The complete frame as transmitted, STX through LRC.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the frame and return its backing bytes.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Total wire size of the frame.
    pub fn wire_size(&self) -> usize {
        self.bytes.len()
    }

    /// The five envelope bytes between STX and the length field.
    pub fn envelope(&self) -> &[u8] {
        &self.bytes[1..1 + ENVELOPE_LEN]
    }

    /// The value of the two-digit length field.
    pub fn declared_len(&self) -> usize {
        let digits = &self.bytes[LENGTH_OFFSET..LENGTH_OFFSET + 2];
        usize::from(digits[0] - b'0') * 10 + usize::from(digits[1] - b'0')
    }

    /// The message text between the length field and ETX.
    pub fn text(&self) -> &[u8] {
        &self.bytes[LENGTH_OFFSET + 2..self.bytes.len() - 2]
    }

    /// The trailing checksum byte.
    pub fn checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }
}

/// Longitudinal redundancy check: XOR-reduce the given bytes, seeded at 0.
///
/// Callers pass a frame's interior — everything after STX up to but not
/// including the checksum byte itself.
pub fn lrc(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, byte| acc ^ byte)
}

fn parse_length_field(bytes: &[u8]) -> Result<usize> {
    let high = bytes[LENGTH_OFFSET];
    let low = bytes[LENGTH_OFFSET + 1];
    if !high.is_ascii_digit() || !low.is_ascii_digit() {
        return Err(FrameError::BadLengthField);
    }
    Ok(usize::from(high - b'0') * 10 + usize::from(low - b'0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE: [u8; ENVELOPE_LEN] = *b"10001";

    #[test]
    fn lrc_known_vector() {
        assert_eq!(lrc(b"abc"), 0x60);
        assert_eq!(lrc(&[]), 0);
        assert_eq!(lrc(&[0xFF, 0xFF]), 0);
    }

    #[test]
    fn build_then_parse_roundtrip() {
        let frame = Frame::build(&ENVELOPE, b"HELLO").unwrap();

        assert_eq!(frame.wire_size(), MIN_FRAME_LEN + 5);
        assert_eq!(frame.as_bytes()[0], STX);
        assert_eq!(frame.envelope(), b"10001");
        assert_eq!(frame.declared_len(), 9);
        assert_eq!(frame.text(), b"HELLO");
        assert_eq!(frame.as_bytes()[frame.wire_size() - 2], ETX);

        let reparsed = Frame::parse(frame.clone().into_bytes()).unwrap();
        assert_eq!(reparsed, frame);
    }

    #[test]
    fn build_writes_two_digit_length_field() {
        let frame = Frame::build(&ENVELOPE, b"AB").unwrap();
        assert_eq!(&frame.as_bytes()[LENGTH_OFFSET..LENGTH_OFFSET + 2], b"06");

        let empty = Frame::build(&ENVELOPE, b"").unwrap();
        assert_eq!(&empty.as_bytes()[LENGTH_OFFSET..LENGTH_OFFSET + 2], b"04");
        assert_eq!(empty.wire_size(), MIN_FRAME_LEN);
        assert!(empty.text().is_empty());
    }

    #[test]
    fn checksum_covers_everything_after_stx() {
        let frame = Frame::build(&ENVELOPE, b"XY").unwrap();
        let bytes = frame.as_bytes();
        assert_eq!(frame.checksum(), lrc(&bytes[1..bytes.len() - 1]));

        // The first byte is outside the checksummed range: corrupting it
        // leaves the frame valid.
        let mut mutated = bytes.to_vec();
        mutated[0] ^= 0xFF;
        Frame::parse(Bytes::from(mutated)).unwrap();
    }

    #[test]
    fn flipping_any_text_byte_fails_the_checksum_check() {
        let frame = Frame::build(&ENVELOPE, b"METER-42").unwrap();
        let text_start = LENGTH_OFFSET + 2;
        let text_end = frame.wire_size() - 2;

        for index in text_start..text_end {
            let mut corrupted = frame.as_bytes().to_vec();
            corrupted[index] ^= 0x01;
            let err = Frame::parse(Bytes::from(corrupted)).unwrap_err();
            assert!(
                matches!(err, FrameError::ChecksumMismatch { .. }),
                "byte {index}: expected checksum mismatch, got {err:?}"
            );
        }
    }

    #[test]
    fn length_mismatch_rejected_even_with_correct_checksum() {
        let frame = Frame::build(&ENVELOPE, b"DATA").unwrap();
        let mut bytes = frame.as_bytes().to_vec();

        // Overstate the declared length, then re-seal the checksum so only
        // the length check can catch the corruption.
        bytes[LENGTH_OFFSET] = b'9';
        bytes[LENGTH_OFFSET + 1] = b'9';
        let last = bytes.len() - 1;
        bytes[last] = lrc(&bytes[1..last]);

        let err = Frame::parse(Bytes::from(bytes)).unwrap_err();
        assert_eq!(
            err,
            FrameError::LengthMismatch {
                declared: 99,
                actual: MIN_FRAME_LEN + 4,
            }
        );
    }

    #[test]
    fn non_digit_length_field_rejected() {
        let frame = Frame::build(&ENVELOPE, b"DATA").unwrap();
        let mut bytes = frame.as_bytes().to_vec();
        bytes[LENGTH_OFFSET] = b'X';
        let last = bytes.len() - 1;
        bytes[last] = lrc(&bytes[1..last]);

        let err = Frame::parse(Bytes::from(bytes)).unwrap_err();
        assert_eq!(err, FrameError::BadLengthField);
    }

    #[test]
    fn undersized_frames_rejected() {
        let err = Frame::parse(Bytes::from_static(&[STX, b'A', ETX, 0x00])).unwrap_err();
        assert!(matches!(err, FrameError::TooShort { len: 4, .. }));
    }

    #[test]
    fn oversized_text_rejected_at_build() {
        let text = vec![b'Z'; MAX_TEXT_LEN + 1];
        let err = Frame::build(&ENVELOPE, &text).unwrap_err();
        assert_eq!(
            err,
            FrameError::TextTooLong {
                len: MAX_TEXT_LEN + 1,
                max: MAX_TEXT_LEN,
            }
        );
    }

    #[test]
    fn max_text_still_builds_and_validates() {
        let text = vec![b'Q'; MAX_TEXT_LEN];
        let frame = Frame::build(&ENVELOPE, &text).unwrap();
        assert_eq!(frame.declared_len(), 99);
        Frame::parse(frame.into_bytes()).unwrap();
    }
}
