/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX message decoder.
//!
//! Parses one complete tag=value frame into a [`Message`], validating
//! BeginString, BodyLength and CheckSum. Nothing outside the returned value
//! is touched, so a failed decode has no side effects.

use crate::checksum::{calculate_checksum, parse_checksum};
use memchr::memchr;
use primefix_core::error::DecodeError;
use primefix_core::field::Field;
use primefix_core::message::Message;
use primefix_core::tags;

/// SOH (Start of Header) delimiter used in FIX messages.
pub const SOH: u8 = 0x01;

/// Equals sign delimiter between tag and value.
pub const EQUALS: u8 = b'=';

/// FIX message decoder over a single frame.
#[derive(Debug)]
pub struct Decoder<'a> {
    /// Input buffer.
    input: &'a [u8],
    /// Current position in the buffer.
    offset: usize,
    /// Whether tags outside the known catalog are rejected.
    strict: bool,
}

impl<'a> Decoder<'a> {
    /// Creates a new decoder for the given input buffer.
    #[inline]
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            strict: false,
        }
    }

    /// Enables or disables strict mode.
    ///
    /// In strict mode a tag outside the known catalog fails the decode with
    /// `DecodeError::UnknownTag`; otherwise it is kept in the body.
    #[inline]
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Decodes a complete FIX message from the buffer.
    ///
    /// # Errors
    /// - `DecodeError::Incomplete` if the buffer ends before the checksum
    /// - `DecodeError::Malformed` on grammar faults, a BodyLength that does not
    ///   match the body, or bytes after the checksum field
    /// - `DecodeError::ChecksumInvalid` if the checksum does not match
    /// - `DecodeError::UnknownTag` in strict mode
    pub fn decode(&mut self) -> Result<Message, DecodeError> {
        let start = self.offset;

        let (tag, begin_string) = self.next_field()?.ok_or(DecodeError::Incomplete)?;
        if tag != tags::BEGIN_STRING {
            return Err(DecodeError::malformed("first field must be BeginString (8)"));
        }

        let (tag, body_length) = self.next_field()?.ok_or(DecodeError::Incomplete)?;
        if tag != tags::BODY_LENGTH {
            return Err(DecodeError::malformed("second field must be BodyLength (9)"));
        }
        let declared_length: usize = body_length
            .parse()
            .map_err(|_| DecodeError::malformed(format!("invalid body length '{body_length}'")))?;

        let body_start = self.offset;

        let (tag, msg_type) = self.next_field()?.ok_or(DecodeError::Incomplete)?;
        if tag != tags::MSG_TYPE {
            return Err(DecodeError::malformed("third field must be MsgType (35)"));
        }

        let mut message = Message::default();
        message
            .header
            .push(Field::new(tags::BEGIN_STRING, begin_string));
        message.header.push(Field::new(tags::MSG_TYPE, msg_type));

        let (checksum_start, declared_checksum) = loop {
            let field_start = self.offset;
            let (tag, value) = self.next_field()?.ok_or(DecodeError::Incomplete)?;
            match tag {
                tags::CHECK_SUM => break (field_start, value),
                tags::BEGIN_STRING | tags::BODY_LENGTH | tags::MSG_TYPE => {
                    return Err(DecodeError::malformed(format!(
                        "tag {tag} repeated inside the message"
                    )));
                }
                _ => message.region_mut(tag).push(Field::new(tag, value)),
            }
        };

        let actual_length = checksum_start - body_start;
        if actual_length != declared_length {
            return Err(DecodeError::malformed(format!(
                "body length mismatch: declared {declared_length}, actual {actual_length}"
            )));
        }

        // A checksum that is not three digits in 000..=255 can never match,
        // so it is reported as a mismatch against a declared value of 0.
        let calculated = calculate_checksum(&self.input[start..checksum_start]);
        match parse_checksum(declared_checksum.as_bytes()) {
            Some(declared) if declared == calculated => {}
            declared => {
                return Err(DecodeError::ChecksumInvalid {
                    calculated,
                    declared: declared.unwrap_or(0),
                });
            }
        }

        if self.offset != self.input.len() {
            return Err(DecodeError::malformed(format!(
                "{} bytes after the checksum field",
                self.input.len() - self.offset
            )));
        }

        if self.strict {
            let unknown = message
                .header
                .iter()
                .chain(message.body.iter())
                .chain(message.trailer.iter())
                .find(|f| !tags::is_known(f.tag));
            if let Some(field) = unknown {
                return Err(DecodeError::UnknownTag { tag: field.tag });
            }
        }

        Ok(message)
    }

    /// Parses the next field from the buffer.
    ///
    /// # Returns
    /// `Ok(None)` when the buffer ends before a full field.
    ///
    /// # Errors
    /// Returns `DecodeError::Malformed` if the tag is not a positive integer or
    /// the value is empty, and `DecodeError::InvalidUtf8` for non UTF-8 values.
    pub fn next_field(&mut self) -> Result<Option<(u32, &'a str)>, DecodeError> {
        let remaining = &self.input[self.offset.min(self.input.len())..];

        let Some(eq_pos) = memchr(EQUALS, remaining) else {
            return Ok(None);
        };
        let tag_bytes = &remaining[..eq_pos];
        if memchr(SOH, tag_bytes).is_some() {
            return Err(DecodeError::malformed("field without '=' separator"));
        }
        let tag = parse_tag(tag_bytes).ok_or_else(|| {
            DecodeError::malformed(format!(
                "invalid tag '{}'",
                String::from_utf8_lossy(tag_bytes)
            ))
        })?;

        let value_start = eq_pos + 1;
        let Some(soh_pos) = memchr(SOH, &remaining[value_start..]) else {
            return Ok(None);
        };
        if soh_pos == 0 {
            return Err(DecodeError::malformed(format!("empty value for tag {tag}")));
        }
        let value = std::str::from_utf8(&remaining[value_start..value_start + soh_pos])?;

        self.offset += value_start + soh_pos + 1;
        Ok(Some((tag, value)))
    }

    /// Returns the current offset in the buffer.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

/// Decodes one complete frame in lenient mode.
///
/// # Errors
/// See [`Decoder::decode`].
pub fn decode(input: &[u8]) -> Result<Message, DecodeError> {
    Decoder::new(input).decode()
}

/// Parses a tag number from ASCII bytes.
///
/// # Returns
/// The parsed tag number, or `None` if empty, non-numeric, zero or overflowing.
#[inline]
fn parse_tag(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }

    let mut result: u32 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        result = result.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
    }

    (result > 0).then_some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;
    use primefix_core::message::MsgType;

    fn frame(body: &str) -> Vec<u8> {
        let head = format!("8=FIX.4.2\x019={}\x01{}", body.len(), body);
        let checksum = calculate_checksum(head.as_bytes());
        format!("{head}10={checksum:03}\x01").into_bytes()
    }

    fn sample() -> Message {
        let mut msg = Message::new("FIX.4.2", MsgType::NewOrderSingle);
        msg.set(tags::SENDER_COMP_ID, "CLIENT");
        msg.set(tags::TARGET_COMP_ID, "COIN");
        msg.set(tags::MSG_SEQ_NUM, 2u64);
        msg.set(tags::SENDING_TIME, "20250101-12:00:00.000");
        msg.set(tags::ACCOUNT, "portfolio-1");
        msg.set(tags::CL_ORD_ID, "1700000000000000001");
        msg.set(tags::SYMBOL, "ETH-USD");
        msg.set(tags::SIDE, '1');
        msg.set(tags::ORDER_QTY, "0.0015");
        msg
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_tag(b"8"), Some(8));
        assert_eq!(parse_tag(b"9407"), Some(9407));
        assert_eq!(parse_tag(b""), None);
        assert_eq!(parse_tag(b"0"), None);
        assert_eq!(parse_tag(b"12a"), None);
        assert_eq!(parse_tag(b"99999999999"), None);
    }

    #[test]
    fn test_round_trip_preserves_regions_and_order() {
        let mut msg = sample();
        msg.trailer.set(tags::SIGNATURE, "sig");

        let decoded = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_heartbeat_frame() {
        let bytes = frame("35=0\x0149=COIN\x0156=CLIENT\x0134=5\x01");
        let msg = decode(&bytes).unwrap();

        assert_eq!(msg.msg_type(), Some(MsgType::Heartbeat));
        assert_eq!(msg.seq_num(), Some(5));
        assert_eq!(msg.header.get_str(tags::SENDER_COMP_ID), Some("COIN"));
        assert!(msg.body.is_empty());
    }

    #[test]
    fn test_corrupted_checksum_is_rejected() {
        let mut bytes = encode(&sample()).unwrap().to_vec();
        let digit = bytes.len() - 2;
        bytes[digit] = if bytes[digit] == b'9' { b'0' } else { bytes[digit] + 1 };

        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::ChecksumInvalid { .. })
        ));
    }

    #[test]
    fn test_unparsable_checksum_is_rejected() {
        let encoded = encode(&sample()).unwrap().to_vec();
        let last = encoded.len() - 2;
        let first = encoded.len() - 4;

        // Non-digit, out of range (9xx > 255), and a truncated value.
        for (pos, byte) in [(last, b'x'), (first, b'9'), (last, SOH)] {
            let mut bytes = encoded.clone();
            bytes[pos] = byte;
            assert!(
                matches!(decode(&bytes), Err(DecodeError::ChecksumInvalid { .. })),
                "byte {byte:#04x} at {pos} not reported as a checksum mismatch"
            );
        }
    }

    #[test]
    fn test_corrupted_body_byte_fails_checksum() {
        let mut bytes = encode(&sample()).unwrap().to_vec();
        let pos = bytes.windows(7).position(|w| w == b"ETH-USD").unwrap();
        bytes[pos] = b'B';

        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::ChecksumInvalid { .. })
        ));
    }

    #[test]
    fn test_body_length_mismatch_is_malformed() {
        let good = frame("35=0\x0134=1\x01");
        let text = String::from_utf8(good).unwrap().replace("9=10", "9=11");
        assert!(matches!(
            decode(text.as_bytes()),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_missing_begin_string_is_malformed() {
        assert!(matches!(
            decode(b"9=5\x0135=0\x0110=000\x01"),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_truncated_frame_is_incomplete() {
        let bytes = frame("35=0\x0134=1\x01");
        assert_eq!(
            decode(&bytes[..bytes.len() - 5]),
            Err(DecodeError::Incomplete)
        );
    }

    #[test]
    fn test_trailing_bytes_are_malformed() {
        let mut bytes = frame("35=0\x0134=1\x01");
        bytes.extend_from_slice(b"garbage");
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_unknown_tag_kept_in_lenient_mode() {
        let bytes = frame("35=8\x0134=3\x015001=custom\x0137=OID\x01");
        let msg = decode(&bytes).unwrap();
        assert_eq!(msg.body.get_str(5001), Some("custom"));
        let tags: Vec<u32> = msg.body.iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec![5001, 37]);
    }

    #[test]
    fn test_unknown_tag_rejected_in_strict_mode() {
        let bytes = frame("35=8\x0134=3\x015001=custom\x01");
        let result = Decoder::new(&bytes).strict(true).decode();
        assert_eq!(result, Err(DecodeError::UnknownTag { tag: 5001 }));
    }

    #[test]
    fn test_empty_value_is_malformed() {
        let bytes = frame("35=0\x0158=\x01");
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_next_field() {
        let mut decoder = Decoder::new(b"8=FIX.4.2\x019=5\x01");
        assert_eq!(decoder.next_field().unwrap(), Some((8, "FIX.4.2")));
        assert_eq!(decoder.next_field().unwrap(), Some((9, "5")));
        assert_eq!(decoder.next_field().unwrap(), None);
        assert_eq!(decoder.offset(), 14);
    }
}
