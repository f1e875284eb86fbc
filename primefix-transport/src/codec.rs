/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tokio codec for FIX message framing.
//!
//! Frame boundaries come from BeginString and BodyLength. Each complete
//! frame is decoded into a [`Message`]; a frame that fails validation is
//! consumed and yielded as `Err(DecodeError)` so the stream keeps going.
//! Only faults that leave the byte stream unusable end it with a
//! [`CodecError`].

use bytes::{BufMut, Bytes, BytesMut};
use memchr::memchr;
use primefix_core::error::DecodeError;
use primefix_core::message::Message;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Errors that end a framed stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Invalid BeginString field.
    #[error("invalid begin string: message must start with 8=")]
    InvalidBeginString,

    /// Missing BodyLength field.
    #[error("missing body length field (tag 9)")]
    MissingBodyLength,

    /// Invalid BodyLength value.
    #[error("invalid body length value")]
    InvalidBodyLength,

    /// Message exceeds maximum size.
    #[error("message too large: {size} bytes exceeds maximum {max_size}")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max_size: usize,
    },

    /// I/O error.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// SOH delimiter.
const SOH: u8 = 0x01;

/// Length of the `10=NNN<SOH>` trailer.
const CHECKSUM_FIELD_LEN: usize = 7;

/// Default maximum frame size.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Tokio codec for FIX message framing.
#[derive(Debug, Clone)]
pub struct FixCodec {
    /// Maximum message size in bytes.
    max_message_size: usize,
    /// Whether unknown tags fail the decode.
    strict: bool,
}

impl FixCodec {
    /// Creates a new codec with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            strict: false,
        }
    }

    /// Sets the maximum message size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Sets whether tags outside the known catalog are rejected.
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Returns the length of the next complete frame, if buffered.
    fn frame_length(&self, src: &BytesMut) -> Result<Option<usize>, CodecError> {
        if src.len() < 2 {
            return Ok(None);
        }
        if &src[0..2] != b"8=" {
            return Err(CodecError::InvalidBeginString);
        }

        let Some(first_soh) = memchr(SOH, src) else {
            return self.pending(src);
        };

        let body_len_start = first_soh + 1;
        if src.len() < body_len_start + 2 {
            return Ok(None);
        }
        if &src[body_len_start..body_len_start + 2] != b"9=" {
            return Err(CodecError::MissingBodyLength);
        }

        let Some(pos) = memchr(SOH, &src[body_len_start..]) else {
            return self.pending(src);
        };
        let body_len_soh = body_len_start + pos;

        let body_length: usize = std::str::from_utf8(&src[body_len_start + 2..body_len_soh])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(CodecError::InvalidBodyLength)?;

        // BodyLength comes from the peer; cap it before any arithmetic.
        if body_length > self.max_message_size {
            return Err(CodecError::MessageTooLarge {
                size: body_length,
                max_size: self.max_message_size,
            });
        }
        let total_length = body_len_soh + 1 + body_length + CHECKSUM_FIELD_LEN;
        if total_length > self.max_message_size {
            return Err(CodecError::MessageTooLarge {
                size: total_length,
                max_size: self.max_message_size,
            });
        }

        Ok((src.len() >= total_length).then_some(total_length))
    }

    /// Waits for more data unless the unterminated prefix is already too big.
    fn pending(&self, src: &BytesMut) -> Result<Option<usize>, CodecError> {
        if src.len() > self.max_message_size {
            return Err(CodecError::MessageTooLarge {
                size: src.len(),
                max_size: self.max_message_size,
            });
        }
        Ok(None)
    }
}

impl Default for FixCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FixCodec {
    type Item = Result<Message, DecodeError>;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(total_length) = self.frame_length(src)? else {
            return Ok(None);
        };

        let frame = src.split_to(total_length);
        let decoded = primefix_tagvalue::Decoder::new(&frame)
            .strict(self.strict)
            .decode();
        Ok(Some(decoded))
    }
}

impl Encoder<Bytes> for FixCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        dst.put_slice(&item);
        Ok(())
    }
}

impl Encoder<&[u8]> for FixCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        dst.put_slice(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primefix_core::message::MsgType;
    use primefix_tagvalue::calculate_checksum;

    fn make_fix_message(body: &str) -> Vec<u8> {
        let header = format!("8=FIX.4.2\x019={}\x01", body.len());
        let without_checksum = format!("{}{}", header, body);
        let checksum = calculate_checksum(without_checksum.as_bytes());
        format!("{}10={:03}\x01", without_checksum, checksum).into_bytes()
    }

    #[test]
    fn test_codec_decode_complete_message() {
        let mut codec = FixCodec::new();
        let msg = make_fix_message("35=0\x0134=2\x01");
        let mut buf = BytesMut::from(&msg[..]);

        let message = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(message.msg_type(), Some(MsgType::Heartbeat));
        assert_eq!(message.seq_num(), Some(2));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_decode_incomplete() {
        let mut codec = FixCodec::new();
        let msg = make_fix_message("35=0\x01");
        let mut buf = BytesMut::from(&msg[..msg.len() - 5]);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), msg.len() - 5);
    }

    #[test]
    fn test_codec_decode_two_frames_in_one_buffer() {
        let mut codec = FixCodec::new();
        let mut bytes = make_fix_message("35=0\x0134=1\x01");
        bytes.extend(make_fix_message("35=1\x0134=2\x01112=T1\x01"));
        let mut buf = BytesMut::from(&bytes[..]);

        let first = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        let second = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(first.seq_num(), Some(1));
        assert_eq!(second.msg_type(), Some(MsgType::TestRequest));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_checksum_mismatch_drops_only_that_frame() {
        let mut codec = FixCodec::new();
        let mut bytes = b"8=FIX.4.2\x019=5\x0135=0\x0110=000\x01".to_vec();
        bytes.extend(make_fix_message("35=0\x0134=9\x01"));
        let mut buf = BytesMut::from(&bytes[..]);

        let bad = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(bad, Err(DecodeError::ChecksumInvalid { .. })));

        let good = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(good.seq_num(), Some(9));
    }

    #[test]
    fn test_codec_decode_invalid_begin_string() {
        let mut codec = FixCodec::new();
        let mut buf = BytesMut::from(&b"9=FIX.4.2\x019=5\x0135=0\x0110=000\x01"[..]);

        assert_eq!(codec.decode(&mut buf), Err(CodecError::InvalidBeginString));
    }

    #[test]
    fn test_codec_decode_invalid_body_length() {
        let mut codec = FixCodec::new();
        let mut buf = BytesMut::from(&b"8=FIX.4.2\x019=abc\x0135=0\x01"[..]);

        assert_eq!(codec.decode(&mut buf), Err(CodecError::InvalidBodyLength));
    }

    #[test]
    fn test_codec_decode_too_large() {
        let mut codec = FixCodec::new().with_max_message_size(32);
        let msg = make_fix_message("35=0\x0158=a rather long text field\x01");
        let mut buf = BytesMut::from(&msg[..]);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::MessageTooLarge { max_size: 32, .. })
        ));
    }

    #[test]
    fn test_codec_decode_huge_body_length() {
        let mut codec = FixCodec::new();
        let mut buf = BytesMut::from(&b"8=FIX.4.2\x019=18446744073709551615\x0135=0\x01"[..]);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::MessageTooLarge {
                max_size: DEFAULT_MAX_MESSAGE_SIZE,
                ..
            })
        ));
    }

    #[test]
    fn test_codec_strict_mode() {
        let mut codec = FixCodec::new().with_strict(true);
        let msg = make_fix_message("35=0\x016000=x\x01");
        let mut buf = BytesMut::from(&msg[..]);

        let result = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(result, Err(DecodeError::UnknownTag { tag: 6000 }));
    }

    #[test]
    fn test_codec_encode() {
        let mut codec = FixCodec::new();
        let msg = Bytes::from_static(b"8=FIX.4.2\x019=5\x0135=0\x0110=123\x01");
        let mut dst = BytesMut::new();

        codec.encode(msg.clone(), &mut dst).unwrap();
        assert_eq!(&dst[..], &msg[..]);
    }
}
