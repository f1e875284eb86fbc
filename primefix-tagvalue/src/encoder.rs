/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX message encoder.
//!
//! This module turns a [`Message`] into its tag=value wire form. BodyLength
//! and CheckSum are computed here and never taken from the message.

use crate::checksum::{calculate_checksum, format_checksum};
use bytes::{BufMut, Bytes, BytesMut};
use primefix_core::error::EncodeError;
use primefix_core::message::Message;
use primefix_core::tags;

/// SOH (Start of Header) delimiter used in FIX messages.
pub const SOH: u8 = 0x01;

/// Low-level FIX frame builder.
///
/// Fields are appended to the body in call order; [`Encoder::finish`]
/// prepends BeginString and BodyLength and appends the CheckSum.
#[derive(Debug)]
pub struct Encoder {
    /// Buffer for the message body (between BodyLength and Checksum).
    body: BytesMut,
    /// The BeginString value (e.g., "FIX.4.2").
    begin_string: String,
}

impl Encoder {
    /// Creates a new encoder with the specified BeginString.
    #[must_use]
    pub fn new(begin_string: impl Into<String>) -> Self {
        Self {
            body: BytesMut::with_capacity(256),
            begin_string: begin_string.into(),
        }
    }

    /// Appends a field with a string value.
    #[inline]
    pub fn put_str(&mut self, tag: u32, value: &str) {
        self.put_raw(tag, value.as_bytes());
    }

    /// Appends a field with an unsigned integer value.
    #[inline]
    pub fn put_uint(&mut self, tag: u32, value: u64) {
        let mut buf = itoa::Buffer::new();
        let s = buf.format(value);
        self.put_raw(tag, s.as_bytes());
    }

    /// Appends a field with raw bytes.
    #[inline]
    pub fn put_raw(&mut self, tag: u32, value: &[u8]) {
        let mut tag_buf = itoa::Buffer::new();
        let tag_str = tag_buf.format(tag);

        self.body.put_slice(tag_str.as_bytes());
        self.body.put_u8(b'=');
        self.body.put_slice(value);
        self.body.put_u8(SOH);
    }

    /// Finalizes the message and returns the complete encoded bytes.
    #[must_use]
    pub fn finish(self) -> Bytes {
        let body_len = self.body.len();
        let mut len_buf = itoa::Buffer::new();
        let len_str = len_buf.format(body_len);

        let mut message =
            BytesMut::with_capacity(self.begin_string.len() + len_str.len() + body_len + 16);
        message.put_slice(b"8=");
        message.put_slice(self.begin_string.as_bytes());
        message.put_u8(SOH);
        message.put_slice(b"9=");
        message.put_slice(len_str.as_bytes());
        message.put_u8(SOH);
        message.put_slice(&self.body);

        let checksum = format_checksum(calculate_checksum(&message));
        message.put_slice(b"10=");
        message.put_slice(&checksum);
        message.put_u8(SOH);

        message.freeze()
    }

    /// Returns the current body length.
    #[inline]
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}

/// Encodes a message into a complete FIX frame.
///
/// MsgType is always written first in the body; the remaining header,
/// body and trailer fields follow in their stored order. Any BodyLength or
/// CheckSum present in the message is ignored.
///
/// # Errors
/// Returns `EncodeError::MissingRequiredField` if BeginString or MsgType is
/// absent, and `EncodeError::InvalidFieldValue` if a value contains SOH or a
/// tag is zero.
pub fn encode(message: &Message) -> Result<Bytes, EncodeError> {
    let begin_string =
        message
            .header
            .get_str(tags::BEGIN_STRING)
            .ok_or(EncodeError::MissingRequiredField {
                tag: tags::BEGIN_STRING,
            })?;
    let msg_type = message
        .header
        .get_str(tags::MSG_TYPE)
        .ok_or(EncodeError::MissingRequiredField {
            tag: tags::MSG_TYPE,
        })?;

    let mut encoder = Encoder::new(begin_string);
    encoder.put_str(tags::MSG_TYPE, msg_type);

    let rest = message
        .header
        .iter()
        .chain(message.body.iter())
        .chain(message.trailer.iter())
        .filter(|f| {
            !matches!(
                f.tag,
                tags::BEGIN_STRING | tags::BODY_LENGTH | tags::MSG_TYPE | tags::CHECK_SUM
            )
        });

    for field in rest {
        if field.tag == 0 {
            return Err(EncodeError::InvalidFieldValue {
                tag: 0,
                reason: "tag numbers start at 1".to_string(),
            });
        }
        if field.value.as_bytes().contains(&SOH) {
            return Err(EncodeError::InvalidFieldValue {
                tag: field.tag,
                reason: "value contains the SOH delimiter".to_string(),
            });
        }
        encoder.put_str(field.tag, &field.value);
    }

    Ok(encoder.finish())
}
