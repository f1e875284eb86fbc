/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message types for FIX protocol.
//!
//! This module provides:
//! - [`MsgType`]: Enumeration of the FIX message types the client handles
//! - [`Message`]: Header/body/trailer view of one FIX message

use crate::field::{FieldMap, FieldValue};
use crate::tags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// FIX message types.
///
/// Covers the administrative set plus the order-entry messages exchanged
/// with the venue. Anything else is carried as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MsgType {
    /// Heartbeat (0) - Session level.
    #[default]
    Heartbeat,
    /// Test Request (1) - Session level.
    TestRequest,
    /// Resend Request (2) - Session level.
    ResendRequest,
    /// Reject (3) - Session level.
    Reject,
    /// Sequence Reset (4) - Session level.
    SequenceReset,
    /// Logout (5) - Session level.
    Logout,
    /// Execution Report (8).
    ExecutionReport,
    /// Order Cancel Reject (9).
    OrderCancelReject,
    /// Logon (A) - Session level.
    Logon,
    /// New Order Single (D).
    NewOrderSingle,
    /// Order Cancel Request (F).
    OrderCancelRequest,
    /// Business Message Reject (j).
    BusinessMessageReject,
    /// Custom or unknown message type.
    Custom(String),
}

impl std::str::FromStr for MsgType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "0" => Self::Heartbeat,
            "1" => Self::TestRequest,
            "2" => Self::ResendRequest,
            "3" => Self::Reject,
            "4" => Self::SequenceReset,
            "5" => Self::Logout,
            "8" => Self::ExecutionReport,
            "9" => Self::OrderCancelReject,
            "A" => Self::Logon,
            "D" => Self::NewOrderSingle,
            "F" => Self::OrderCancelRequest,
            "j" => Self::BusinessMessageReject,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl MsgType {
    /// Returns the wire representation of this message type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Heartbeat => "0",
            Self::TestRequest => "1",
            Self::ResendRequest => "2",
            Self::Reject => "3",
            Self::SequenceReset => "4",
            Self::Logout => "5",
            Self::ExecutionReport => "8",
            Self::OrderCancelReject => "9",
            Self::Logon => "A",
            Self::NewOrderSingle => "D",
            Self::OrderCancelRequest => "F",
            Self::BusinessMessageReject => "j",
            Self::Custom(s) => s.as_str(),
        }
    }

    /// Returns true if this is an administrative message.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::TestRequest
                | Self::ResendRequest
                | Self::Reject
                | Self::SequenceReset
                | Self::Logout
                | Self::Logon
        )
    }

    /// Returns true if this is an application message.
    #[must_use]
    pub fn is_app(&self) -> bool {
        !self.is_admin()
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<MsgType> for FieldValue {
    fn from(value: MsgType) -> Self {
        Self::String(value.as_str().to_string())
    }
}

/// One FIX message, split into header, body and trailer regions.
///
/// BodyLength (9) and CheckSum (10) are not stored: the encoder derives them
/// from the serialized bytes and the decoder validates and drops them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Standard header fields, BeginString and MsgType first.
    pub header: FieldMap,
    /// Message body fields.
    pub body: FieldMap,
    /// Trailer fields other than CheckSum.
    pub trailer: FieldMap,
}

impl Message {
    /// Creates a message with BeginString and MsgType set.
    ///
    /// # Arguments
    /// * `begin_string` - The FIX version (e.g., "FIX.4.2")
    /// * `msg_type` - The message type
    #[must_use]
    pub fn new(begin_string: &str, msg_type: MsgType) -> Self {
        let mut header = FieldMap::new();
        header.set(tags::BEGIN_STRING, begin_string);
        header.set(tags::MSG_TYPE, msg_type);
        Self {
            header,
            body: FieldMap::new(),
            trailer: FieldMap::new(),
        }
    }

    /// Returns the message type, or `None` if tag 35 is absent.
    #[must_use]
    pub fn msg_type(&self) -> Option<MsgType> {
        self.header
            .get_str(tags::MSG_TYPE)
            .and_then(|s| s.parse().ok())
    }

    /// Returns the BeginString value.
    #[must_use]
    pub fn begin_string(&self) -> Option<&str> {
        self.header.get_str(tags::BEGIN_STRING)
    }

    /// Returns the MsgSeqNum, or `None` if absent or not numeric.
    #[must_use]
    pub fn seq_num(&self) -> Option<u64> {
        self.header
            .get(tags::MSG_SEQ_NUM)
            .and_then(|f| f.as_u64().ok())
    }

    /// Returns true if PossDupFlag is set.
    #[must_use]
    pub fn is_poss_dup(&self) -> bool {
        self.header
            .get(tags::POSS_DUP_FLAG)
            .and_then(|f| f.as_bool().ok())
            .unwrap_or(false)
    }

    /// Sets a field in the region its tag belongs to.
    pub fn set(&mut self, tag: u32, value: impl Into<FieldValue>) {
        self.region_mut(tag).set(tag, value);
    }

    /// Gets a field value from whichever region holds the tag.
    #[must_use]
    pub fn get_str(&self, tag: u32) -> Option<&str> {
        if tags::is_header(tag) {
            self.header.get_str(tag)
        } else if tags::is_trailer(tag) {
            self.trailer.get_str(tag)
        } else {
            self.body.get_str(tag)
        }
    }

    /// Returns the region a tag belongs to.
    pub fn region_mut(&mut self, tag: u32) -> &mut FieldMap {
        if tags::is_header(tag) {
            &mut self.header
        } else if tags::is_trailer(tag) {
            &mut self.trailer
        } else {
            &mut self.body
        }
    }
}

/// Renders `tag=value|...` with credential-bearing values masked.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .header
            .iter()
            .chain(self.body.iter())
            .chain(self.trailer.iter());
        for field in fields {
            if tags::is_sensitive(field.tag) {
                write!(f, "{}=***|", field.tag)?;
            } else {
                write!(f, "{}={}|", field.tag, field.value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_type_round_trip() {
        for s in ["0", "1", "2", "3", "4", "5", "8", "9", "A", "D", "F", "j"] {
            let parsed: MsgType = s.parse().unwrap();
            assert_eq!(parsed.as_str(), s);
        }
    }

    #[test]
    fn test_msg_type_is_admin() {
        assert!(MsgType::Heartbeat.is_admin());
        assert!(MsgType::Logon.is_admin());
        assert!(MsgType::SequenceReset.is_admin());
        assert!(!MsgType::NewOrderSingle.is_admin());
        assert!(MsgType::ExecutionReport.is_app());
    }

    #[test]
    fn test_msg_type_custom() {
        let custom: MsgType = "XX".parse().unwrap();
        assert!(matches!(custom, MsgType::Custom(_)));
        assert_eq!(custom.as_str(), "XX");
    }

    #[test]
    fn test_message_new_places_header_fields_first() {
        let msg = Message::new("FIX.4.2", MsgType::NewOrderSingle);
        let tags: Vec<u32> = msg.header.iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec![8, 35]);
        assert_eq!(msg.msg_type(), Some(MsgType::NewOrderSingle));
        assert_eq!(msg.begin_string(), Some("FIX.4.2"));
    }

    #[test]
    fn test_message_set_routes_by_region() {
        let mut msg = Message::new("FIX.4.2", MsgType::Heartbeat);
        msg.set(tags::MSG_SEQ_NUM, 7u64);
        msg.set(tags::TEST_REQ_ID, "T1");
        msg.set(tags::SIGNATURE, "abc");

        assert_eq!(msg.seq_num(), Some(7));
        assert_eq!(msg.body.get_str(tags::TEST_REQ_ID), Some("T1"));
        assert_eq!(msg.trailer.get_str(tags::SIGNATURE), Some("abc"));
        assert_eq!(msg.get_str(tags::TEST_REQ_ID), Some("T1"));
    }

    #[test]
    fn test_message_display_masks_credentials() {
        let mut msg = Message::new("FIX.4.2", MsgType::Logon);
        msg.set(tags::PASSWORD, "hunter2");
        msg.set(tags::RAW_DATA, "c2lnbmF0dXJl");
        msg.set(tags::ACCESS_KEY, "key");
        msg.set(tags::HEART_BT_INT, 30u64);

        let rendered = msg.to_string();
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("c2lnbmF0dXJl"));
        assert!(rendered.contains("554=***|"));
        assert!(rendered.contains("108=30|"));
    }

    #[test]
    fn test_poss_dup_flag() {
        let mut msg = Message::new("FIX.4.2", MsgType::ExecutionReport);
        assert!(!msg.is_poss_dup());
        msg.set(tags::POSS_DUP_FLAG, true);
        assert!(msg.is_poss_dup());
    }
}
