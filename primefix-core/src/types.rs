/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Core types for FIX protocol operations.
//!
//! This module provides fundamental types used throughout the client:
//! - [`SeqNum`]: Sequence number wrapper
//! - [`Timestamp`]: FIX-formatted UTC timestamp
//! - [`CompId`]: Component identifier (SenderCompID, TargetCompID)
//! - [`Side`], [`OrdType`], [`TimeInForce`], [`ExecType`], [`OrdStatus`]:
//!   single-character enumerations used by order entry

use arrayvec::ArrayString;
use chrono::{DateTime, NaiveDateTime, Utc};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length for CompID strings in bytes.
pub const COMP_ID_MAX_LEN: usize = 32;

/// FIX message sequence number.
///
/// Sequence numbers start at 1 and increment for each message sent within a
/// session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct SeqNum(u64);

impl SeqNum {
    /// Creates a new sequence number.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw sequence number value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the next sequence number.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Checks if this sequence number is valid (>= 1).
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 1
    }
}

impl Default for SeqNum {
    fn default() -> Self {
        Self(1)
    }
}

impl From<u64> for SeqNum {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<SeqNum> for u64 {
    fn from(seq: SeqNum) -> Self {
        seq.0
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// FIX protocol timestamp with nanosecond precision.
///
/// Rendered on the wire as `YYYYMMDD-HH:MM:SS.sss` (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Nanoseconds since Unix epoch (1970-01-01 00:00:00 UTC).
    nanos_since_epoch: u64,
}

impl Timestamp {
    /// Creates a timestamp from nanoseconds since Unix epoch.
    #[inline]
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self {
            nanos_since_epoch: nanos,
        }
    }

    /// Creates a timestamp from milliseconds since Unix epoch.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            nanos_since_epoch: millis * 1_000_000,
        }
    }

    /// Returns the current UTC timestamp.
    #[inline]
    #[must_use]
    pub fn now() -> Self {
        Utc::now().into()
    }

    /// Returns nanoseconds since Unix epoch.
    #[inline]
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.nanos_since_epoch
    }

    /// Returns milliseconds since Unix epoch.
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.nanos_since_epoch / 1_000_000
    }

    /// Converts to a chrono `DateTime<Utc>`.
    #[must_use]
    pub fn to_datetime(self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.nanos_since_epoch as i64)
    }

    /// Formats the timestamp in FIX format with millisecond precision.
    ///
    /// Format: `YYYYMMDD-HH:MM:SS.sss`
    #[must_use]
    pub fn format_millis(self) -> ArrayString<21> {
        let dt = self.to_datetime();
        let mut buf = ArrayString::new();
        let _ = std::fmt::write(
            &mut buf,
            format_args!("{}", dt.format("%Y%m%d-%H:%M:%S%.3f")),
        );
        buf
    }

    /// Parses a FIX UTCTimestamp, with or without fractional seconds.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(s, "%Y%m%d-%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc().into())
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self {
            nanos_since_epoch: dt.timestamp_nanos_opt().unwrap_or(0) as u64,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_millis())
    }
}

/// Component identifier for FIX sessions.
///
/// Used for SenderCompID (tag 49) and TargetCompID (tag 56).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct CompId(ArrayString<COMP_ID_MAX_LEN>);

impl CompId {
    /// Creates a new CompId from a string slice.
    ///
    /// # Returns
    /// `Some(CompId)` if the string is non-empty and fits within the maximum
    /// length, `None` otherwise.
    #[must_use]
    pub fn new(s: &str) -> Option<Self> {
        if s.is_empty() {
            return None;
        }
        ArrayString::from(s).ok().map(Self)
    }

    /// Returns the CompId as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for CompId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CompId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declares `from_char`/`as_char` for a `#[repr(u8)]` enum whose
/// discriminants are the FIX character codes.
macro_rules! fix_char_enum {
    ($ty:ident) => {
        impl $ty {
            /// Creates the value from its FIX character code.
            #[must_use]
            pub fn from_char(c: char) -> Option<Self> {
                if c.is_ascii() {
                    <Self as FromPrimitive>::from_u8(c as u8)
                } else {
                    None
                }
            }

            /// Returns the FIX character code.
            #[must_use]
            pub const fn as_char(self) -> char {
                self as u8 as char
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_char())
            }
        }

        impl From<$ty> for crate::field::FieldValue {
            fn from(value: $ty) -> Self {
                Self::Char(value.as_char())
            }
        }
    };
}

/// Order side enumeration (tag 54).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order.
    Buy = b'1',
    /// Sell order.
    Sell = b'2',
}

fix_char_enum!(Side);

/// Order type enumeration (tag 40).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrdType {
    /// Market order.
    Market = b'1',
    /// Limit order.
    Limit = b'2',
}

fix_char_enum!(OrdType);

impl OrdType {
    /// Returns the venue's TargetStrategy (tag 847) code for this order type.
    #[must_use]
    pub const fn target_strategy(self) -> char {
        match self {
            Self::Market => 'M',
            Self::Limit => 'L',
        }
    }
}

/// Time in force enumeration (tag 59).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    /// Good till cancel.
    GoodTillCancel = b'1',
    /// Immediate or cancel.
    ImmediateOrCancel = b'3',
    /// Fill or kill.
    FillOrKill = b'4',
    /// Good till date.
    GoodTillDate = b'6',
}

fix_char_enum!(TimeInForce);

/// Execution type enumeration (tag 150).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecType {
    /// Order accepted.
    New = b'0',
    /// Partially filled.
    PartialFill = b'1',
    /// Completely filled.
    Fill = b'2',
    /// Done for the day.
    DoneForDay = b'3',
    /// Canceled.
    Canceled = b'4',
    /// Replaced.
    Replaced = b'5',
    /// Cancel pending.
    PendingCancel = b'6',
    /// Stopped.
    Stopped = b'7',
    /// Rejected.
    Rejected = b'8',
    /// Suspended.
    Suspended = b'9',
    /// Acceptance pending.
    PendingNew = b'A',
    /// Expired.
    Expired = b'C',
    /// Restated.
    Restated = b'D',
    /// Replace pending.
    PendingReplace = b'E',
    /// Trade (FIX 4.4+ fills).
    Trade = b'F',
    /// Order status reply.
    OrderStatus = b'I',
}

fix_char_enum!(ExecType);

impl ExecType {
    /// Returns true if the report carries a fill.
    #[must_use]
    pub const fn is_fill(self) -> bool {
        matches!(self, Self::PartialFill | Self::Fill | Self::Trade)
    }
}

/// Order status enumeration (tag 39).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[repr(u8)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrdStatus {
    /// Accepted.
    New = b'0',
    /// Partially filled.
    PartiallyFilled = b'1',
    /// Filled.
    Filled = b'2',
    /// Done for the day.
    DoneForDay = b'3',
    /// Canceled.
    Canceled = b'4',
    /// Cancel pending.
    PendingCancel = b'6',
    /// Stopped.
    Stopped = b'7',
    /// Rejected.
    Rejected = b'8',
    /// Acceptance pending.
    PendingNew = b'A',
    /// Expired.
    Expired = b'C',
    /// Replace pending.
    PendingReplace = b'E',
}

fix_char_enum!(OrdStatus);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_num_operations() {
        let seq = SeqNum::new(5);
        assert_eq!(seq.value(), 5);
        assert_eq!(seq.next().value(), 6);
        assert!(seq.is_valid());
        assert!(!SeqNum::new(0).is_valid());
        assert_eq!(SeqNum::default().value(), 1);
    }

    #[test]
    fn test_timestamp_format() {
        let ts = Timestamp::from_millis(1_700_000_000_123);
        assert_eq!(ts.format_millis().as_str(), "20231114-22:13:20.123");
    }

    #[test]
    fn test_timestamp_parse() {
        let ts = Timestamp::parse("20231114-22:13:20.123").unwrap();
        assert_eq!(ts.as_millis(), 1_700_000_000_123);

        let whole = Timestamp::parse("20231114-22:13:20").unwrap();
        assert_eq!(whole.as_millis(), 1_700_000_000_000);

        assert!(Timestamp::parse("not a time").is_none());
    }

    #[test]
    fn test_comp_id() {
        let id = CompId::new("SENDER").unwrap();
        assert_eq!(id.as_str(), "SENDER");
        assert!(CompId::new("").is_none());
        assert!(CompId::new(&"A".repeat(COMP_ID_MAX_LEN + 1)).is_none());
    }

    #[test]
    fn test_side_chars() {
        assert_eq!(Side::from_char('1'), Some(Side::Buy));
        assert_eq!(Side::from_char('2'), Some(Side::Sell));
        assert_eq!(Side::from_char('X'), None);
        assert_eq!(Side::Buy.to_string(), "1");
    }

    #[test]
    fn test_ord_type_codes() {
        assert_eq!(OrdType::Limit.as_char(), '2');
        assert_eq!(OrdType::Market.as_char(), '1');
        assert_eq!(OrdType::Limit.target_strategy(), 'L');
        assert_eq!(OrdType::Market.target_strategy(), 'M');
    }

    #[test]
    fn test_exec_type_from_char() {
        assert_eq!(ExecType::from_char('F'), Some(ExecType::Trade));
        assert_eq!(ExecType::from_char('8'), Some(ExecType::Rejected));
        assert!(ExecType::Trade.is_fill());
        assert!(!ExecType::New.is_fill());
        assert_eq!(ExecType::from_char('é'), None);
    }

    #[test]
    fn test_time_in_force_codes() {
        assert_eq!(TimeInForce::GoodTillCancel.as_char(), '1');
        assert_eq!(TimeInForce::ImmediateOrCancel.as_char(), '3');
    }
}
