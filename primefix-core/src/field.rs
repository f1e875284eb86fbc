/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Field types for FIX protocol messages.
//!
//! This module provides:
//! - [`Field`]: A tag paired with its FIX text value
//! - [`FieldValue`]: Typed input that renders to FIX text
//! - [`FieldMap`]: Ordered tag-to-value mapping used for each message region

use crate::error::ParseError;
use crate::types::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// A single tag=value pair.
///
/// Values are kept in their wire text form so a decoded message encodes back
/// to the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// The field tag number.
    pub tag: u32,
    /// The field value as FIX text.
    pub value: String,
}

impl Field {
    /// Creates a new field.
    #[inline]
    #[must_use]
    pub fn new(tag: u32, value: impl Into<String>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// Returns the value as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Parses the value as the specified type.
    ///
    /// # Errors
    /// Returns `ParseError::InvalidValue` if parsing fails.
    pub fn parse<T: FromStr>(&self) -> Result<T, ParseError> {
        self.value.parse().map_err(|_| ParseError::InvalidValue {
            tag: self.tag,
            reason: format!(
                "failed to parse '{}' as {}",
                self.value,
                std::any::type_name::<T>()
            ),
        })
    }

    /// Returns the value as a u64.
    ///
    /// # Errors
    /// Returns `ParseError::InvalidValue` if the value is not a valid integer.
    pub fn as_u64(&self) -> Result<u64, ParseError> {
        self.parse()
    }

    /// Returns the value as a Decimal.
    ///
    /// # Errors
    /// Returns `ParseError::InvalidValue` if the value is not a valid decimal.
    pub fn as_decimal(&self) -> Result<Decimal, ParseError> {
        self.parse()
    }

    /// Returns the value as a bool (FIX uses 'Y'/'N').
    ///
    /// # Errors
    /// Returns `ParseError::InvalidValue` if the value is not 'Y' or 'N'.
    pub fn as_bool(&self) -> Result<bool, ParseError> {
        match self.value.as_str() {
            "Y" => Ok(true),
            "N" => Ok(false),
            _ => Err(ParseError::InvalidValue {
                tag: self.tag,
                reason: "expected 'Y' or 'N'".to_string(),
            }),
        }
    }

    /// Returns the value as a single character.
    ///
    /// # Errors
    /// Returns `ParseError::InvalidValue` if the value is not a single ASCII character.
    pub fn as_char(&self) -> Result<char, ParseError> {
        let bytes = self.value.as_bytes();
        if bytes.len() == 1 && bytes[0].is_ascii() {
            Ok(bytes[0] as char)
        } else {
            Err(ParseError::InvalidValue {
                tag: self.tag,
                reason: "expected single ASCII character".to_string(),
            })
        }
    }
}

/// Typed field value accepted by the message setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// String value.
    String(String),
    /// Integer value.
    Int(i64),
    /// Unsigned integer value.
    UInt(u64),
    /// Decimal value, rendered with its own scale.
    Decimal(Decimal),
    /// Boolean value (Y/N).
    Bool(bool),
    /// Single character value.
    Char(char),
    /// UTC timestamp, rendered with millisecond precision.
    Timestamp(Timestamp),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Int(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "{}", v),
            Self::Decimal(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", if *v { "Y" } else { "N" }),
            Self::Char(c) => write!(f, "{}", c),
            Self::Timestamp(ts) => write!(f, "{}", ts.format_millis()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::UInt(u64::from(value))
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<char> for FieldValue {
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(value: Timestamp) -> Self {
        Self::Timestamp(value)
    }
}

/// Ordered mapping from tag to value.
///
/// Insertion order is preserved. Setting a tag that is already present
/// replaces its value in place, so the wire order stays stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    fields: SmallVec<[Field; 16]>,
}

impl FieldMap {
    /// Creates an empty field map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing any existing value for the tag.
    pub fn set(&mut self, tag: u32, value: impl Into<FieldValue>) {
        let rendered = value.into().to_string();
        match self.fields.iter_mut().find(|f| f.tag == tag) {
            Some(existing) => existing.value = rendered,
            None => self.fields.push(Field::new(tag, rendered)),
        }
    }

    /// Appends a field without checking for an existing tag.
    ///
    /// Used by the decoder so repeated tags survive a round trip.
    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Inserts a field at the given position, replacing any existing value.
    pub fn insert_at(&mut self, index: usize, tag: u32, value: impl Into<FieldValue>) {
        self.remove(tag);
        let index = index.min(self.fields.len());
        self.fields
            .insert(index, Field::new(tag, value.into().to_string()));
    }

    /// Removes a field, returning its value if it was present.
    pub fn remove(&mut self, tag: u32) -> Option<String> {
        let pos = self.fields.iter().position(|f| f.tag == tag)?;
        Some(self.fields.remove(pos).value)
    }

    /// Gets the first field with the given tag.
    #[must_use]
    pub fn get(&self, tag: u32) -> Option<&Field> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// Gets a field value as a string.
    #[must_use]
    pub fn get_str(&self, tag: u32) -> Option<&str> {
        self.get(tag).map(Field::as_str)
    }

    /// Returns true if the tag is present.
    #[must_use]
    pub fn contains(&self, tag: u32) -> bool {
        self.get(tag).is_some()
    }

    /// Returns an iterator over all fields in order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Returns the number of fields.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_as_u64() {
        let field = Field::new(34, "12345");
        assert_eq!(field.as_u64().unwrap(), 12345);
    }

    #[test]
    fn test_field_parse_error_names_tag() {
        let field = Field::new(34, "abc");
        let err = field.as_u64().unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { tag: 34, .. }));
    }

    #[test]
    fn test_field_as_bool() {
        assert!(Field::new(43, "Y").as_bool().unwrap());
        assert!(!Field::new(43, "N").as_bool().unwrap());
        assert!(Field::new(43, "X").as_bool().is_err());
    }

    #[test]
    fn test_field_as_char() {
        assert_eq!(Field::new(54, "1").as_char().unwrap(), '1');
        assert!(Field::new(54, "12").as_char().is_err());
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::from("test").to_string(), "test");
        assert_eq!(FieldValue::Int(-42).to_string(), "-42");
        assert_eq!(FieldValue::Bool(true).to_string(), "Y");
        assert_eq!(FieldValue::Bool(false).to_string(), "N");
        let qty = Decimal::from_str("0.0015").unwrap();
        assert_eq!(FieldValue::from(qty).to_string(), "0.0015");
        let ts = Timestamp::from_millis(0);
        assert_eq!(FieldValue::from(ts).to_string(), "19700101-00:00:00.000");
    }

    #[test]
    fn test_field_map_set_replaces_in_place() {
        let mut map = FieldMap::new();
        map.set(55, "ETH-USD");
        map.set(54, '1');
        map.set(55, "BTC-USD");

        let tags: Vec<u32> = map.iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec![55, 54]);
        assert_eq!(map.get_str(55), Some("BTC-USD"));
    }

    #[test]
    fn test_field_map_insert_at_and_remove() {
        let mut map = FieldMap::new();
        map.set(49, "SENDER");
        map.insert_at(0, 35, "D");
        assert_eq!(map.iter().next().unwrap().tag, 35);

        assert_eq!(map.remove(49), Some("SENDER".to_string()));
        assert!(!map.contains(49));
        assert_eq!(map.len(), 1);
    }
}
