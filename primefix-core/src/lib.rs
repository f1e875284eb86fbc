/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # PrimeFix Core
//!
//! Core types and error definitions for the PrimeFix FIX client.
//!
//! This crate provides the fundamental building blocks used across all PrimeFix crates:
//! - **Error types**: One `thiserror` enum per failure class, rolled up in `FixError`
//! - **Field types**: `Field`, `FieldValue`, and the ordered `FieldMap`
//! - **Message types**: `Message` (header/body/trailer) and `MsgType`
//! - **Core types**: `SeqNum`, `Timestamp`, `CompId` and the order enumerations
//! - **Tags**: Tag constants and the header/trailer/known-tag catalog

pub mod error;
pub mod field;
pub mod message;
pub mod tags;
pub mod types;

pub use error::{
    DecodeError, EncodeError, FixError, ParseError, ProtocolFatal, Result, SequenceError,
    SessionError, StoreError, ValidationError,
};
pub use field::{Field, FieldMap, FieldValue};
pub use message::{Message, MsgType};
pub use types::{CompId, ExecType, OrdStatus, OrdType, SeqNum, Side, TimeInForce, Timestamp};
