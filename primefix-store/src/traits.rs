/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message store trait definition.
//!
//! This module defines the abstract interface for message storage implementations.

use async_trait::async_trait;
use bytes::Bytes;
use primefix_core::error::StoreError;
use std::sync::Arc;
use std::time::SystemTime;

/// Abstract interface for FIX message storage.
///
/// Implementations keep every outgoing frame by sequence number so a Resend
/// Request can be answered, and persist both sequence counters so a session
/// can resume after a reconnect.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Stores an outgoing message for potential resend.
    ///
    /// The message must be durable when this returns.
    ///
    /// # Arguments
    /// * `seq_num` - The message sequence number
    /// * `message` - The encoded frame
    ///
    /// # Errors
    /// Returns `StoreError` if the message cannot be stored.
    async fn store(&self, seq_num: u64, message: &[u8]) -> Result<(), StoreError>;

    /// Retrieves stored messages for a resend request.
    ///
    /// Sequence numbers with no stored frame are absent from the result.
    ///
    /// # Arguments
    /// * `begin` - Begin sequence number (inclusive)
    /// * `end` - End sequence number (inclusive, or 0 for infinity)
    ///
    /// # Errors
    /// Returns `StoreError::RangeNotAvailable` if `begin` is after a non-zero
    /// `end`, or another `StoreError` if messages cannot be read.
    async fn get_range(&self, begin: u64, end: u64) -> Result<Vec<(u64, Bytes)>, StoreError>;

    /// Returns the next sender sequence number.
    fn next_sender_seq(&self) -> u64;

    /// Returns the next expected target sequence number.
    fn next_target_seq(&self) -> u64;

    /// Sets the next sender sequence number.
    ///
    /// # Errors
    /// Returns `StoreError` if the value cannot be persisted.
    async fn set_next_sender_seq(&self, seq: u64) -> Result<(), StoreError>;

    /// Sets the next expected target sequence number.
    ///
    /// # Errors
    /// Returns `StoreError` if the value cannot be persisted.
    async fn set_next_target_seq(&self, seq: u64) -> Result<(), StoreError>;

    /// Resets the store, clearing all messages and resetting sequence numbers.
    ///
    /// # Errors
    /// Returns `StoreError` if the reset fails.
    async fn reset(&self) -> Result<(), StoreError>;

    /// Returns the creation time of the store/session.
    fn creation_time(&self) -> SystemTime;

    /// Refreshes the store from persistent storage.
    ///
    /// # Errors
    /// Returns `StoreError` if the refresh fails.
    async fn refresh(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl<T: MessageStore + ?Sized> MessageStore for Arc<T> {
    async fn store(&self, seq_num: u64, message: &[u8]) -> Result<(), StoreError> {
        (**self).store(seq_num, message).await
    }

    async fn get_range(&self, begin: u64, end: u64) -> Result<Vec<(u64, Bytes)>, StoreError> {
        (**self).get_range(begin, end).await
    }

    fn next_sender_seq(&self) -> u64 {
        (**self).next_sender_seq()
    }

    fn next_target_seq(&self) -> u64 {
        (**self).next_target_seq()
    }

    async fn set_next_sender_seq(&self, seq: u64) -> Result<(), StoreError> {
        (**self).set_next_sender_seq(seq).await
    }

    async fn set_next_target_seq(&self, seq: u64) -> Result<(), StoreError> {
        (**self).set_next_target_seq(seq).await
    }

    async fn reset(&self) -> Result<(), StoreError> {
        (**self).reset().await
    }

    fn creation_time(&self) -> SystemTime {
        (**self).creation_time()
    }

    async fn refresh(&self) -> Result<(), StoreError> {
        (**self).refresh().await
    }
}

/// Normalizes a range request, mapping an `end` of 0 to infinity.
///
/// # Errors
/// Returns `StoreError::RangeNotAvailable` if `begin` is after `end`.
pub(crate) fn resolve_range(begin: u64, end: u64) -> Result<(u64, u64), StoreError> {
    let end = if end == 0 { u64::MAX } else { end };
    if begin > end {
        return Err(StoreError::RangeNotAvailable {
            range: begin..end.saturating_add(1),
        });
    }
    Ok((begin, end))
}
