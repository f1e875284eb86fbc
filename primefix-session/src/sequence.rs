/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Sequence number management.
//!
//! This module provides atomic sequence number management for FIX sessions.

use primefix_core::error::SequenceError;
use primefix_core::types::SeqNum;
use std::sync::atomic::{AtomicU64, Ordering};

/// Manages sequence numbers for a FIX session.
///
/// Uses atomic operations for thread-safe access without locks.
#[derive(Debug)]
pub struct SequenceManager {
    /// Next outgoing sequence number.
    next_sender_seq: AtomicU64,
    /// Next expected incoming sequence number.
    next_target_seq: AtomicU64,
}

impl SequenceManager {
    /// Creates a new sequence manager with sequence numbers starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::with_initial(1, 1)
    }

    /// Creates a sequence manager resuming from persisted values.
    ///
    /// # Arguments
    /// * `sender_seq` - Next outgoing sequence number
    /// * `target_seq` - Next expected incoming sequence number
    #[must_use]
    pub fn with_initial(sender_seq: u64, target_seq: u64) -> Self {
        Self {
            next_sender_seq: AtomicU64::new(sender_seq),
            next_target_seq: AtomicU64::new(target_seq),
        }
    }

    /// Returns the next sender sequence number without incrementing.
    #[inline]
    #[must_use]
    pub fn next_sender_seq(&self) -> SeqNum {
        SeqNum::new(self.next_sender_seq.load(Ordering::SeqCst))
    }

    /// Returns the next expected target sequence number.
    #[inline]
    #[must_use]
    pub fn next_target_seq(&self) -> SeqNum {
        SeqNum::new(self.next_target_seq.load(Ordering::SeqCst))
    }

    /// Allocates the next outgoing sequence number.
    ///
    /// Returns the value before the increment, so a fresh manager yields
    /// 1, 2, 3, ...
    #[inline]
    pub fn next_outgoing_seq(&self) -> SeqNum {
        SeqNum::new(self.next_sender_seq.fetch_add(1, Ordering::SeqCst))
    }

    /// Records an inbound sequence number.
    ///
    /// The expected number advances only when `seq` matches it.
    ///
    /// # Errors
    /// - `SequenceError::Duplicate` if `seq` is below the expected number
    /// - `SequenceError::Gap` if `seq` is above it
    pub fn record_received(&self, seq: u64) -> Result<(), SequenceError> {
        let mut expected = self.next_target_seq.load(Ordering::SeqCst);
        loop {
            if seq < expected {
                return Err(SequenceError::Duplicate {
                    expected,
                    received: seq,
                });
            }
            if seq > expected {
                return Err(SequenceError::Gap {
                    expected,
                    received: seq,
                });
            }
            match self.next_target_seq.compare_exchange(
                expected,
                expected + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(()),
                Err(current) => expected = current,
            }
        }
    }

    /// Sets the next outgoing sequence number.
    #[inline]
    pub fn set_next_outgoing(&self, seq: u64) {
        self.next_sender_seq.store(seq, Ordering::SeqCst);
    }

    /// Sets the next expected incoming sequence number.
    #[inline]
    pub fn set_next_incoming(&self, seq: u64) {
        self.next_target_seq.store(seq, Ordering::SeqCst);
    }

    /// Resets both sequence numbers to 1.
    #[inline]
    pub fn reset(&self) {
        self.next_sender_seq.store(1, Ordering::SeqCst);
        self.next_target_seq.store(1, Ordering::SeqCst);
    }
}

impl Default for SequenceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_sequence_manager_new() {
        let mgr = SequenceManager::new();
        assert_eq!(mgr.next_sender_seq().value(), 1);
        assert_eq!(mgr.next_target_seq().value(), 1);
    }

    #[test]
    fn test_next_outgoing_seq() {
        let mgr = SequenceManager::new();
        let seqs: Vec<u64> = (0..3).map(|_| mgr.next_outgoing_seq().value()).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(mgr.next_sender_seq().value(), 4);
    }

    #[test]
    fn test_next_outgoing_seq_resumes() {
        let mgr = SequenceManager::with_initial(42, 7);
        assert_eq!(mgr.next_outgoing_seq().value(), 42);
        assert_eq!(mgr.next_outgoing_seq().value(), 43);
    }

    #[test]
    fn test_next_outgoing_seq_concurrent_unique() {
        let mgr = Arc::new(SequenceManager::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let mgr = Arc::clone(&mgr);
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| mgr.next_outgoing_seq().value())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (1..=1000).collect::<Vec<_>>());
    }

    #[test]
    fn test_record_received() {
        let mgr = SequenceManager::with_initial(1, 5);

        assert_eq!(mgr.record_received(5), Ok(()));
        assert_eq!(mgr.next_target_seq().value(), 6);

        assert_eq!(
            mgr.record_received(5),
            Err(SequenceError::Duplicate {
                expected: 6,
                received: 5
            })
        );
        assert_eq!(
            mgr.record_received(9),
            Err(SequenceError::Gap {
                expected: 6,
                received: 9
            })
        );
        assert_eq!(mgr.next_target_seq().value(), 6);
    }

    #[test]
    fn test_setters_and_reset() {
        let mgr = SequenceManager::with_initial(100, 200);
        mgr.set_next_outgoing(7);
        mgr.set_next_incoming(8);
        assert_eq!(mgr.next_sender_seq().value(), 7);
        assert_eq!(mgr.next_target_seq().value(), 8);

        mgr.reset();
        assert_eq!(mgr.next_sender_seq().value(), 1);
        assert_eq!(mgr.next_target_seq().value(), 1);
    }
}
