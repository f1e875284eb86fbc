/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Heartbeat and TestRequest management.
//!
//! This module handles FIX session heartbeat logic including:
//! - Sending heartbeats when the outbound side has been idle for one interval
//! - Sending a TestRequest after 1.2 intervals of inbound silence
//! - Detecting a TestRequest left unanswered for a further interval
//!
//! Time comes from `tokio::time`, so the whole schedule can be driven by a
//! paused runtime clock.

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Manages heartbeat timing for a FIX session.
#[derive(Debug)]
pub struct HeartbeatManager {
    /// Heartbeat interval.
    interval: Duration,
    /// Time of last message sent.
    last_sent: Instant,
    /// Time of last message received.
    last_received: Instant,
    /// Pending TestRequest ID, if any.
    test_request_pending: Option<String>,
    /// Time when TestRequest was sent.
    test_request_sent_at: Option<Instant>,
}

impl HeartbeatManager {
    /// Creates a new heartbeat manager with the specified interval.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            interval,
            last_sent: now,
            last_received: now,
            test_request_pending: None,
            test_request_sent_at: None,
        }
    }

    /// Records that a message was sent.
    #[inline]
    pub fn on_message_sent(&mut self) {
        self.last_sent = Instant::now();
    }

    /// Records that a message was received.
    ///
    /// Any inbound message proves the link is alive and answers an
    /// outstanding TestRequest, whether or not it echoes the TestReqID.
    ///
    /// # Arguments
    /// * `is_heartbeat` - Whether the received message is a Heartbeat
    /// * `test_req_id` - The TestReqID from the Heartbeat, if present
    pub fn on_message_received(&mut self, is_heartbeat: bool, test_req_id: Option<&str>) {
        self.last_received = Instant::now();

        if let Some(pending) = self.test_request_pending.take() {
            let echoed = is_heartbeat && test_req_id == Some(pending.as_str());
            if !echoed {
                trace!(test_req_id = %pending, "test request answered by other traffic");
            }
        }
        self.test_request_sent_at = None;
    }

    /// Checks if a heartbeat should be sent.
    #[must_use]
    pub fn should_send_heartbeat(&self) -> bool {
        self.last_sent.elapsed() >= self.interval
    }

    /// Checks if a TestRequest should be sent.
    #[must_use]
    pub fn should_send_test_request(&self) -> bool {
        if self.test_request_pending.is_some() {
            return false;
        }
        self.last_received.elapsed() >= self.test_request_threshold()
    }

    /// Checks if a pending TestRequest went unanswered for a full interval.
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        self.test_request_sent_at
            .is_some_and(|sent_at| sent_at.elapsed() >= self.interval)
    }

    /// Records that a TestRequest was sent.
    pub fn on_test_request_sent(&mut self, test_req_id: String) {
        let now = Instant::now();
        self.test_request_pending = Some(test_req_id);
        self.test_request_sent_at = Some(now);
        self.last_sent = now;
    }

    /// Returns the pending TestRequest ID, if any.
    #[must_use]
    pub fn pending_test_request(&self) -> Option<&str> {
        self.test_request_pending.as_deref()
    }

    /// Returns the time since the last message was received.
    #[must_use]
    pub fn time_since_last_received(&self) -> Duration {
        self.last_received.elapsed()
    }

    /// Returns the time since the last message was sent.
    #[must_use]
    pub fn time_since_last_sent(&self) -> Duration {
        self.last_sent.elapsed()
    }

    /// Returns the heartbeat interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Inbound silence after which a TestRequest is due (1.2 intervals).
    #[must_use]
    pub fn test_request_threshold(&self) -> Duration {
        self.interval * 6 / 5
    }

    /// Resets the manager state.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.last_sent = now;
        self.last_received = now;
        self.test_request_pending = None;
        self.test_request_sent_at = None;
    }
}

/// Generates a unique TestReqID.
///
/// Uses the current timestamp in nanoseconds.
#[must_use]
pub fn generate_test_req_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    format!("TEST{}", nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_manager_new() {
        let mgr = HeartbeatManager::new(Duration::from_secs(30));
        assert_eq!(mgr.interval(), Duration::from_secs(30));
        assert_eq!(mgr.test_request_threshold(), Duration::from_secs(36));
        assert!(mgr.pending_test_request().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_send_heartbeat() {
        let mut mgr = HeartbeatManager::new(Duration::from_secs(10));
        assert!(!mgr.should_send_heartbeat());

        advance(Duration::from_secs(10)).await;
        assert!(mgr.should_send_heartbeat());

        mgr.on_message_sent();
        assert!(!mgr.should_send_heartbeat());
    }

    #[tokio::test(start_paused = true)]
    async fn test_test_request_after_silence() {
        let mut mgr = HeartbeatManager::new(Duration::from_secs(10));

        advance(Duration::from_secs(11)).await;
        assert!(!mgr.should_send_test_request());

        advance(Duration::from_secs(1)).await;
        assert!(mgr.should_send_test_request());

        mgr.on_test_request_sent("TEST1".to_string());
        assert!(!mgr.should_send_test_request());
        assert!(!mgr.is_timed_out());

        advance(Duration::from_secs(10)).await;
        assert!(mgr.is_timed_out());
    }

    #[tokio::test(start_paused = true)]
    async fn test_matching_heartbeat_clears_test_request() {
        let mut mgr = HeartbeatManager::new(Duration::from_secs(30));

        mgr.on_test_request_sent("TEST123".to_string());
        assert_eq!(mgr.pending_test_request(), Some("TEST123"));

        mgr.on_message_received(true, Some("TEST123"));
        assert!(mgr.pending_test_request().is_none());
        assert!(!mgr.is_timed_out());
    }

    #[tokio::test(start_paused = true)]
    async fn test_any_inbound_message_answers_test_request() {
        let mut mgr = HeartbeatManager::new(Duration::from_secs(10));

        advance(Duration::from_secs(12)).await;
        mgr.on_test_request_sent("TEST1".to_string());

        advance(Duration::from_secs(5)).await;
        mgr.on_message_received(false, None);
        assert!(mgr.pending_test_request().is_none());

        advance(Duration::from_secs(5)).await;
        assert!(!mgr.is_timed_out());
        assert!(!mgr.should_send_test_request());

        advance(Duration::from_secs(7)).await;
        assert!(mgr.should_send_test_request());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbound_traffic_resets_silence() {
        let mut mgr = HeartbeatManager::new(Duration::from_secs(10));
        advance(Duration::from_secs(8)).await;
        mgr.on_message_received(false, None);

        advance(Duration::from_secs(8)).await;
        assert!(!mgr.should_send_test_request());
        assert_eq!(mgr.time_since_last_received(), Duration::from_secs(8));
    }

    #[test]
    fn test_generate_test_req_id() {
        let id = generate_test_req_id();
        assert!(id.starts_with("TEST"));
        assert!(id[4..].chars().all(|c| c.is_ascii_digit()));
    }
}
