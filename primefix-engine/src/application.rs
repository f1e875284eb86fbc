/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Application callback interface.
//!
//! The engine owns the session and reports to the trading logic through the
//! [`Application`] trait. Callbacks run on the session task, so they should
//! hand long-running work off to another task.

use crate::handle::SessionHandle;
use async_trait::async_trait;
use primefix_core::message::Message;
use primefix_messages::ExecutionReport;
use primefix_session::{DisconnectReason, SessionEvent, SessionId};

/// Reason for rejecting an inbound application message.
///
/// Returned from [`Application::from_app`]; the engine answers with a
/// session-level Reject (35=3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectReason {
    /// SessionRejectReason (373) code.
    pub code: u32,
    /// Human-readable rejection text.
    pub text: String,
    /// Reference tag that caused the rejection.
    pub ref_tag: Option<u32>,
}

impl RejectReason {
    /// Creates a new rejection reason.
    #[must_use]
    pub fn new(code: u32, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
            ref_tag: None,
        }
    }

    /// Sets the reference tag.
    #[must_use]
    pub const fn with_ref_tag(mut self, tag: u32) -> Self {
        self.ref_tag = Some(tag);
        self
    }
}

/// Application callback interface for a FIX session.
#[async_trait]
pub trait Application: Send + Sync + 'static {
    /// Called once when the initiator starts.
    async fn on_create(&self, session_id: &SessionId);

    /// Called for every session event, in order.
    async fn on_event(&self, session_id: &SessionId, event: &SessionEvent);

    /// Called when the session becomes active after a Logon.
    ///
    /// # Arguments
    /// * `session_id` - The session identifier
    /// * `handle` - Handle for sending orders on this session
    async fn on_active(&self, session_id: &SessionId, handle: &SessionHandle);

    /// Called after the connection is gone.
    async fn on_disconnected(&self, session_id: &SessionId, reason: &DisconnectReason);

    /// Called for every parsed Execution Report.
    async fn on_execution_report(&self, session_id: &SessionId, report: ExecutionReport);

    /// Called when an application message is received, before typed
    /// dispatch.
    ///
    /// # Returns
    /// `Ok(())` to accept, `Err(RejectReason)` to reject.
    #[allow(clippy::wrong_self_convention)]
    async fn from_app(&self, message: &Message, session_id: &SessionId)
    -> Result<(), RejectReason>;
}

/// Default no-op application implementation.
#[derive(Debug, Default)]
pub struct NoOpApplication;

#[async_trait]
impl Application for NoOpApplication {
    async fn on_create(&self, _session_id: &SessionId) {}

    async fn on_event(&self, _session_id: &SessionId, _event: &SessionEvent) {}

    async fn on_active(&self, _session_id: &SessionId, _handle: &SessionHandle) {}

    async fn on_disconnected(&self, _session_id: &SessionId, _reason: &DisconnectReason) {}

    async fn on_execution_report(&self, _session_id: &SessionId, _report: ExecutionReport) {}

    async fn from_app(
        &self,
        _message: &Message,
        _session_id: &SessionId,
    ) -> Result<(), RejectReason> {
        Ok(())
    }
}
