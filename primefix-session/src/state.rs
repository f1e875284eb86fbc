/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session state machine.
//!
//! The session task dispatches on the current state for every inbound
//! message and timer tick, so the state is a runtime enum. Each transition
//! method checks the source state and fails with
//! `SessionError::InvalidState` when the move is not allowed.

use primefix_core::error::SessionError;
use std::fmt;
use tokio::time::Instant;

/// Lifecycle state of a FIX session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No connection established.
    #[default]
    Disconnected,
    /// Transport connection in progress.
    Connecting,
    /// Logon sent, awaiting the counterparty's Logon.
    LogonSent {
        /// Time when Logon was sent.
        sent_at: Instant,
    },
    /// Session fully established.
    Active,
    /// Active, but waiting for the counterparty to fill a sequence gap.
    Resending {
        /// First missing sequence number.
        begin: u64,
        /// Sequence number that revealed the gap.
        end: u64,
        /// Time when the ResendRequest was sent.
        since: Instant,
    },
    /// Logout sent, awaiting confirmation.
    LogoutSent {
        /// Time when Logout was sent.
        sent_at: Instant,
    },
}

impl SessionState {
    /// Returns the state name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::LogonSent { .. } => "LogonSent",
            Self::Active => "Active",
            Self::Resending { .. } => "Resending",
            Self::LogoutSent { .. } => "LogoutSent",
        }
    }

    /// Returns true once logon completed and before logout started.
    #[must_use]
    pub const fn is_established(&self) -> bool {
        matches!(self, Self::Active | Self::Resending { .. })
    }

    /// Returns true if no connection exists.
    #[must_use]
    pub const fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Disconnected → Connecting.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidState` from any other state.
    pub fn connect(&mut self) -> Result<(), SessionError> {
        self.expect(matches!(self, Self::Disconnected), "Disconnected")?;
        *self = Self::Connecting;
        Ok(())
    }

    /// Connecting → LogonSent.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidState` from any other state.
    pub fn send_logon(&mut self) -> Result<(), SessionError> {
        self.expect(matches!(self, Self::Connecting), "Connecting")?;
        *self = Self::LogonSent {
            sent_at: Instant::now(),
        };
        Ok(())
    }

    /// LogonSent → Active.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidState` from any other state.
    pub fn on_logon_ack(&mut self) -> Result<(), SessionError> {
        self.expect(matches!(self, Self::LogonSent { .. }), "LogonSent")?;
        *self = Self::Active;
        Ok(())
    }

    /// Active → Resending, or widens the range of an ongoing resend.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidState` unless established.
    pub fn start_resend(&mut self, begin: u64, end: u64) -> Result<(), SessionError> {
        match *self {
            Self::Active => {
                *self = Self::Resending {
                    begin,
                    end,
                    since: Instant::now(),
                };
                Ok(())
            }
            Self::Resending {
                begin: current_begin,
                end: current_end,
                since,
            } => {
                *self = Self::Resending {
                    begin: current_begin.min(begin),
                    end: current_end.max(end),
                    since,
                };
                Ok(())
            }
            _ => Err(self.invalid("Active")),
        }
    }

    /// Records that the counterparty made progress on an ongoing resend.
    pub fn resend_progress(&mut self) {
        if let Self::Resending { since, .. } = self {
            *since = Instant::now();
        }
    }

    /// Resending → Active.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidState` from any other state.
    pub fn resend_complete(&mut self) -> Result<(), SessionError> {
        self.expect(matches!(self, Self::Resending { .. }), "Resending")?;
        *self = Self::Active;
        Ok(())
    }

    /// Active/Resending → LogoutSent.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidState` unless established.
    pub fn initiate_logout(&mut self) -> Result<(), SessionError> {
        self.expect(self.is_established(), "Active")?;
        *self = Self::LogoutSent {
            sent_at: Instant::now(),
        };
        Ok(())
    }

    /// Any state → Disconnected.
    pub fn disconnect(&mut self) {
        *self = Self::Disconnected;
    }

    fn expect(&self, allowed: bool, expected: &str) -> Result<(), SessionError> {
        if allowed {
            Ok(())
        } else {
            Err(self.invalid(expected))
        }
    }

    fn invalid(&self, expected: &str) -> SessionError {
        SessionError::InvalidState {
            expected: expected.to_string(),
            current: self.name().to_string(),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resending { begin, end, .. } => write!(f, "Resending({begin}..={end})"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_session_state_transitions() {
        let mut state = SessionState::default();
        assert!(state.is_disconnected());

        state.connect().unwrap();
        assert_eq!(state, SessionState::Connecting);

        state.send_logon().unwrap();
        assert_eq!(state.name(), "LogonSent");

        state.on_logon_ack().unwrap();
        assert_eq!(state, SessionState::Active);
        assert!(state.is_established());

        state.initiate_logout().unwrap();
        assert_eq!(state.name(), "LogoutSent");

        state.disconnect();
        assert!(state.is_disconnected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resend_flow() {
        let mut state = SessionState::Active;

        state.start_resend(5, 9).unwrap();
        state.start_resend(5, 12).unwrap();
        assert!(matches!(
            state,
            SessionState::Resending { begin: 5, end: 12, .. }
        ));
        assert!(state.is_established());
        assert_eq!(state.to_string(), "Resending(5..=12)");

        state.resend_complete().unwrap();
        assert_eq!(state, SessionState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_transitions() {
        let mut state = SessionState::Disconnected;
        assert_eq!(
            state.on_logon_ack(),
            Err(SessionError::InvalidState {
                expected: "LogonSent".to_string(),
                current: "Disconnected".to_string(),
            })
        );
        assert!(state.send_logon().is_err());
        assert!(state.initiate_logout().is_err());
        assert!(state.resend_complete().is_err());
        assert!(state.start_resend(1, 2).is_err());

        let mut state = SessionState::Active;
        assert!(state.connect().is_err());
        assert_eq!(state, SessionState::Active);
    }
}
