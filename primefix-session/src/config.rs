/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session configuration.
//!
//! [`SessionConfig`] holds the per-session protocol settings,
//! [`ConnectionConfig`] where to connect and [`ReconnectPolicy`] how to retry.
//! Each can be loaded from the environment; there is no config file format.

use primefix_core::error::SessionError;
use primefix_core::types::CompId;
use std::time::Duration;

/// Default FIX version for the venue.
pub const DEFAULT_BEGIN_STRING: &str = "FIX.4.2";

/// Default TargetCompID for the venue.
pub const DEFAULT_TARGET_COMP_ID: &str = "COIN";

/// Configuration for a FIX session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sender CompID (tag 49).
    pub sender_comp_id: CompId,
    /// Target CompID (tag 56).
    pub target_comp_id: CompId,
    /// Optional qualifier distinguishing sessions with the same CompIDs.
    pub session_qualifier: Option<String>,
    /// FIX version BeginString (e.g., "FIX.4.2").
    pub begin_string: String,
    /// Heartbeat interval.
    pub heartbeat_interval: Duration,
    /// Whether to reset sequence numbers on logon.
    pub reset_on_logon: bool,
    /// Maximum message size in bytes.
    pub max_message_size: usize,
    /// Logon timeout duration.
    pub logon_timeout: Duration,
    /// Logout timeout duration.
    pub logout_timeout: Duration,
    /// Heartbeat intervals a resend may stall before the session gives up.
    pub resend_timeout_intervals: u32,
    /// Value of DropCopyFlag (9406) sent on Logon.
    pub drop_copy_flag: bool,
    /// Whether inbound tags outside the known catalog are rejected.
    pub strict_decoding: bool,
    /// Optional sender sub ID (tag 50).
    pub sender_sub_id: Option<String>,
    /// Optional target sub ID (tag 57).
    pub target_sub_id: Option<String>,
}

impl SessionConfig {
    /// Creates a new session configuration with required fields.
    ///
    /// # Arguments
    /// * `sender_comp_id` - The sender CompID
    /// * `target_comp_id` - The target CompID
    /// * `begin_string` - The FIX version string
    #[must_use]
    pub fn new(
        sender_comp_id: CompId,
        target_comp_id: CompId,
        begin_string: impl Into<String>,
    ) -> Self {
        Self {
            sender_comp_id,
            target_comp_id,
            session_qualifier: None,
            begin_string: begin_string.into(),
            heartbeat_interval: Duration::from_secs(30),
            reset_on_logon: false,
            max_message_size: 1024 * 1024,
            logon_timeout: Duration::from_secs(10),
            logout_timeout: Duration::from_secs(10),
            resend_timeout_intervals: 3,
            drop_copy_flag: true,
            strict_decoding: false,
            sender_sub_id: None,
            target_sub_id: None,
        }
    }

    /// Loads the configuration from the process environment.
    ///
    /// Reads `FIX_SENDER_COMP_ID` (required), `FIX_TARGET_COMP_ID` (default
    /// `COIN`) and `FIX_HEARTBEAT_SECS` (default 30).
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if a variable is missing or invalid.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if a variable is missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SessionError> {
        let sender = required(&lookup, "FIX_SENDER_COMP_ID")?;
        let target =
            lookup("FIX_TARGET_COMP_ID").unwrap_or_else(|| DEFAULT_TARGET_COMP_ID.to_string());

        let mut builder = SessionConfigBuilder::new()
            .sender_comp_id(comp_id(&sender, "FIX_SENDER_COMP_ID")?)
            .target_comp_id(comp_id(&target, "FIX_TARGET_COMP_ID")?);

        if let Some(secs) = lookup("FIX_HEARTBEAT_SECS") {
            let secs: u64 = parse_var("FIX_HEARTBEAT_SECS", &secs)?;
            builder = builder.heartbeat_interval(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Sets the heartbeat interval.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` unless the interval is a whole
    /// number of seconds and at least one second.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Result<Self, SessionError> {
        check_heartbeat_interval(interval)?;
        self.heartbeat_interval = interval;
        Ok(self)
    }

    /// Sets whether to reset sequence numbers on logon.
    #[must_use]
    pub const fn with_reset_on_logon(mut self, reset: bool) -> Self {
        self.reset_on_logon = reset;
        self
    }

    /// Sets the maximum message size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Sets the logon timeout.
    #[must_use]
    pub fn with_logon_timeout(mut self, timeout: Duration) -> Self {
        self.logon_timeout = timeout;
        self
    }

    /// Sets the logout timeout.
    #[must_use]
    pub fn with_logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }

    /// Sets how many heartbeat intervals a resend may stall.
    #[must_use]
    pub const fn with_resend_timeout_intervals(mut self, intervals: u32) -> Self {
        self.resend_timeout_intervals = intervals;
        self
    }

    /// Sets the DropCopyFlag sent on Logon.
    #[must_use]
    pub const fn with_drop_copy_flag(mut self, flag: bool) -> Self {
        self.drop_copy_flag = flag;
        self
    }

    /// Sets whether unknown inbound tags are rejected.
    #[must_use]
    pub const fn with_strict_decoding(mut self, strict: bool) -> Self {
        self.strict_decoding = strict;
        self
    }

    /// Sets the session qualifier.
    #[must_use]
    pub fn with_session_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.session_qualifier = Some(qualifier.into());
        self
    }

    /// Sets the sender sub ID.
    #[must_use]
    pub fn with_sender_sub_id(mut self, sub_id: impl Into<String>) -> Self {
        self.sender_sub_id = Some(sub_id.into());
        self
    }

    /// Sets the target sub ID.
    #[must_use]
    pub fn with_target_sub_id(mut self, sub_id: impl Into<String>) -> Self {
        self.target_sub_id = Some(sub_id.into());
        self
    }

    /// Checks the settings a session cannot run with.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` for an unusable heartbeat interval.
    pub fn validate(&self) -> Result<(), SessionError> {
        check_heartbeat_interval(self.heartbeat_interval)
    }

    /// Returns the heartbeat interval in seconds.
    #[must_use]
    pub fn heartbeat_interval_secs(&self) -> u64 {
        self.heartbeat_interval.as_secs()
    }

    /// Time a resend may stall before `ProtocolFatal::ResendTimeout`.
    #[must_use]
    pub fn resend_timeout(&self) -> Duration {
        self.heartbeat_interval * self.resend_timeout_intervals
    }
}

/// Builder for session configuration.
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    sender_comp_id: Option<CompId>,
    target_comp_id: Option<CompId>,
    begin_string: Option<String>,
    heartbeat_interval: Option<Duration>,
    reset_on_logon: bool,
    max_message_size: Option<usize>,
    drop_copy_flag: Option<bool>,
}

impl SessionConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender CompID.
    #[must_use]
    pub fn sender_comp_id(mut self, id: CompId) -> Self {
        self.sender_comp_id = Some(id);
        self
    }

    /// Sets the target CompID.
    #[must_use]
    pub fn target_comp_id(mut self, id: CompId) -> Self {
        self.target_comp_id = Some(id);
        self
    }

    /// Sets the FIX version.
    #[must_use]
    pub fn begin_string(mut self, version: impl Into<String>) -> Self {
        self.begin_string = Some(version.into());
        self
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Sets whether to reset on logon.
    #[must_use]
    pub const fn reset_on_logon(mut self, reset: bool) -> Self {
        self.reset_on_logon = reset;
        self
    }

    /// Sets the maximum message size.
    #[must_use]
    pub const fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = Some(size);
        self
    }

    /// Sets the DropCopyFlag sent on Logon.
    #[must_use]
    pub const fn drop_copy_flag(mut self, flag: bool) -> Self {
        self.drop_copy_flag = Some(flag);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if a CompID is missing or the
    /// heartbeat interval is not a whole number of seconds of at least one.
    pub fn build(self) -> Result<SessionConfig, SessionError> {
        let sender = self
            .sender_comp_id
            .ok_or_else(|| SessionError::Configuration("sender_comp_id is required".into()))?;
        let target = self
            .target_comp_id
            .ok_or_else(|| SessionError::Configuration("target_comp_id is required".into()))?;
        let begin_string = self
            .begin_string
            .unwrap_or_else(|| DEFAULT_BEGIN_STRING.to_string());

        let mut config = SessionConfig::new(sender, target, begin_string);

        if let Some(interval) = self.heartbeat_interval {
            config = config.with_heartbeat_interval(interval)?;
        }
        config.reset_on_logon = self.reset_on_logon;
        if let Some(size) = self.max_message_size {
            config.max_message_size = size;
        }
        if let Some(flag) = self.drop_copy_flag {
            config.drop_copy_flag = flag;
        }

        Ok(config)
    }
}

/// HeartBtInt (108) is whole seconds, so the timer must match it exactly.
fn check_heartbeat_interval(interval: Duration) -> Result<(), SessionError> {
    if interval < Duration::from_secs(1) || interval.subsec_nanos() != 0 {
        return Err(SessionError::Configuration(format!(
            "heartbeat interval must be whole seconds of at least 1, got {interval:?}"
        )));
    }
    Ok(())
}

/// Retry schedule for re-establishing a dropped connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Growth factor applied after each failed attempt.
    pub multiplier: f64,
    /// Consecutive failures tolerated; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// Policy that never reconnects.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            max_attempts: Some(0),
        }
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the upper bound on any single delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the number of consecutive failures tolerated.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.multiplier.max(1.0).powi(exponent);
        let secs = self.initial_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Returns true once `failures` consecutive failures exhaust the budget.
    #[must_use]
    pub fn is_exhausted(&self, failures: u32) -> bool {
        self.max_attempts.is_some_and(|max| failures > max)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: Some(10),
        }
    }
}

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Counterparty host name or address.
    pub host: String,
    /// Counterparty port.
    pub port: u16,
    /// Bound on establishing the transport connection.
    pub connect_timeout: Duration,
    /// Retry schedule after a dropped connection.
    pub reconnect: ReconnectPolicy,
}

impl ConnectionConfig {
    /// Creates a connection configuration with default timeouts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Loads `FIX_HOST` and `FIX_PORT` from the process environment.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if a variable is missing or invalid.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads `FIX_HOST` and `FIX_PORT` through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if a variable is missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SessionError> {
        let host = required(&lookup, "FIX_HOST")?;
        let port = parse_var("FIX_PORT", &required(&lookup, "FIX_PORT")?)?;
        Ok(Self::new(host, port))
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the reconnect policy.
    #[must_use]
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }
}

/// Reads a variable that must be present and non-empty.
pub(crate) fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, SessionError> {
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| SessionError::Configuration(format!("{key} is not set")))
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SessionError> {
    value
        .trim()
        .parse()
        .map_err(|_| SessionError::Configuration(format!("{key} has an invalid value")))
}

fn comp_id(value: &str, key: &str) -> Result<CompId, SessionError> {
    CompId::new(value)
        .ok_or_else(|| SessionError::Configuration(format!("{key} is not a valid CompID")))
}
