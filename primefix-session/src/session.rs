/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! The FIX session protocol engine.
//!
//! [`Session`] performs no I/O. It is fed decoded inbound messages and timer
//! ticks and answers with [`SessionAction`]s for the runtime to carry out:
//! frames to send, application messages to deliver, ranges to replay from the
//! store, events for observers, and when to drop the connection.
//!
//! Every outbound message built here is stamped with SenderCompID,
//! TargetCompID, MsgSeqNum and SendingTime. The runtime must persist and send
//! [`SessionAction::Send`] messages in the order they are returned.

use crate::auth::Credentials;
use crate::config::SessionConfig;
use crate::heartbeat::{HeartbeatManager, generate_test_req_id};
use crate::sequence::SequenceManager;
use crate::state::SessionState;
use bytes::Bytes;
use primefix_core::error::{ProtocolFatal, SequenceError, SessionError};
use primefix_core::message::{Message, MsgType};
use primefix_core::tags;
use primefix_core::types::{CompId, Timestamp};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Session reject reason: required tag missing.
const REJECT_REQUIRED_TAG_MISSING: u32 = 1;

/// Unique identifier for a FIX session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId {
    /// FIX version string.
    pub begin_string: String,
    /// Sender CompID.
    pub sender_comp_id: CompId,
    /// Target CompID.
    pub target_comp_id: CompId,
    /// Optional session qualifier.
    pub qualifier: Option<String>,
}

impl SessionId {
    /// Creates a new session ID.
    #[must_use]
    pub fn new(
        begin_string: impl Into<String>,
        sender_comp_id: CompId,
        target_comp_id: CompId,
    ) -> Self {
        Self {
            begin_string: begin_string.into(),
            sender_comp_id,
            target_comp_id,
            qualifier: None,
        }
    }

    /// Sets the session qualifier.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Builds the ID of the session described by `config`.
    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            begin_string: config.begin_string.clone(),
            sender_comp_id: config.sender_comp_id.clone(),
            target_comp_id: config.target_comp_id.clone(),
            qualifier: config.session_qualifier.clone(),
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}->{}",
            self.begin_string, self.sender_comp_id, self.target_comp_id
        )?;
        if let Some(ref qualifier) = self.qualifier {
            write!(f, ":{}", qualifier)?;
        }
        Ok(())
    }
}

/// Notable session occurrences reported to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Logon sent, awaiting the counterparty's Logon.
    LogonSent,
    /// Logon accepted; the session is active.
    Active,
    /// Inbound messages were missed and a resend was requested.
    GapDetected {
        /// First missing sequence number.
        begin: u64,
        /// Sequence number that revealed the gap.
        end: u64,
    },
    /// The counterparty filled the gap.
    GapFilled,
    /// The counterparty asked for a replay of our messages.
    ResendRequested {
        /// Begin sequence number.
        begin: u64,
        /// End sequence number (0 for infinity).
        end: u64,
    },
    /// The counterparty moved our expected inbound sequence number.
    SequenceReset {
        /// New expected sequence number.
        new_seq_no: u64,
        /// Whether the reset was a GapFill.
        gap_fill: bool,
    },
    /// The counterparty rejected one of our messages.
    Rejected {
        /// Sequence number of the rejected message.
        ref_seq_num: Option<u64>,
        /// SessionRejectReason (373).
        reason: Option<u32>,
        /// Free text (58).
        text: Option<String>,
    },
    /// The counterparty initiated a logout.
    LogoutReceived {
        /// Free text (58).
        text: Option<String>,
    },
}

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Our Logout was confirmed.
    LogoutCompleted,
    /// Our Logout was not confirmed in time.
    LogoutTimeout,
    /// The counterparty logged us out.
    CounterpartyLogout {
        /// Free text (58).
        text: Option<String>,
    },
    /// A protocol failure.
    Fatal(ProtocolFatal),
    /// The transport reached end of stream.
    TransportClosed,
    /// The transport failed.
    TransportError(String),
    /// An outbound frame or sequence number could not be persisted.
    StoreFailure(String),
    /// A session message failed to encode after taking a sequence number.
    EncodeFailure(String),
    /// Local shutdown.
    Shutdown,
}

impl DisconnectReason {
    /// Returns true if reconnecting may succeed.
    ///
    /// A rejected logon points at bad credentials, and a shutdown or a
    /// completed logout was requested locally.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Fatal(ProtocolFatal::LogonRejected { .. })
                | Self::Shutdown
                | Self::LogoutCompleted
                | Self::LogoutTimeout
        )
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogoutCompleted => f.write_str("logout completed"),
            Self::LogoutTimeout => f.write_str("logout not confirmed in time"),
            Self::CounterpartyLogout { text: Some(text) } => {
                write!(f, "counterparty logout: {text}")
            }
            Self::CounterpartyLogout { text: None } => f.write_str("counterparty logout"),
            Self::Fatal(fatal) => write!(f, "{fatal}"),
            Self::TransportClosed => f.write_str("connection closed by peer"),
            Self::TransportError(err) => write!(f, "transport error: {err}"),
            Self::StoreFailure(err) => write!(f, "store failure: {err}"),
            Self::EncodeFailure(err) => write!(f, "encode failure: {err}"),
            Self::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Work the runtime must carry out on behalf of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Persist, then transmit, a stamped message.
    Send(Message),
    /// Hand an application message to the application layer.
    Deliver(Message),
    /// Replay our stored messages in `begin..=end` (0 for infinity).
    Resend {
        /// Begin sequence number.
        begin: u64,
        /// End sequence number.
        end: u64,
    },
    /// Report an event to observers.
    Event(SessionEvent),
    /// Close the transport.
    Disconnect(DisconnectReason),
}

/// Sans-IO FIX session state machine.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    config: SessionConfig,
    credentials: Credentials,
    state: SessionState,
    sequences: SequenceManager,
    heartbeat: HeartbeatManager,
}

impl Session {
    /// Creates a session starting at sequence numbers 1/1.
    #[must_use]
    pub fn new(config: SessionConfig, credentials: Credentials) -> Self {
        Self::with_sequences(config, credentials, 1, 1)
    }

    /// Creates a session resuming from persisted sequence numbers.
    ///
    /// # Arguments
    /// * `next_sender` - Next outgoing MsgSeqNum
    /// * `next_target` - Next expected inbound MsgSeqNum
    #[must_use]
    pub fn with_sequences(
        config: SessionConfig,
        credentials: Credentials,
        next_sender: u64,
        next_target: u64,
    ) -> Self {
        Self {
            id: SessionId::from_config(&config),
            heartbeat: HeartbeatManager::new(config.heartbeat_interval),
            sequences: SequenceManager::with_initial(next_sender, next_target),
            state: SessionState::Disconnected,
            config,
            credentials,
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the next outgoing MsgSeqNum.
    #[must_use]
    pub fn next_sender_seq(&self) -> u64 {
        self.sequences.next_sender_seq().value()
    }

    /// Returns the next expected inbound MsgSeqNum.
    #[must_use]
    pub fn next_target_seq(&self) -> u64 {
        self.sequences.next_target_seq().value()
    }

    /// Marks the start of a connection attempt.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidState` unless disconnected.
    pub fn on_connecting(&mut self) -> Result<(), SessionError> {
        self.state.connect()
    }

    /// Builds the signed Logon once the transport is up.
    ///
    /// With `reset_on_logon` both sequence numbers restart at 1 and
    /// ResetSeqNumFlag is sent.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidState` unless connecting, or
    /// `SessionError::Configuration` if the Logon cannot be signed.
    pub fn on_connected(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        self.state.send_logon()?;
        let logon = match self.build_logon() {
            Ok(logon) => logon,
            Err(err) => {
                self.state.disconnect();
                return Err(err);
            }
        };
        self.heartbeat.reset();
        info!(
            session = %self.id,
            seq = self.next_sender_seq() - 1,
            reset = self.config.reset_on_logon,
            "sending logon"
        );
        Ok(vec![
            SessionAction::Send(logon),
            SessionAction::Event(SessionEvent::LogonSent),
        ])
    }

    /// Processes one decoded inbound message.
    pub fn on_message(&mut self, msg: Message) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        let Some(msg_type) = msg.msg_type() else {
            warn!(session = %self.id, "message without MsgType dropped");
            return actions;
        };
        let Some(seq) = msg.seq_num() else {
            warn!(session = %self.id, %msg_type, "message without MsgSeqNum dropped");
            return actions;
        };

        self.heartbeat.on_message_received(
            msg_type == MsgType::Heartbeat,
            msg.get_str(tags::TEST_REQ_ID),
        );
        if msg_type.is_admin() {
            debug!(session = %self.id, %msg, "received admin message");
        } else {
            info!(session = %self.id, %msg, "received application message");
        }

        match self.state {
            SessionState::Disconnected | SessionState::Connecting => {
                warn!(session = %self.id, %msg_type, "message received before logon was sent");
            }
            SessionState::LogonSent { .. } => {
                self.on_logon_response(&msg, &msg_type, seq, &mut actions);
            }
            SessionState::Active
            | SessionState::Resending { .. }
            | SessionState::LogoutSent { .. } => {
                self.on_established(msg, msg_type, seq, &mut actions);
            }
        }
        actions
    }

    /// Runs the timeout and keep-alive checks.
    ///
    /// Call this regularly, at least a few times per heartbeat interval.
    pub fn on_timer(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        match self.state {
            SessionState::LogonSent { sent_at } => {
                if sent_at.elapsed() >= self.config.logon_timeout {
                    let timeout_ms = millis(self.config.logon_timeout);
                    warn!(session = %self.id, timeout_ms, "no logon response");
                    self.fail(ProtocolFatal::LogonTimeout { timeout_ms }, &mut actions);
                }
            }
            SessionState::LogoutSent { sent_at } => {
                if sent_at.elapsed() >= self.config.logout_timeout {
                    warn!(session = %self.id, "logout not confirmed, disconnecting");
                    self.state.disconnect();
                    actions.push(SessionAction::Disconnect(DisconnectReason::LogoutTimeout));
                }
            }
            SessionState::Active | SessionState::Resending { .. } => {
                self.check_liveness(&mut actions);
            }
            SessionState::Disconnected | SessionState::Connecting => {}
        }
        actions
    }

    /// Stamps an outbound application message.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidState` unless the session is established,
    /// and `SessionError::Encode` if the message cannot be encoded.
    pub fn send_app(&mut self, mut msg: Message) -> Result<Message, SessionError> {
        if !self.state.is_established() {
            return Err(SessionError::InvalidState {
                expected: "Active".to_string(),
                current: self.state.name().to_string(),
            });
        }
        msg.header
            .set(tags::BEGIN_STRING, self.config.begin_string.as_str());
        // Reject before stamping so a bad message never consumes a MsgSeqNum.
        primefix_tagvalue::encode(&msg)?;
        let seq = self.stamp(&mut msg);
        info!(session = %self.id, seq, %msg, "sending application message");
        Ok(msg)
    }

    /// Starts a self-initiated logout.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidState` unless the session is established.
    pub fn initiate_logout(
        &mut self,
        text: Option<&str>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        self.state.initiate_logout()?;
        info!(session = %self.id, "initiating logout");
        Ok(vec![SessionAction::Send(self.build_logout(text))])
    }

    /// Records that the transport is gone.
    pub fn on_disconnected(&mut self) {
        self.state.disconnect();
        self.heartbeat.reset();
    }

    /// Builds a session-level Reject (35=3) for an inbound message.
    pub fn build_reject(
        &mut self,
        ref_seq_num: u64,
        ref_msg_type: Option<&str>,
        reason: u32,
        ref_tag: Option<u32>,
        text: &str,
    ) -> Message {
        let mut msg = self.new_message(MsgType::Reject);
        self.stamp(&mut msg);
        msg.set(tags::REF_SEQ_NUM, ref_seq_num);
        if let Some(tag) = ref_tag {
            msg.set(tags::REF_TAG_ID, u64::from(tag));
        }
        if let Some(msg_type) = ref_msg_type {
            msg.set(tags::REF_MSG_TYPE, msg_type);
        }
        msg.set(tags::SESSION_REJECT_REASON, u64::from(reason));
        if !text.is_empty() {
            msg.set(tags::TEXT, text);
        }
        msg
    }

    /// Builds the replay for a Resend Request from our stored frames.
    ///
    /// Application messages are re-sent with PossDupFlag and
    /// OrigSendingTime; administrative messages and sequence numbers with no
    /// stored frame collapse into SequenceReset-GapFill messages. The replay
    /// never goes past the last sequence number actually sent.
    pub fn build_resend(&mut self, begin: u64, end: u64, stored: &[(u64, Bytes)]) -> Vec<Message> {
        let last_sent = self.next_sender_seq().saturating_sub(1);
        let begin = begin.max(1);
        let end = if end == 0 || end > last_sent {
            last_sent
        } else {
            end
        };
        if begin > end {
            debug!(session = %self.id, begin, end, "nothing to resend");
            return Vec::new();
        }

        let mut replay = Vec::new();
        let mut next = begin;
        let mut frames: Vec<&(u64, Bytes)> = stored
            .iter()
            .filter(|(seq, _)| (begin..=end).contains(seq))
            .collect();
        frames.sort_by_key(|(seq, _)| *seq);

        for (seq, frame) in frames {
            let Ok(mut msg) = primefix_tagvalue::decode(frame) else {
                warn!(session = %self.id, seq, "stored frame unreadable, gap-filling it");
                continue;
            };
            if !msg.msg_type().is_some_and(|t| t.is_app()) || *seq < next {
                continue;
            }
            if *seq > next {
                replay.push(self.gap_fill(next, *seq));
            }
            let orig = msg.header.get_str(tags::SENDING_TIME).map(str::to_string);
            msg.header.set(tags::POSS_DUP_FLAG, true);
            if let Some(orig) = orig {
                msg.header.set(tags::ORIG_SENDING_TIME, orig);
            }
            msg.header.set(tags::SENDING_TIME, Timestamp::now());
            replay.push(msg);
            next = *seq + 1;
        }
        if next <= end {
            replay.push(self.gap_fill(next, end + 1));
        }

        self.heartbeat.on_message_sent();
        info!(session = %self.id, begin, end, messages = replay.len(), "replaying messages");
        replay
    }

    fn on_logon_response(
        &mut self,
        msg: &Message,
        msg_type: &MsgType,
        seq: u64,
        actions: &mut Vec<SessionAction>,
    ) {
        match msg_type {
            MsgType::Logon => {}
            MsgType::Logout => {
                let reason = msg
                    .get_str(tags::TEXT)
                    .unwrap_or("logout received in response to logon")
                    .to_string();
                warn!(session = %self.id, %reason, "logon rejected");
                self.fail(ProtocolFatal::LogonRejected { reason }, actions);
                return;
            }
            other => {
                warn!(session = %self.id, msg_type = %other, "unexpected message while awaiting logon");
                return;
            }
        }

        let reset = msg
            .body
            .get(tags::RESET_SEQ_NUM_FLAG)
            .and_then(|f| f.as_bool().ok())
            .unwrap_or(false);
        if reset {
            self.sequences.set_next_incoming(1);
        }

        let result = self.sequences.record_received(seq);
        if let Err(SequenceError::Duplicate { expected, received }) = result {
            let reason = format!("logon MsgSeqNum {received} below expected {expected}");
            warn!(session = %self.id, %reason, "sequence desync");
            actions.push(SessionAction::Send(self.build_logout(Some(&reason))));
            self.fail(ProtocolFatal::Desync { reason }, actions);
            return;
        }

        if let Err(err) = self.state.on_logon_ack() {
            warn!(session = %self.id, %err, "logon acknowledgement ignored");
            return;
        }
        self.heartbeat.reset();
        info!(session = %self.id, "session active");
        actions.push(SessionAction::Event(SessionEvent::Active));

        if let Err(SequenceError::Gap { expected, received }) = result {
            self.request_resend(expected, received, actions);
        }
    }

    fn on_established(
        &mut self,
        msg: Message,
        msg_type: MsgType,
        seq: u64,
        actions: &mut Vec<SessionAction>,
    ) {
        if msg_type == MsgType::SequenceReset && !is_gap_fill(&msg) {
            self.on_sequence_reset(&msg, false, actions);
            self.check_resend_complete(actions);
            return;
        }

        match self.sequences.record_received(seq) {
            Ok(()) => {}
            Err(SequenceError::Duplicate { expected, received }) => {
                debug!(
                    session = %self.id,
                    expected,
                    received,
                    poss_dup = msg.is_poss_dup(),
                    "duplicate message dropped"
                );
                return;
            }
            Err(SequenceError::Gap { expected, received }) => {
                self.request_resend(expected, received, actions);
                match msg_type {
                    MsgType::ResendRequest => self.on_resend_request(&msg, seq, actions),
                    MsgType::Logout => self.on_logout(&msg, actions),
                    _ => {}
                }
                return;
            }
        }

        self.state.resend_progress();
        match msg_type {
            MsgType::Heartbeat => {}
            MsgType::TestRequest => {
                let mut heartbeat = self.new_message(MsgType::Heartbeat);
                self.stamp(&mut heartbeat);
                if let Some(id) = msg.get_str(tags::TEST_REQ_ID) {
                    heartbeat.set(tags::TEST_REQ_ID, id);
                }
                actions.push(SessionAction::Send(heartbeat));
            }
            MsgType::ResendRequest => self.on_resend_request(&msg, seq, actions),
            MsgType::Reject => {
                let ref_seq_num = msg.body.get(tags::REF_SEQ_NUM).and_then(|f| f.as_u64().ok());
                let reason = msg
                    .body
                    .get(tags::SESSION_REJECT_REASON)
                    .and_then(|f| f.parse::<u32>().ok());
                let text = msg.get_str(tags::TEXT).map(str::to_string);
                warn!(session = %self.id, ?ref_seq_num, ?reason, ?text, "message rejected by counterparty");
                actions.push(SessionAction::Event(SessionEvent::Rejected {
                    ref_seq_num,
                    reason,
                    text,
                }));
            }
            MsgType::SequenceReset => self.on_sequence_reset(&msg, true, actions),
            MsgType::Logout => self.on_logout(&msg, actions),
            MsgType::Logon => {
                warn!(session = %self.id, "unexpected logon on an established session");
            }
            _ => actions.push(SessionAction::Deliver(msg)),
        }
        self.check_resend_complete(actions);
    }

    fn on_resend_request(&mut self, msg: &Message, seq: u64, actions: &mut Vec<SessionAction>) {
        let begin = msg.body.get(tags::BEGIN_SEQ_NO).and_then(|f| f.as_u64().ok());
        let end = msg.body.get(tags::END_SEQ_NO).and_then(|f| f.as_u64().ok());
        match (begin, end) {
            (Some(begin), Some(end)) => {
                info!(session = %self.id, begin, end, "resend requested");
                actions.push(SessionAction::Resend { begin, end });
                actions.push(SessionAction::Event(SessionEvent::ResendRequested { begin, end }));
            }
            _ => {
                let missing = if begin.is_none() {
                    tags::BEGIN_SEQ_NO
                } else {
                    tags::END_SEQ_NO
                };
                warn!(session = %self.id, tag = missing, "resend request without a valid range");
                let reject = self.build_reject(
                    seq,
                    Some(MsgType::ResendRequest.as_str()),
                    REJECT_REQUIRED_TAG_MISSING,
                    Some(missing),
                    "missing or invalid sequence range",
                );
                actions.push(SessionAction::Send(reject));
            }
        }
    }

    fn on_sequence_reset(&mut self, msg: &Message, gap_fill: bool, actions: &mut Vec<SessionAction>) {
        let Some(new_seq_no) = msg.body.get(tags::NEW_SEQ_NO).and_then(|f| f.as_u64().ok()) else {
            warn!(session = %self.id, "sequence reset without NewSeqNo ignored");
            return;
        };
        let expected = self.next_target_seq();
        if new_seq_no < expected {
            warn!(
                session = %self.id,
                new_seq_no,
                expected,
                "sequence reset to a lower number ignored"
            );
            return;
        }
        self.sequences.set_next_incoming(new_seq_no);
        info!(session = %self.id, new_seq_no, gap_fill, "inbound sequence reset");
        actions.push(SessionAction::Event(SessionEvent::SequenceReset {
            new_seq_no,
            gap_fill,
        }));
    }

    fn on_logout(&mut self, msg: &Message, actions: &mut Vec<SessionAction>) {
        let text = msg.get_str(tags::TEXT).map(str::to_string);
        if matches!(self.state, SessionState::LogoutSent { .. }) {
            info!(session = %self.id, "logout confirmed");
            self.state.disconnect();
            actions.push(SessionAction::Disconnect(DisconnectReason::LogoutCompleted));
            return;
        }

        info!(session = %self.id, ?text, "counterparty initiated logout");
        actions.push(SessionAction::Send(self.build_logout(None)));
        actions.push(SessionAction::Event(SessionEvent::LogoutReceived {
            text: text.clone(),
        }));
        self.state.disconnect();
        actions.push(SessionAction::Disconnect(
            DisconnectReason::CounterpartyLogout { text },
        ));
    }

    fn request_resend(&mut self, expected: u64, received: u64, actions: &mut Vec<SessionAction>) {
        let already_resending = matches!(self.state, SessionState::Resending { .. });
        if let Err(err) = self.state.start_resend(expected, received) {
            warn!(session = %self.id, %err, "cannot start resend");
            return;
        }
        if already_resending {
            debug!(session = %self.id, expected, received, "gap widened during resend");
            return;
        }

        warn!(session = %self.id, expected, received, "sequence gap detected, requesting resend");
        let mut request = self.new_message(MsgType::ResendRequest);
        self.stamp(&mut request);
        request.set(tags::BEGIN_SEQ_NO, expected);
        request.set(tags::END_SEQ_NO, 0u64);
        actions.push(SessionAction::Send(request));
        actions.push(SessionAction::Event(SessionEvent::GapDetected {
            begin: expected,
            end: received,
        }));
    }

    fn check_resend_complete(&mut self, actions: &mut Vec<SessionAction>) {
        if let SessionState::Resending { end, .. } = self.state
            && self.next_target_seq() > end
            && self.state.resend_complete().is_ok()
        {
            info!(session = %self.id, "sequence gap filled");
            actions.push(SessionAction::Event(SessionEvent::GapFilled));
        }
    }

    fn check_liveness(&mut self, actions: &mut Vec<SessionAction>) {
        if let SessionState::Resending { begin, end, since } = self.state
            && since.elapsed() >= self.config.resend_timeout()
        {
            warn!(session = %self.id, begin, end, "resend not completed in time");
            actions.push(SessionAction::Send(
                self.build_logout(Some("resend request not satisfied")),
            ));
            self.fail(ProtocolFatal::ResendTimeout { begin, end }, actions);
            return;
        }

        if self.heartbeat.is_timed_out() {
            let elapsed_ms = millis(self.heartbeat.time_since_last_received());
            warn!(session = %self.id, elapsed_ms, "test request unanswered");
            self.fail(ProtocolFatal::Timeout { elapsed_ms }, actions);
            return;
        }

        if self.heartbeat.should_send_test_request() {
            let id = generate_test_req_id();
            let mut request = self.new_message(MsgType::TestRequest);
            self.stamp(&mut request);
            request.set(tags::TEST_REQ_ID, id.as_str());
            debug!(session = %self.id, test_req_id = %id, "inbound silence, sending test request");
            self.heartbeat.on_test_request_sent(id);
            actions.push(SessionAction::Send(request));
            return;
        }

        if self.heartbeat.should_send_heartbeat() {
            let mut heartbeat = self.new_message(MsgType::Heartbeat);
            self.stamp(&mut heartbeat);
            actions.push(SessionAction::Send(heartbeat));
        }
    }

    fn fail(&mut self, fatal: ProtocolFatal, actions: &mut Vec<SessionAction>) {
        self.state.disconnect();
        actions.push(SessionAction::Disconnect(DisconnectReason::Fatal(fatal)));
    }

    fn build_logon(&mut self) -> Result<Message, SessionError> {
        let reset = self.config.reset_on_logon;
        if reset {
            self.sequences.reset();
        }

        let mut msg = self.new_message(MsgType::Logon);
        let seq = self.stamp(&mut msg);
        let sending_time = msg
            .header
            .get_str(tags::SENDING_TIME)
            .unwrap_or_default()
            .to_string();
        let signature = self.credentials.sign_logon(
            &sending_time,
            seq,
            self.config.target_comp_id.as_str(),
        )?;

        msg.set(tags::ENCRYPT_METHOD, 0u64);
        msg.set(tags::HEART_BT_INT, self.config.heartbeat_interval_secs());
        if reset {
            msg.set(tags::RESET_SEQ_NUM_FLAG, true);
        }
        msg.set(tags::ACCOUNT, self.credentials.portfolio_id());
        msg.set(tags::RAW_DATA, signature);
        msg.set(tags::PASSWORD, self.credentials.passphrase());
        msg.set(tags::DROP_COPY_FLAG, self.config.drop_copy_flag);
        msg.set(tags::ACCESS_KEY, self.credentials.api_key());
        Ok(msg)
    }

    fn build_logout(&mut self, text: Option<&str>) -> Message {
        let mut msg = self.new_message(MsgType::Logout);
        self.stamp(&mut msg);
        if let Some(text) = text {
            msg.set(tags::TEXT, text);
        }
        msg
    }

    /// SequenceReset-GapFill occupying `seq`, moving the peer to `new_seq_no`.
    fn gap_fill(&self, seq: u64, new_seq_no: u64) -> Message {
        let mut msg = self.new_message(MsgType::SequenceReset);
        self.stamp_header(&mut msg, seq);
        msg.header.set(tags::POSS_DUP_FLAG, true);
        msg.set(tags::GAP_FILL_FLAG, true);
        msg.set(tags::NEW_SEQ_NO, new_seq_no);
        msg
    }

    fn new_message(&self, msg_type: MsgType) -> Message {
        Message::new(&self.config.begin_string, msg_type)
    }

    /// Allocates the next MsgSeqNum and stamps the standard header.
    fn stamp(&mut self, msg: &mut Message) -> u64 {
        let seq = self.sequences.next_outgoing_seq().value();
        self.stamp_header(msg, seq);
        self.heartbeat.on_message_sent();
        seq
    }

    fn stamp_header(&self, msg: &mut Message, seq: u64) {
        msg.header
            .set(tags::SENDER_COMP_ID, self.config.sender_comp_id.as_str());
        msg.header
            .set(tags::TARGET_COMP_ID, self.config.target_comp_id.as_str());
        if let Some(ref sub_id) = self.config.sender_sub_id {
            msg.header.set(tags::SENDER_SUB_ID, sub_id.as_str());
        }
        if let Some(ref sub_id) = self.config.target_sub_id {
            msg.header.set(tags::TARGET_SUB_ID, sub_id.as_str());
        }
        msg.header.set(tags::MSG_SEQ_NUM, seq);
        msg.header.set(tags::SENDING_TIME, Timestamp::now());
    }
}

fn is_gap_fill(msg: &Message) -> bool {
    msg.body
        .get(tags::GAP_FILL_FLAG)
        .and_then(|f| f.as_bool().ok())
        .unwrap_or(false)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
