/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Client-side session runtime.
//!
//! [`Initiator::run`] connects, drives the [`Session`] state machine from a
//! single task and reconnects with backoff until it is shut down, the
//! session logs out, or the reconnect budget is spent.

use crate::application::Application;
use crate::handle::{Command, SessionHandle};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use primefix_core::error::SessionError;
use primefix_core::message::{Message, MsgType};
use primefix_messages::{ClOrdIdGenerator, parse_execution_report};
use primefix_session::{
    Credentials, DisconnectReason, ReconnectPolicy, Session, SessionAction, SessionConfig,
    SessionEvent, SessionId,
};
use primefix_store::MessageStore;
use primefix_tagvalue::encode;
use primefix_transport::{Connector, FixCodec};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default period of the session timer.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Default capacity of the command queue behind [`SessionHandle`].
pub const DEFAULT_COMMAND_BUFFER: usize = 1024;

type Transport<C> = Framed<<C as Connector>::Stream, FixCodec>;

/// How one connection ended.
struct Outcome {
    reason: DisconnectReason,
    reached_active: bool,
}

impl Outcome {
    const fn new(reason: DisconnectReason, reached_active: bool) -> Self {
        Self {
            reason,
            reached_active,
        }
    }
}

/// FIX initiator driving one session over reconnects.
pub struct Initiator<A, C, S> {
    session: Session,
    reconnect: ReconnectPolicy,
    connector: C,
    store: Arc<S>,
    application: Arc<A>,
    handle: SessionHandle,
    commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,
    tick_interval: Duration,
}

impl<A, C, S> Initiator<A, C, S>
where
    A: Application,
    C: Connector,
    S: MessageStore,
{
    /// Creates an initiator resuming from the sequence numbers in `store`.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        credentials: Credentials,
        connector: C,
        store: S,
        application: Arc<A>,
    ) -> Self {
        let session = Session::with_sequences(
            config,
            credentials,
            store.next_sender_seq(),
            store.next_target_seq(),
        );
        let (tx, commands) = mpsc::channel(DEFAULT_COMMAND_BUFFER);
        let handle = SessionHandle::new(
            session.id().clone(),
            tx,
            Arc::new(ClOrdIdGenerator::new()),
        );
        Self {
            session,
            reconnect: ReconnectPolicy::default(),
            connector,
            store: Arc::new(store),
            application,
            handle,
            commands,
            cancel: CancellationToken::new(),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Sets the reconnect policy.
    #[must_use]
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Sets the period of the session timer.
    #[must_use]
    pub const fn with_tick_interval(mut self, tick: Duration) -> Self {
        self.tick_interval = tick;
        self
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        self.session.id()
    }

    /// Returns a handle for sending orders.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Returns a token that shuts the initiator down when cancelled.
    ///
    /// An active session logs out first.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns the message store.
    #[must_use]
    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    /// Runs the session until shutdown, logout, or a terminal failure.
    ///
    /// # Errors
    /// Returns `SessionError::Fatal` if the Logon is rejected,
    /// `SessionError::Configuration` if the Logon cannot be built, and
    /// `SessionError::Connection` once the reconnect policy gives up.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let id = self.session.id().clone();
        self.application.on_create(&id).await;
        info!(session = %id, remote = %self.connector.remote(), "initiator started");

        let mut attempt: u32 = 0;
        loop {
            let outcome = self.connect_once(&id).await?;
            self.application.on_disconnected(&id, &outcome.reason).await;

            if !outcome.reason.is_retryable() {
                return match outcome.reason {
                    DisconnectReason::Fatal(fatal) => {
                        error!(session = %id, %fatal, "session terminated");
                        Err(fatal.into())
                    }
                    reason => {
                        info!(session = %id, %reason, "initiator stopped");
                        Ok(())
                    }
                };
            }

            attempt = if outcome.reached_active { 1 } else { attempt + 1 };
            if self.reconnect.is_exhausted(attempt) {
                error!(session = %id, reason = %outcome.reason, "reconnect attempts exhausted");
                return Err(SessionError::Connection(format!(
                    "reconnect attempts exhausted, last failure: {}",
                    outcome.reason
                )));
            }

            let delay = self.reconnect.delay_for(attempt);
            warn!(
                session = %id,
                reason = %outcome.reason,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "connection lost, reconnecting"
            );
            tokio::select! {
                () = self.cancel.cancelled() => {
                    info!(session = %id, "shutdown during reconnect backoff");
                    return Ok(());
                }
                () = sleep(delay) => {}
            }
        }
    }

    async fn connect_once(&mut self, id: &SessionId) -> Result<Outcome, SessionError> {
        if self.cancel.is_cancelled() {
            return Ok(Outcome::new(DisconnectReason::Shutdown, false));
        }
        self.session.on_connecting()?;
        info!(session = %id, remote = %self.connector.remote(), "connecting");

        let stream = tokio::select! {
            () = self.cancel.cancelled() => {
                self.session.on_disconnected();
                return Ok(Outcome::new(DisconnectReason::Shutdown, false));
            }
            result = self.connector.connect() => match result {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(session = %id, %err, "connect failed");
                    self.session.on_disconnected();
                    return Ok(Outcome::new(DisconnectReason::TransportError(err.to_string()), false));
                }
            }
        };

        let config = self.session.config();
        let codec = FixCodec::new()
            .with_max_message_size(config.max_message_size)
            .with_strict(config.strict_decoding);
        let reset = config.reset_on_logon;
        let mut transport = Framed::new(stream, codec);

        if reset && let Err(err) = self.store.reset().await {
            error!(session = %id, %err, "store reset failed");
            self.session.on_disconnected();
            return Ok(Outcome::new(
                DisconnectReason::StoreFailure(err.to_string()),
                false,
            ));
        }

        let actions = match self.session.on_connected() {
            Ok(actions) => actions,
            Err(err) => {
                self.session.on_disconnected();
                return Err(err);
            }
        };

        let mut reached_active = false;
        let reason = match self
            .execute(&mut transport, actions, &mut reached_active)
            .await
        {
            Some(reason) => reason,
            None => self.drive(&mut transport, &mut reached_active).await,
        };

        self.session.on_disconnected();
        if let Err(err) = SinkExt::<Bytes>::close(&mut transport).await {
            debug!(session = %id, %err, "transport close failed");
        }
        info!(session = %id, %reason, "disconnected");
        Ok(Outcome::new(reason, reached_active))
    }

    /// Multiplexes inbound frames, commands, timer ticks and shutdown.
    async fn drive(
        &mut self,
        transport: &mut Transport<C>,
        reached_active: &mut bool,
    ) -> DisconnectReason {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut logging_out = false;

        loop {
            let accepting = self.session.state().is_established() && !logging_out;
            let actions = tokio::select! {
                () = self.cancel.cancelled(), if !logging_out => {
                    logging_out = true;
                    if !self.session.state().is_established() {
                        return DisconnectReason::Shutdown;
                    }
                    match self.session.initiate_logout(Some("client shutdown")) {
                        Ok(actions) => actions,
                        Err(_) => return DisconnectReason::Shutdown,
                    }
                }
                frame = transport.next() => match frame {
                    Some(Ok(Ok(msg))) => self.session.on_message(msg),
                    Some(Ok(Err(err))) => {
                        warn!(session = %self.session.id(), %err, "dropping undecodable frame");
                        continue;
                    }
                    Some(Err(err)) => return DisconnectReason::TransportError(err.to_string()),
                    None => return DisconnectReason::TransportClosed,
                },
                Some(command) = self.commands.recv(), if accepting => {
                    self.on_command(command, &mut logging_out)
                }
                _ = ticker.tick() => self.session.on_timer(),
            };

            if let Some(reason) = self.execute(transport, actions, reached_active).await {
                return reason;
            }
        }
    }

    fn on_command(&mut self, command: Command, logging_out: &mut bool) -> Vec<SessionAction> {
        match command {
            Command::Send(msg) => match self.session.send_app(msg) {
                Ok(stamped) => vec![SessionAction::Send(stamped)],
                Err(err) => {
                    warn!(session = %self.session.id(), %err, "outbound message dropped");
                    Vec::new()
                }
            },
            Command::Logout(text) => match self.session.initiate_logout(text.as_deref()) {
                Ok(actions) => {
                    *logging_out = true;
                    actions
                }
                Err(err) => {
                    warn!(session = %self.session.id(), %err, "logout request ignored");
                    Vec::new()
                }
            },
        }
    }

    /// Carries out session actions in order.
    ///
    /// Returns the reason to drop the connection, if any.
    async fn execute(
        &mut self,
        transport: &mut Transport<C>,
        actions: Vec<SessionAction>,
        reached_active: &mut bool,
    ) -> Option<DisconnectReason> {
        let mut queue = VecDeque::from(actions);
        while let Some(action) = queue.pop_front() {
            match action {
                SessionAction::Send(msg) => {
                    if let Err(reason) = self.transmit(transport, &msg, true).await {
                        return Some(reason);
                    }
                }
                SessionAction::Deliver(msg) => {
                    if let Some(reject) = self.deliver(msg).await {
                        queue.push_front(SessionAction::Send(reject));
                    }
                }
                SessionAction::Resend { begin, end } => {
                    if let Err(reason) = self.resend(transport, begin, end).await {
                        return Some(reason);
                    }
                }
                SessionAction::Event(event) => self.notify(event, reached_active).await,
                SessionAction::Disconnect(reason) => {
                    if let Err(failure) = self.persist_sequences().await {
                        warn!(session = %self.session.id(), %failure, "sequence numbers not persisted");
                    }
                    return Some(reason);
                }
            }
        }
        self.persist_sequences().await.err()
    }

    /// Encodes, persists and writes one message.
    ///
    /// The frame and the sequence numbers are durable before any byte
    /// reaches the transport. Replayed messages are not stored again.
    /// A message that fails to encode has already taken its MsgSeqNum, so
    /// the advanced sequences are persisted and the connection is dropped;
    /// the hole is gap-filled when the counterparty asks for it.
    async fn transmit(
        &self,
        transport: &mut Transport<C>,
        msg: &Message,
        persist: bool,
    ) -> Result<(), DisconnectReason> {
        let id = self.session.id();
        let frame = match encode(msg) {
            Ok(frame) => frame,
            Err(err) => {
                error!(session = %id, %err, %msg, "cannot encode outbound message");
                if persist {
                    self.persist_sequences().await?;
                }
                return Err(DisconnectReason::EncodeFailure(err.to_string()));
            }
        };

        if persist {
            if let Some(seq) = msg.seq_num() {
                self.store
                    .store(seq, &frame)
                    .await
                    .map_err(|err| DisconnectReason::StoreFailure(err.to_string()))?;
            }
            self.persist_sequences().await?;
        }

        debug!(session = %id, %msg, "sending");
        transport
            .send(frame)
            .await
            .map_err(|err| DisconnectReason::TransportError(err.to_string()))
    }

    async fn resend(
        &mut self,
        transport: &mut Transport<C>,
        begin: u64,
        end: u64,
    ) -> Result<(), DisconnectReason> {
        let stored = match self.store.get_range(begin, end).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(session = %self.session.id(), %err, "stored messages unavailable, gap-filling");
                Vec::new()
            }
        };
        let replay = self.session.build_resend(begin, end, &stored);
        for msg in &replay {
            self.transmit(transport, msg, false).await?;
        }
        Ok(())
    }

    /// Hands an application message to the application.
    ///
    /// Returns a Reject to send if the application refused it.
    async fn deliver(&mut self, msg: Message) -> Option<Message> {
        let id = self.session.id().clone();
        if let Err(reason) = self.application.from_app(&msg, &id).await {
            warn!(session = %id, code = reason.code, text = %reason.text, "inbound message rejected");
            let msg_type = msg.msg_type();
            return Some(self.session.build_reject(
                msg.seq_num().unwrap_or_default(),
                msg_type.as_ref().map(MsgType::as_str),
                reason.code,
                reason.ref_tag,
                &reason.text,
            ));
        }

        if msg.msg_type() == Some(MsgType::ExecutionReport) {
            match parse_execution_report(&msg) {
                Ok(report) => {
                    info!(
                        session = %id,
                        order_id = %report.order_id,
                        cl_ord_id = %report.cl_ord_id,
                        exec_type = %report.exec_type,
                        "execution report"
                    );
                    self.application.on_execution_report(&id, report).await;
                }
                Err(err) => warn!(session = %id, %err, "dropping unparsable execution report"),
            }
        }
        None
    }

    async fn notify(&self, event: SessionEvent, reached_active: &mut bool) {
        let id = self.session.id();
        self.application.on_event(id, &event).await;
        if event == SessionEvent::Active {
            *reached_active = true;
            self.application.on_active(id, &self.handle).await;
        }
    }

    async fn persist_sequences(&self) -> Result<(), DisconnectReason> {
        let sender = self.session.next_sender_seq();
        let target = self.session.next_target_seq();
        if self.store.next_sender_seq() != sender {
            self.store
                .set_next_sender_seq(sender)
                .await
                .map_err(|err| DisconnectReason::StoreFailure(err.to_string()))?;
        }
        if self.store.next_target_seq() != target {
            self.store
                .set_next_target_seq(target)
                .await
                .map_err(|err| DisconnectReason::StoreFailure(err.to_string()))?;
        }
        Ok(())
    }
}

impl<A, C, S> std::fmt::Debug for Initiator<A, C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Initiator")
            .field("session", &self.session.id())
            .field("state", &self.session.state())
            .field("reconnect", &self.reconnect)
            .finish_non_exhaustive()
    }
}
