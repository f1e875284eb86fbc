/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Cloneable handle for submitting work to a running session.

use primefix_core::error::{FixError, SessionError};
use primefix_core::message::Message;
use primefix_core::tags;
use primefix_messages::{ClOrdIdGenerator, OrderRequest, build_order};
use primefix_session::SessionId;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Work queued for the session task.
#[derive(Debug)]
pub(crate) enum Command {
    /// Stamp and send an application message.
    Send(Message),
    /// Start a logout.
    Logout(Option<String>),
}

/// Sends orders and commands to the session task.
///
/// Commands are queued and picked up once the session is active; sending
/// never waits for the wire, so it is safe to call from inside
/// [`Application`](crate::Application) callbacks.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    commands: mpsc::Sender<Command>,
    ids: Arc<ClOrdIdGenerator>,
}

impl SessionHandle {
    pub(crate) fn new(
        session_id: SessionId,
        commands: mpsc::Sender<Command>,
        ids: Arc<ClOrdIdGenerator>,
    ) -> Self {
        Self {
            session_id,
            commands,
            ids,
        }
    }

    /// Returns the session this handle feeds.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Validates and queues a New Order Single.
    ///
    /// # Returns
    /// The ClOrdID the order was sent with.
    ///
    /// # Errors
    /// Returns `FixError::Validation` for a bad request, or
    /// `FixError::Session` if the session task has stopped.
    pub async fn send_order(&self, request: &OrderRequest) -> Result<String, FixError> {
        let msg = build_order(request, &self.ids)?;
        let cl_ord_id = msg.get_str(tags::CL_ORD_ID).unwrap_or_default().to_string();
        self.send(msg).await?;
        Ok(cl_ord_id)
    }

    /// Queues an arbitrary application message.
    ///
    /// # Errors
    /// Returns `FixError::Session` if the session task has stopped.
    pub async fn send(&self, msg: Message) -> Result<(), FixError> {
        self.commands
            .send(Command::Send(msg))
            .await
            .map_err(|_| closed())
    }

    /// Requests a logout; the initiator stops once it completes.
    ///
    /// # Errors
    /// Returns `FixError::Session` if the session task has stopped.
    pub async fn logout(&self, text: Option<&str>) -> Result<(), FixError> {
        self.commands
            .send(Command::Logout(text.map(str::to_string)))
            .await
            .map_err(|_| closed())
    }

    /// Returns true once the session task has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

fn closed() -> FixError {
    SessionError::Connection("session task has stopped".to_string()).into()
}
