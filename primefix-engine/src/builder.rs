/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Engine builder for fluent configuration.
//!
//! This module provides a builder API for assembling an [`Initiator`].

use crate::application::{Application, NoOpApplication};
use crate::initiator::{DEFAULT_TICK_INTERVAL, Initiator};
use primefix_core::error::SessionError;
use primefix_session::{ConnectionConfig, Credentials, ReconnectPolicy, SessionConfig, SessionId};
use primefix_store::{FileStore, MemoryStore, MessageStore};
use primefix_transport::{Connector, TcpConnector};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Builder for configuring a FIX initiator.
#[derive(Debug)]
pub struct EngineBuilder<A: Application = NoOpApplication> {
    /// Application callback handler.
    application: Arc<A>,
    /// Session configuration.
    session: Option<SessionConfig>,
    /// Venue credentials.
    credentials: Option<Credentials>,
    /// Host, port and connect timeout.
    connection: Option<ConnectionConfig>,
    /// Reconnect policy overriding the connection's.
    reconnect: Option<ReconnectPolicy>,
    /// Session timer period.
    tick_interval: Duration,
}

impl Default for EngineBuilder<NoOpApplication> {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder<NoOpApplication> {
    /// Creates a new engine builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            application: Arc::new(NoOpApplication),
            session: None,
            credentials: None,
            connection: None,
            reconnect: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Creates a builder from the process environment.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` naming the first missing or
    /// invalid variable.
    pub fn from_env() -> Result<Self, SessionError> {
        Ok(Self::new()
            .with_session(SessionConfig::from_env()?)
            .with_credentials(Credentials::from_env()?)
            .with_connection(ConnectionConfig::from_env()?))
    }
}

impl<A: Application> EngineBuilder<A> {
    /// Sets the application callback handler.
    #[must_use]
    pub fn with_application<B: Application>(self, application: B) -> EngineBuilder<B> {
        EngineBuilder {
            application: Arc::new(application),
            session: self.session,
            credentials: self.credentials,
            connection: self.connection,
            reconnect: self.reconnect,
            tick_interval: self.tick_interval,
        }
    }

    /// Sets the session configuration.
    #[must_use]
    pub fn with_session(mut self, config: SessionConfig) -> Self {
        self.session = Some(config);
        self
    }

    /// Sets the credentials used to sign the Logon.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets host, port, connect timeout and reconnect policy.
    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Overrides the reconnect policy.
    #[must_use]
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = Some(policy);
        self
    }

    /// Sets the period of the session timer.
    #[must_use]
    pub fn with_tick_interval(mut self, tick: Duration) -> Self {
        self.tick_interval = tick;
        self
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn session(&self) -> Option<&SessionConfig> {
        self.session.as_ref()
    }

    /// Returns the connection configuration.
    #[must_use]
    pub fn connection(&self) -> Option<&ConnectionConfig> {
        self.connection.as_ref()
    }

    /// Returns the reconnect policy the initiator will use.
    #[must_use]
    pub fn reconnect(&self) -> ReconnectPolicy {
        self.reconnect
            .clone()
            .or_else(|| self.connection.as_ref().map(|c| c.reconnect.clone()))
            .unwrap_or_default()
    }

    /// Returns the application handler.
    #[must_use]
    pub fn application(&self) -> Arc<A> {
        Arc::clone(&self.application)
    }

    /// Builds an initiator over a custom connector and store.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if the session configuration
    /// or the credentials are missing, or the session configuration is invalid.
    pub fn build_with<C, S>(self, connector: C, store: S) -> Result<Initiator<A, C, S>, SessionError>
    where
        C: Connector,
        S: MessageStore,
    {
        let reconnect = self.reconnect();
        let session = self.session.ok_or_else(|| missing("session configuration"))?;
        session.validate()?;
        let credentials = self.credentials.ok_or_else(|| missing("credentials"))?;
        Ok(
            Initiator::new(session, credentials, connector, store, self.application)
                .with_reconnect(reconnect)
                .with_tick_interval(self.tick_interval),
        )
    }

    /// Builds a TCP initiator with an in-memory store.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if any configuration is missing.
    pub fn build(self) -> Result<Initiator<A, TcpConnector, MemoryStore>, SessionError> {
        let connector = self.tcp_connector()?;
        self.build_with(connector, MemoryStore::new())
    }

    /// Builds a TCP initiator persisting to a [`FileStore`] under `dir`.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if any configuration is missing
    /// or the store cannot be opened.
    pub async fn build_with_file_store(
        self,
        dir: impl AsRef<Path>,
    ) -> Result<Initiator<A, TcpConnector, FileStore>, SessionError> {
        let connector = self.tcp_connector()?;
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| missing("session configuration"))?;
        let name = SessionId::from_config(session).to_string();
        let store = FileStore::open(dir, &name).await.map_err(|err| {
            SessionError::Configuration(format!("cannot open message store: {err}"))
        })?;
        self.build_with(connector, store)
    }

    fn tcp_connector(&self) -> Result<TcpConnector, SessionError> {
        let connection = self
            .connection
            .as_ref()
            .ok_or_else(|| missing("connection configuration"))?;
        Ok(
            TcpConnector::new(connection.host.as_str(), connection.port)
                .with_connect_timeout(connection.connect_timeout),
        )
    }
}

fn missing(what: &str) -> SessionError {
    SessionError::Configuration(format!("{what} is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use primefix_core::types::CompId;

    fn session() -> SessionConfig {
        SessionConfig::new(
            CompId::new("CLIENT").unwrap(),
            CompId::new("COIN").unwrap(),
            "FIX.4.2",
        )
    }

    fn credentials() -> Credentials {
        Credentials::new("key", "secret", "pass", "portfolio")
    }

    #[test]
    fn test_engine_builder_default() {
        let builder = EngineBuilder::new();
        assert!(builder.session().is_none());
        assert!(builder.connection().is_none());
        assert_eq!(builder.reconnect(), ReconnectPolicy::default());
    }

    #[test]
    fn test_reconnect_override_wins() {
        let builder = EngineBuilder::new()
            .with_connection(
                ConnectionConfig::new("localhost", 4198)
                    .with_reconnect(ReconnectPolicy::default().with_max_attempts(None)),
            )
            .with_reconnect(ReconnectPolicy::disabled());
        assert_eq!(builder.reconnect(), ReconnectPolicy::disabled());
    }

    #[tokio::test]
    async fn test_build_requires_configuration() {
        let err = EngineBuilder::new()
            .with_session(session())
            .with_credentials(credentials())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::Configuration("connection configuration is not set".to_string())
        );

        let err = EngineBuilder::new()
            .with_session(session())
            .with_connection(ConnectionConfig::new("localhost", 4198))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::Configuration("credentials is not set".to_string())
        );
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_heartbeat_interval() {
        let mut config = session();
        config.heartbeat_interval = Duration::from_millis(250);
        let err = EngineBuilder::new()
            .with_session(config)
            .with_credentials(credentials())
            .with_connection(ConnectionConfig::new("localhost", 4198))
            .build()
            .unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_build_initiator() {
        let initiator = EngineBuilder::new()
            .with_session(session())
            .with_credentials(credentials())
            .with_connection(ConnectionConfig::new("localhost", 4198))
            .build()
            .unwrap();
        assert_eq!(initiator.session_id().to_string(), "FIX.4.2:CLIENT->COIN");
        assert!(!initiator.handle().is_closed());
    }

    #[tokio::test]
    async fn test_build_with_file_store_resumes_sequences() {
        let dir = tempfile::tempdir().unwrap();
        let builder = || {
            EngineBuilder::new()
                .with_session(session())
                .with_credentials(credentials())
                .with_connection(ConnectionConfig::new("localhost", 4198))
        };

        let initiator = builder().build_with_file_store(dir.path()).await.unwrap();
        initiator.store().set_next_sender_seq(9).await.unwrap();
        drop(initiator);

        let initiator = builder().build_with_file_store(dir.path()).await.unwrap();
        assert_eq!(initiator.store().next_sender_seq(), 9);
    }
}
