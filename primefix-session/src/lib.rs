/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # PrimeFix Session
//!
//! FIX 4.2 session layer for the PrimeFix client.
//!
//! This crate provides:
//! - **Session**: Sans-IO protocol engine driven by inbound messages and timer ticks
//! - **State machine**: Runtime session lifecycle states
//! - **Sequence management**: Atomic sequence number handling
//! - **Heartbeat handling**: Heartbeat/TestRequest liveness logic
//! - **Authentication**: HMAC-SHA256 Logon signing and credential handling
//! - **Configuration**: Session, connection and reconnect options

pub mod auth;
pub mod config;
pub mod heartbeat;
pub mod sequence;
pub mod session;
pub mod state;

pub use auth::{Credentials, sign};
pub use config::{ConnectionConfig, ReconnectPolicy, SessionConfig, SessionConfigBuilder};
pub use heartbeat::HeartbeatManager;
pub use sequence::SequenceManager;
pub use session::{DisconnectReason, Session, SessionAction, SessionEvent, SessionId};
pub use state::SessionState;
