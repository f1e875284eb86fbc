/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # PrimeFix
//!
//! A FIX 4.2 order entry client for Coinbase Prime.
//!
//! PrimeFix logs on with an HMAC-signed Logon, keeps the session alive with
//! heartbeats and test requests, recovers sequence gaps in both directions
//! and reconnects with exponential backoff. Orders go out as
//! NewOrderSingle and fills come back as typed execution reports.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use primefix::prelude::*;
//!
//! let initiator = EngineBuilder::from_env()?
//!     .with_application(MyApplication)
//!     .build()?;
//! let handle = initiator.handle();
//! tokio::spawn(initiator.run());
//!
//! let order = OrderRequest::limit("ETH-USD", Side::Buy, qty, price, "portfolio");
//! let cl_ord_id = handle.send_order(&order).await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: Messages, fields, tags, value types and errors
//! - [`tagvalue`]: Tag=value encoding and decoding
//! - [`session`]: Sans-IO session state machine
//! - [`store`]: Sequence and outbound message persistence
//! - [`transport`]: Framing codec and TCP connector
//! - [`messages`]: Order construction and execution report parsing
//! - [`engine`]: Async initiator and application callbacks

pub mod core {
    //! Messages, fields, tags, value types and errors.
    pub use primefix_core::*;
}

pub mod tagvalue {
    //! Tag=value encoding and decoding.
    pub use primefix_tagvalue::*;
}

pub mod session {
    //! Sans-IO session state machine.
    pub use primefix_session::*;
}

pub mod store {
    //! Sequence and outbound message persistence.
    pub use primefix_store::*;
}

pub mod transport {
    //! Framing codec and TCP connector.
    pub use primefix_transport::*;
}

pub mod messages {
    //! Order construction and execution report parsing.
    pub use primefix_messages::*;
}

pub mod engine {
    //! Async initiator and application callbacks.
    pub use primefix_engine::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use primefix_core::{
        CompId, ExecType, FixError, Message, MsgType, OrdStatus, OrdType, ProtocolFatal, Result,
        SessionError, Side, TimeInForce, Timestamp,
    };

    // Session
    pub use primefix_session::{
        ConnectionConfig, Credentials, DisconnectReason, ReconnectPolicy, SessionConfig,
        SessionEvent, SessionId,
    };

    // Store
    pub use primefix_store::{FileStore, MemoryStore, MessageStore};

    // Messages
    pub use primefix_messages::{ExecutionReport, OrderRequest};

    // Engine
    pub use primefix_engine::{
        Application, EngineBuilder, Initiator, NoOpApplication, RejectReason, SessionHandle,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let _ts = Timestamp::now();
        let _side = Side::Buy;
        let _policy = ReconnectPolicy::default();
        assert!(CompId::new("CLIENT").is_some());
    }

    #[test]
    fn test_builder_from_prelude() {
        let builder = EngineBuilder::new();
        assert!(builder.session().is_none());
        assert_eq!(builder.reconnect(), ReconnectPolicy::default());
    }
}
