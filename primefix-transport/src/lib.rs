/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # PrimeFix Transport
//!
//! Network transport layer for the PrimeFix FIX client.
//!
//! This crate provides:
//! - **Codec**: Tokio codec that frames the byte stream into decoded messages
//! - **Connector**: Pluggable connection establishment, with a TCP implementation
//!
//! TLS is not bundled; wrap the stream in a custom [`Connector`] or use a
//! local tunnel.

pub mod codec;
pub mod connector;

pub use codec::{CodecError, FixCodec};
pub use connector::{Connector, TcpConnector};
