/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # PrimeFix Engine
//!
//! Session runtime for the PrimeFix client.
//!
//! This crate provides:
//! - **Initiator**: Connects, logs on, drives the session and reconnects with backoff
//! - **Application trait**: Observer interface for session events and execution reports
//! - **Session handle**: Cloneable sender for orders and logout requests
//! - **Builder API**: Fluent configuration for engine setup

pub mod application;
pub mod builder;
pub mod handle;
pub mod initiator;

pub use application::{Application, NoOpApplication, RejectReason};
pub use builder::EngineBuilder;
pub use handle::SessionHandle;
pub use initiator::Initiator;
