/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # PrimeFix Store
//!
//! Message persistence and storage for the PrimeFix FIX client.
//!
//! This crate provides:
//! - **MessageStore trait**: Abstract interface for message storage
//! - **MemoryStore**: In-memory message store for testing and reset-on-logon sessions
//! - **FileStore**: File-based persistent message store

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::MessageStore;
