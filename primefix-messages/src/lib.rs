/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # PrimeFix Messages
//!
//! Application-level messages for the PrimeFix client.
//!
//! This crate provides:
//! - **Orders**: `OrderRequest` validation and NewOrderSingle construction
//! - **Client order IDs**: Process-unique `ClOrdIdGenerator`
//! - **Execution reports**: Typed parsing of inbound Execution Reports

pub mod execution;
pub mod order;

pub use execution::{ExecutionReport, parse_execution_report};
pub use order::{ClOrdIdGenerator, OrderRequest, build_order};
