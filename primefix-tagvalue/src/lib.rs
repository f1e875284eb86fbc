/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # PrimeFix Tag-Value
//!
//! FIX tag=value encoding and decoding for the PrimeFix client.
//!
//! Frames use SOH (0x01) delimiters with BeginString, BodyLength and MsgType
//! leading and CheckSum closing each message.
//!
//! ## Features
//!
//! - **Validated decoding**: BodyLength and CheckSum are checked on every frame
//! - **Fast scanning**: Uses `memchr` for delimiter search
//! - **Strict mode**: Optionally rejects tags outside the known catalog

pub mod checksum;
pub mod decoder;
pub mod encoder;

pub use checksum::calculate_checksum;
pub use decoder::{Decoder, decode};
pub use encoder::{Encoder, encode};
