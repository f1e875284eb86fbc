/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Logon authentication.
//!
//! The venue authenticates a Logon with an HMAC-SHA256 signature carried in
//! RawData (96). The signed string is the plain concatenation
//! `timestamp + msg_type + seq_num + api_key + target_comp_id + passphrase`,
//! keyed by the API secret, and the digest is sent base64 encoded.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use primefix_core::error::SessionError;
use sha2::Sha256;
use std::fmt;

use crate::config::required;

type HmacSha256 = Hmac<Sha256>;

/// Computes the Logon signature.
///
/// # Errors
/// Returns `SessionError::Configuration` if the secret cannot key the MAC.
pub fn sign(
    timestamp: &str,
    msg_type: &str,
    seq_num: &str,
    api_key: &str,
    target_comp_id: &str,
    passphrase: &str,
    secret: &str,
) -> Result<String, SessionError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SessionError::Configuration("signing key rejected by HMAC".into()))?;
    for part in [timestamp, msg_type, seq_num, api_key, target_comp_id, passphrase] {
        mac.update(part.as_bytes());
    }
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// API credentials for the venue.
///
/// None of the values are ever printed: `Debug` redacts them and the type
/// does not implement `Serialize`.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
    passphrase: String,
    portfolio_id: String,
}

impl Credentials {
    /// Creates a credential set.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        passphrase: impl Into<String>,
        portfolio_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            passphrase: passphrase.into(),
            portfolio_id: portfolio_id.into(),
        }
    }

    /// Loads `ACCESS_KEY`, `SIGNING_KEY`, `PASSPHRASE` and `PORTFOLIO_ID`
    /// from the process environment.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` naming the first missing variable.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the credentials through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` naming the first missing variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SessionError> {
        Ok(Self {
            api_key: required(&lookup, "ACCESS_KEY")?,
            api_secret: required(&lookup, "SIGNING_KEY")?,
            passphrase: required(&lookup, "PASSPHRASE")?,
            portfolio_id: required(&lookup, "PORTFOLIO_ID")?,
        })
    }

    /// Returns the API key sent as AccessKey (9407).
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the passphrase sent as Password (554).
    #[must_use]
    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// Returns the portfolio ID sent as Account (1).
    #[must_use]
    pub fn portfolio_id(&self) -> &str {
        &self.portfolio_id
    }

    /// Signs a Logon with these credentials.
    ///
    /// # Arguments
    /// * `sending_time` - The Logon's SendingTime (52)
    /// * `seq_num` - The Logon's MsgSeqNum (34)
    /// * `target_comp_id` - The Logon's TargetCompID (56)
    ///
    /// # Errors
    /// See [`sign`].
    pub fn sign_logon(
        &self,
        sending_time: &str,
        seq_num: u64,
        target_comp_id: &str,
    ) -> Result<String, SessionError> {
        let mut seq = itoa::Buffer::new();
        sign(
            sending_time,
            "A",
            seq.format(seq_num),
            &self.api_key,
            target_comp_id,
            &self.passphrase,
            &self.api_secret,
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .field("passphrase", &"***")
            .field("portfolio_id", &"***")
            .finish()
    }
}
