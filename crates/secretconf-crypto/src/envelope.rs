//! Self-describing ciphertext container shared by every scheme.
//!
//! On the wire an envelope is compact JSON with base64url (unpadded) binary
//! fields:
//!
//! ```text
//! {"version":1,
//!  "params":{"scheme":"password","kdf":{"m_cost":19456,"t_cost":2,"p_cost":1},"salt":"…"},
//!  "nonce":"…","ciphertext":"…","tag":"…"}
//! ```
//!
//! The version and every scheme parameter are bound into the AEAD associated
//! data, so editing the header fails authentication just like editing the
//! ciphertext.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{error::CryptoError, kdf::KdfParams};

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Largest payload any scheme will encrypt or decrypt (1 GiB).
pub const MAX_PAYLOAD_LEN: usize = 1 << 30;

const AAD_DOMAIN: &[u8] = b"secretconf-envelope";

/// Identifies which scheme sealed an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeId {
    Password,
    Symmetric,
    Asymmetric,
}

impl SchemeId {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemeId::Password => "password",
            SchemeId::Symmetric => "symmetric",
            SchemeId::Asymmetric => "asymmetric",
        }
    }

    /// Advisory file-name suffix, e.g. `app.json.pwenc`.
    pub fn file_suffix(self) -> &'static str {
        match self {
            SchemeId::Password => "pwenc",
            SchemeId::Symmetric => "symenc",
            SchemeId::Asymmetric => "pkenc",
        }
    }
}

impl fmt::Display for SchemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheme tag plus whatever that scheme needs to rebuild the payload key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum SchemeParams {
    /// Argon2id parameters and the salt used for this envelope.
    Password { kdf: KdfParams, salt: Bytes },
    /// Pre-shared key; nothing beyond the key itself is needed.
    Symmetric,
    /// Sender's ephemeral X25519 public key and the data key sealed under the
    /// key-agreement output (`nonce || ciphertext || tag`).
    Asymmetric { ephemeral_key: Bytes, wrapped_key: Bytes },
}

impl SchemeParams {
    pub fn scheme(&self) -> SchemeId {
        match self {
            SchemeParams::Password { .. } => SchemeId::Password,
            SchemeParams::Symmetric => SchemeId::Symmetric,
            SchemeParams::Asymmetric { .. } => SchemeId::Asymmetric,
        }
    }
}

/// Binary field carried as base64url text.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes(bytes)
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes(len={})", self.0.len())
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        URL_SAFE_NO_PAD
            .decode(text.as_bytes())
            .map(Bytes)
            .map_err(de::Error::custom)
    }
}

/// A sealed configuration blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub version: u8,
    pub params: SchemeParams,
    pub nonce: Bytes,
    pub ciphertext: Bytes,
    pub tag: Bytes,
}

impl Envelope {
    pub fn scheme(&self) -> SchemeId {
        self.params.scheme()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        serde_json::to_vec(self).map_err(|e| CryptoError::Encryption {
            reason: format!("envelope encoding failed: {e}"),
        })
    }

    /// Parse an envelope. Anything unreadable is reported as a decryption
    /// failure so malformed and tampered input look the same.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let envelope: Envelope =
            serde_json::from_slice(bytes).map_err(|_| CryptoError::Decryption)?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(CryptoError::Decryption);
        }
        Ok(envelope)
    }

    /// Which scheme sealed `bytes`, or `None` when they are not an envelope.
    pub fn detect(bytes: &[u8]) -> Option<SchemeId> {
        Self::from_bytes(bytes).ok().map(|envelope| envelope.scheme())
    }

    pub(crate) fn expect_scheme(&self, expected: SchemeId) -> Result<(), CryptoError> {
        let found = self.scheme();
        if found != expected {
            return Err(CryptoError::SchemeMismatch { expected, found });
        }
        Ok(())
    }

    pub(crate) fn associated_data(&self) -> Vec<u8> {
        associated_data(self.version, &self.params)
    }
}

/// Length-prefixed encoding of the envelope header, used as AEAD associated data.
pub(crate) fn associated_data(version: u8, params: &SchemeParams) -> Vec<u8> {
    let mut aad = Vec::with_capacity(96);
    push_field(&mut aad, AAD_DOMAIN);
    aad.push(version);
    push_field(&mut aad, params.scheme().as_str().as_bytes());
    match params {
        SchemeParams::Password { kdf, salt } => {
            aad.extend_from_slice(&kdf.m_cost.to_be_bytes());
            aad.extend_from_slice(&kdf.t_cost.to_be_bytes());
            aad.extend_from_slice(&kdf.p_cost.to_be_bytes());
            push_field(&mut aad, salt.as_slice());
        }
        SchemeParams::Symmetric => {}
        SchemeParams::Asymmetric {
            ephemeral_key,
            wrapped_key,
        } => {
            push_field(&mut aad, ephemeral_key.as_slice());
            push_field(&mut aad, wrapped_key.as_slice());
        }
    }
    aad
}

fn push_field(buf: &mut Vec<u8>, field: &[u8]) {
    buf.extend_from_slice(&(field.len() as u32).to_be_bytes());
    buf.extend_from_slice(field);
}

/// Reject payloads above [`MAX_PAYLOAD_LEN`].
pub(crate) fn check_payload(len: usize) -> Result<(), CryptoError> {
    if len > MAX_PAYLOAD_LEN {
        return Err(CryptoError::PayloadTooLarge {
            len,
            max: MAX_PAYLOAD_LEN,
        });
    }
    Ok(())
}
