use std::fmt;

use thiserror::Error;

use crate::envelope::SchemeId;

/// The kinds of key material a scheme can be handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Password,
    Symmetric,
    Public,
    Private,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyKind::Password => "password",
            KeyKind::Symmetric => "symmetric",
            KeyKind::Public => "public",
            KeyKind::Private => "private",
        })
    }
}

/// Errors produced by the encryption schemes.
///
/// `Decryption` deliberately carries no detail: a wrong key, a wrong salt and
/// a corrupted envelope are indistinguishable to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("key derivation failed: {reason}")]
    KeyDerivation { reason: String },
    #[error("decryption failed: wrong key or corrupted data")]
    Decryption,
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },
    #[error("malformed key material: {reason}")]
    KeyFormat { reason: String },
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    KeyLength { expected: usize, actual: usize },
    #[error("envelope was sealed with the {found} scheme, not {expected}")]
    SchemeMismatch { expected: SchemeId, found: SchemeId },
    #[error("a {found} key cannot be used here; expected a {expected} key")]
    KeyUsage { expected: KeyKind, found: KeyKind },
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },
}

impl CryptoError {
    pub(crate) fn key_format(reason: impl Into<String>) -> Self {
        CryptoError::KeyFormat {
            reason: reason.into(),
        }
    }

    pub(crate) fn key_derivation(reason: impl Into<String>) -> Self {
        CryptoError::KeyDerivation {
            reason: reason.into(),
        }
    }
}
