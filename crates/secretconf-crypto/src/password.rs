use tracing::{instrument, warn};
use zeroize::Zeroizing;

use crate::{
    aead,
    envelope::{associated_data, Envelope, SchemeId, SchemeParams, ENVELOPE_VERSION},
    error::CryptoError,
    kdf::{derive_key, KdfParams, Salt},
};

/// Password-based encryption: Argon2id derives the AES-256-GCM key from the
/// password and a fresh random salt.
///
/// The salt is embedded in the envelope and also returned to the caller, who
/// may keep it out of band. No password strength policy is enforced; an empty
/// password is accepted but offers no protection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasswordScheme {
    params: KdfParams,
}

impl PasswordScheme {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    /// Work factor used for new envelopes.
    pub fn params(&self) -> KdfParams {
        self.params
    }

    /// Encrypt under a new random salt; returns the envelope and that salt.
    pub fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<(Envelope, Salt), CryptoError> {
        let salt = Salt::generate();
        let envelope = self.encrypt_with_salt(plaintext, password, &salt)?;
        Ok((envelope, salt))
    }

    /// Encrypt with a caller-chosen salt. Prefer [`PasswordScheme::encrypt`];
    /// reusing a salt across files lets them share a derived key.
    #[instrument(skip_all, fields(len = plaintext.len()))]
    pub fn encrypt_with_salt(
        &self,
        plaintext: &[u8],
        password: &str,
        salt: &Salt,
    ) -> Result<Envelope, CryptoError> {
        if password.is_empty() {
            warn!("encrypting with an empty password");
        }
        let key = derive_key(password, salt.as_bytes(), &self.params)?;
        let params = SchemeParams::Password {
            kdf: self.params,
            salt: salt.as_bytes().to_vec().into(),
        };
        let sealed = aead::seal(
            key.as_bytes(),
            plaintext,
            &associated_data(ENVELOPE_VERSION, &params),
        )?;
        Ok(Envelope {
            version: ENVELOPE_VERSION,
            params,
            nonce: sealed.nonce.into(),
            ciphertext: sealed.ciphertext.into(),
            tag: sealed.tag.into(),
        })
    }

    /// Decrypt using the caller's copy of the salt. The work factor comes from
    /// the envelope. A different salt derives a different key and fails
    /// exactly like a wrong password.
    #[instrument(skip_all, fields(len = envelope.ciphertext.as_slice().len()))]
    pub fn decrypt(
        &self,
        envelope: &Envelope,
        password: &str,
        salt: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let kdf = match &envelope.params {
            SchemeParams::Password { kdf, .. } => *kdf,
            other => {
                return Err(CryptoError::SchemeMismatch {
                    expected: SchemeId::Password,
                    found: other.scheme(),
                })
            }
        };
        let key = derive_key(password, salt, &kdf)?;
        aead::open(
            key.as_bytes(),
            envelope.nonce.as_slice(),
            envelope.ciphertext.as_slice(),
            envelope.tag.as_slice(),
            &envelope.associated_data(),
        )
    }

    /// Decrypt using the salt stored in the envelope itself.
    pub fn decrypt_embedded(&self, envelope: &Envelope, password: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        match &envelope.params {
            SchemeParams::Password { salt, .. } => self.decrypt(envelope, password, salt.as_slice()),
            other => Err(CryptoError::SchemeMismatch {
                expected: SchemeId::Password,
                found: other.scheme(),
            }),
        }
    }
}
