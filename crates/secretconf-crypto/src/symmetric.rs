use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use tracing::instrument;
use zeroize::Zeroizing;

use crate::{
    aead,
    envelope::{associated_data, Envelope, SchemeId, SchemeParams, ENVELOPE_VERSION},
    error::CryptoError,
};

/// Length of a symmetric key in bytes (AES-256).
pub const SYMMETRIC_KEY_LEN: usize = aead::KEY_LEN;

/// A pre-shared 256-bit key. Zeroized on drop.
#[derive(Clone)]
pub struct SymmetricKey(Zeroizing<[u8; SYMMETRIC_KEY_LEN]>);

impl SymmetricKey {
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; SYMMETRIC_KEY_LEN]);
        OsRng.fill_bytes(key.as_mut_slice());
        SymmetricKey(key)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SYMMETRIC_KEY_LEN {
            return Err(CryptoError::KeyLength {
                expected: SYMMETRIC_KEY_LEN,
                actual: bytes.len(),
            });
        }
        let mut key = Zeroizing::new([0u8; SYMMETRIC_KEY_LEN]);
        key.copy_from_slice(bytes);
        Ok(SymmetricKey(key))
    }

    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_LEN] {
        &self.0
    }

    /// Standard base64, the form written by `keygen symmetric`.
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(STANDARD.encode(self.0.as_slice()))
    }

    pub fn from_base64(text: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(
            STANDARD
                .decode(text.trim())
                .map_err(|e| CryptoError::key_format(format!("symmetric key is not valid base64: {e}")))?,
        );
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// Pre-shared key encryption. The caller supplies exactly
/// [`SYMMETRIC_KEY_LEN`] bytes; the same key encrypts and decrypts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymmetricScheme;

impl SymmetricScheme {
    pub fn generate_key(&self) -> SymmetricKey {
        SymmetricKey::generate()
    }

    #[instrument(skip_all, fields(len = plaintext.len()))]
    pub fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Envelope, CryptoError> {
        let key = SymmetricKey::from_bytes(key)?;
        let params = SchemeParams::Symmetric;
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

    #[instrument(skip_all, fields(len = envelope.ciphertext.as_slice().len()))]
    pub fn decrypt(&self, envelope: &Envelope, key: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let key = SymmetricKey::from_bytes(key)?;
        envelope.expect_scheme(SchemeId::Symmetric)?;
        aead::open(
            key.as_bytes(),
            envelope.nonce.as_slice(),
            envelope.ciphertext.as_slice(),
            envelope.tag.as_slice(),
            &envelope.associated_data(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_round_trips() {
        let key = SymmetricScheme.generate_key();
        let envelope = SymmetricScheme
            .encrypt(br#"{"host":"127.0.0.1"}"#, key.as_bytes())
            .expect("encrypt");
        let plaintext = SymmetricScheme.decrypt(&envelope, key.as_bytes()).expect("decrypt");
        assert_eq!(plaintext.as_slice(), br#"{"host":"127.0.0.1"}"#);
    }

    #[test]
    fn different_key_fails() {
        let envelope = SymmetricScheme
            .encrypt(b"secret", SymmetricKey::generate().as_bytes())
            .expect("encrypt");
        assert_eq!(
            SymmetricScheme.decrypt(&envelope, SymmetricKey::generate().as_bytes()),
            Err(CryptoError::Decryption)
        );
    }

    #[test]
    fn wrong_key_length_is_rejected_before_any_cipher_work() {
        for len in [0usize, 16, 31, 33, 64] {
            assert_eq!(
                SymmetricScheme.encrypt(b"x", &vec![0u8; len]).map(|_| ()),
                Err(CryptoError::KeyLength {
                    expected: SYMMETRIC_KEY_LEN,
                    actual: len,
                })
            );
        }
        let envelope = SymmetricScheme.encrypt(b"x", &[1u8; 32]).expect("encrypt");
        assert!(matches!(
            SymmetricScheme.decrypt(&envelope, &[1u8; 16]),
            Err(CryptoError::KeyLength { actual: 16, .. })
        ));
    }

    #[test]
    fn flipping_any_serialized_byte_fails() {
        let key = [42u8; SYMMETRIC_KEY_LEN];
        let bytes = SymmetricScheme
            .encrypt(b"host=127.0.0.1", &key)
            .expect("encrypt")
            .to_bytes()
            .expect("serialize");

        for idx in 0..bytes.len() {
            let mut tampered = bytes.clone();
            tampered[idx] ^= 0x01;
            let result = Envelope::from_bytes(&tampered).and_then(|envelope| {
                SymmetricScheme.decrypt(&envelope, &key)
            });
            assert_eq!(result, Err(CryptoError::Decryption), "byte {idx} accepted");
        }
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let envelope = SymmetricScheme.encrypt(b"", &[3u8; 32]).expect("encrypt");
        assert!(envelope.ciphertext.as_slice().is_empty());
        assert!(SymmetricScheme
            .decrypt(&envelope, &[3u8; 32])
            .expect("decrypt")
            .is_empty());
    }

    #[test]
    fn base64_key_round_trip_and_redaction() {
        let key = SymmetricKey::generate();
        let restored = SymmetricKey::from_base64(&key.to_base64()).expect("decode");
        assert_eq!(restored.as_bytes(), key.as_bytes());
        assert_eq!(format!("{key:?}"), "SymmetricKey(<redacted>)");

        assert!(matches!(
            SymmetricKey::from_base64("%%%"),
            Err(CryptoError::KeyFormat { .. })
        ));
        assert!(matches!(
            SymmetricKey::from_base64(&STANDARD.encode([0u8; 8])),
            Err(CryptoError::KeyLength { actual: 8, .. })
        ));
    }

    #[test]
    fn password_envelope_is_refused() {
        let mut envelope = SymmetricScheme.encrypt(b"x", &[1u8; 32]).expect("encrypt");
        envelope.params = SchemeParams::Password {
            kdf: crate::kdf::KdfParams::default(),
            salt: vec![0u8; 16].into(),
        };
        assert_eq!(
            SymmetricScheme.decrypt(&envelope, &[1u8; 32]),
            Err(CryptoError::SchemeMismatch {
                expected: SchemeId::Symmetric,
                found: SchemeId::Password,
            })
        );
    }
}
