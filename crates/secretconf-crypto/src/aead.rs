use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use zeroize::Zeroizing;

use crate::{envelope::check_payload, error::CryptoError};

/// AES-256 key length.
pub(crate) const KEY_LEN: usize = 32;
/// 96-bit GCM nonce.
pub(crate) const NONCE_LEN: usize = 12;
/// 128-bit GCM tag.
pub(crate) const TAG_LEN: usize = 16;

/// AES-256-GCM output with the tag split off the ciphertext.
pub(crate) struct SealedParts {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub tag: Vec<u8>,
}

impl SealedParts {
    /// `nonce || ciphertext || tag`, for small blobs such as wrapped keys.
    pub fn concat(self) -> Vec<u8> {
        let mut out = self.nonce;
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }
}

pub(crate) fn seal(key: &[u8; KEY_LEN], plaintext: &[u8], aad: &[u8]) -> Result<SealedParts, CryptoError> {
    check_payload(plaintext.len())?;
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::Encryption {
        reason: format!("cipher init failed: {e}"),
    })?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let mut ciphertext = cipher
        .encrypt(&nonce, Payload { msg: plaintext, aad })
        .map_err(|e| CryptoError::Encryption {
            reason: e.to_string(),
        })?;
    if ciphertext.len() < TAG_LEN {
        return Err(CryptoError::Encryption {
            reason: "ciphertext shorter than authentication tag".to_string(),
        });
    }
    let tag = ciphertext.split_off(ciphertext.len() - TAG_LEN);
    Ok(SealedParts {
        nonce: nonce.to_vec(),
        ciphertext,
        tag,
    })
}

/// Authenticate and decrypt. Every failure collapses into `Decryption`.
pub(crate) fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    check_payload(ciphertext.len())?;
    if nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
        return Err(CryptoError::Decryption);
    }

    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Decryption)?;
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: &combined,
                aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::Decryption)
}

/// Inverse of [`SealedParts::concat`].
pub(crate) fn open_concat(key: &[u8; KEY_LEN], blob: &[u8], aad: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Decryption);
    }
    let (nonce, rest) = blob.split_at(NONCE_LEN);
    let (ciphertext, tag) = rest.split_at(rest.len() - TAG_LEN);
    open(key, nonce, ciphertext, tag, aad)
}
