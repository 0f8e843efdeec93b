//! Password-based key derivation (Argon2id).
//!
//! The work factor travels inside every password envelope, so raising the
//! defaults later does not break decryption of older files.

use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{aead::KEY_LEN, error::CryptoError};

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

const MAX_M_COST: u32 = 1024 * 1024;
const MAX_T_COST: u32 = 16;
const MAX_P_COST: u32 = 16;

/// Argon2id cost parameters.
///
/// Defaults: 19 MiB of memory, 2 passes, 1 lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory in KiB.
    pub m_cost: u32,
    /// Number of passes.
    pub t_cost: u32,
    /// Degree of parallelism.
    pub p_cost: u32,
}

impl KdfParams {
    pub const DEFAULT_M_COST: u32 = 19 * 1024;
    pub const DEFAULT_T_COST: u32 = 2;
    pub const DEFAULT_P_COST: u32 = 1;

    pub fn new(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, CryptoError> {
        let params = Self {
            m_cost,
            t_cost,
            p_cost,
        };
        params.validate()?;
        Ok(params)
    }

    /// Bounds: `1..=16` passes and lanes, `8 * p_cost` KiB up to 1 GiB of memory.
    pub fn validate(&self) -> Result<(), CryptoError> {
        if !(1..=MAX_P_COST).contains(&self.p_cost) {
            return Err(CryptoError::key_derivation(format!(
                "p_cost must be between 1 and {MAX_P_COST}"
            )));
        }
        if !(1..=MAX_T_COST).contains(&self.t_cost) {
            return Err(CryptoError::key_derivation(format!(
                "t_cost must be between 1 and {MAX_T_COST}"
            )));
        }
        let min_m_cost = 8 * self.p_cost;
        if !(min_m_cost..=MAX_M_COST).contains(&self.m_cost) {
            return Err(CryptoError::key_derivation(format!(
                "m_cost must be between {min_m_cost} and {MAX_M_COST} KiB"
            )));
        }
        Ok(())
    }

    fn argon2(&self) -> Result<Argon2<'static>, CryptoError> {
        self.validate()?;
        let params = Params::new(self.m_cost, self.t_cost, self.p_cost, Some(KEY_LEN))
            .map_err(|e| CryptoError::key_derivation(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: Self::DEFAULT_M_COST,
            t_cost: Self::DEFAULT_T_COST,
            p_cost: Self::DEFAULT_P_COST,
        }
    }
}

/// Random per-envelope salt. Not secret, but needed again to decrypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut bytes);
        Salt(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; SALT_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::key_derivation(format!(
                "salt must be {SALT_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Salt(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn from_base64(text: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD
            .decode(text.trim())
            .map_err(|e| CryptoError::key_derivation(format!("salt is not valid base64: {e}")))?;
        Self::from_slice(&bytes)
    }
}

/// 256-bit key derived from a password. Zeroized on drop.
pub struct DerivedKey(Zeroizing<[u8; KEY_LEN]>);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}

/// Derive the payload key for `password` and `salt`. Deterministic for equal inputs.
pub fn derive_key(password: &str, salt: &[u8], params: &KdfParams) -> Result<DerivedKey, CryptoError> {
    let salt = Salt::from_slice(salt)?;
    let argon2 = params.argon2()?;
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password.as_bytes(), salt.as_bytes(), key.as_mut_slice())
        .map_err(|e| CryptoError::key_derivation(e.to_string()))?;
    Ok(DerivedKey(key))
}
