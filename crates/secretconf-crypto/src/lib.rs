//! Encryption schemes that wrap a serialized configuration blob.
//!
//! Every scheme produces a self-describing [`Envelope`] sealed with
//! AES-256-GCM; they differ only in where the payload key comes from:
//! an Argon2id password derivation, a pre-shared 32-byte key, or an X25519
//! key agreement that wraps a random data key (hybrid encryption).
//! Key bytes are zeroized on drop and never logged.

mod aead;
pub mod armor;
pub mod asymmetric;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod password;
pub mod scheme;
pub mod symmetric;

pub use asymmetric::{AsymmetricScheme, KeyPair, PrivateKey, PublicKey};
pub use envelope::{Envelope, SchemeId, SchemeParams, MAX_PAYLOAD_LEN};
pub use error::{CryptoError, KeyKind};
pub use kdf::{derive_key, DerivedKey, KdfParams, Salt, SALT_LEN};
pub use password::PasswordScheme;
pub use scheme::{EncryptionScheme, KeyMaterial, Sealed};
pub use symmetric::{SymmetricKey, SymmetricScheme, SYMMETRIC_KEY_LEN};
