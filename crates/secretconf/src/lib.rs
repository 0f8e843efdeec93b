//! Encrypted configuration files.
//!
//! A [`ConfigFile`] pairs a [`ConfigStore`] with a [`Serializer`] and, when
//! the file is encrypted, one [`EncryptionScheme`]. Plain and encrypted files
//! go through the same `dump`/`load` calls; only the key material differs.

mod config_file;
mod error;

pub use config_file::ConfigFile;
pub use error::ConfigFileError;

pub use secretconf_core::{ConfigError, ConfigStore, Entry, GlobalKV, SectionKV, SerializationError, Serializer};
pub use secretconf_crypto::{
    AsymmetricScheme, CryptoError, EncryptionScheme, Envelope, KdfParams, KeyKind, KeyMaterial, KeyPair,
    PasswordScheme, PrivateKey, PublicKey, Salt, SchemeId, SymmetricKey, SymmetricScheme,
};
pub use secretconf_formats::{Format, IniSerializer, JsonSerializer, TomlSerializer};
