//! Core abstractions for secretconf: the in-memory configuration store and the
//! serializer contract every on-disk format implements.
//! Encryption lives elsewhere; nothing here knows about ciphers.

pub mod serializer;
pub mod store;

pub use serializer::{SerializationError, Serializer};
pub use store::{ConfigError, ConfigStore, Entry, GlobalKV, SectionKV};
