use thiserror::Error;

use crate::store::{ConfigError, ConfigStore};

/// Failure to encode or decode a configuration in a particular format.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{format} serialization failed: {reason}")]
pub struct SerializationError {
    /// Short format name (`json`, `ini`, ...).
    pub format: &'static str,
    pub reason: String,
}

impl SerializationError {
    pub fn new(format: &'static str, reason: impl Into<String>) -> Self {
        Self {
            format,
            reason: reason.into(),
        }
    }

    /// Wrap a store rule violated by decoded input (e.g. a namespace collision).
    pub fn from_config(format: &'static str, err: ConfigError) -> Self {
        Self::new(format, err.to_string())
    }
}

/// Contract for an on-disk configuration format.
///
/// Implementations only translate between bytes and a [`ConfigStore`]; they
/// never see key material or ciphertext, so any format can be wrapped by any
/// encryption scheme.
pub trait Serializer {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Conventional file extension, without the leading dot.
    fn extension(&self) -> &'static str;

    /// Encode the merged view of `store` (defaults included).
    fn encode(&self, store: &ConfigStore) -> Result<Vec<u8>, SerializationError>;

    /// Decode bytes into a fresh store without defaults.
    fn decode(&self, bytes: &[u8]) -> Result<ConfigStore, SerializationError>;
}

impl<T: Serializer + ?Sized> Serializer for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn extension(&self) -> &'static str {
        (**self).extension()
    }

    fn encode(&self, store: &ConfigStore) -> Result<Vec<u8>, SerializationError> {
        (**self).encode(store)
    }

    fn decode(&self, bytes: &[u8]) -> Result<ConfigStore, SerializationError> {
        (**self).decode(bytes)
    }
}

/// Interpret input as UTF-8 text, the common first step of every text format.
pub fn decode_utf8<'a>(format: &'static str, bytes: &'a [u8]) -> Result<&'a str, SerializationError> {
    std::str::from_utf8(bytes)
        .map_err(|e| SerializationError::new(format, format!("input is not valid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LinesSerializer;

    impl Serializer for LinesSerializer {
        fn name(&self) -> &'static str {
            "lines"
        }

        fn extension(&self) -> &'static str {
            "txt"
        }

        fn encode(&self, store: &ConfigStore) -> Result<Vec<u8>, SerializationError> {
            let lines: Vec<String> = store
                .globals()
                .into_iter()
                .map(|kv| format!("{} {}", kv.key, kv.value))
                .collect();
            Ok(lines.join("\n").into_bytes())
        }

        fn decode(&self, bytes: &[u8]) -> Result<ConfigStore, SerializationError> {
            let text = decode_utf8(self.name(), bytes)?;
            let mut store = ConfigStore::new();
            for line in text.lines() {
                let (key, value) = line
                    .split_once(' ')
                    .ok_or_else(|| SerializationError::new(self.name(), "missing separator"))?;
                store
                    .set(key, value)
                    .map_err(|e| SerializationError::from_config(self.name(), e))?;
            }
            Ok(store)
        }
    }

    #[test]
    fn boxed_serializer_delegates() {
        let boxed: Box<dyn Serializer> = Box::new(LinesSerializer);
        let mut store = ConfigStore::new();
        store.set("host", "127.0.0.1").expect("set");

        let bytes = boxed.encode(&store).expect("encode");
        let decoded = boxed.decode(&bytes).expect("decode");
        assert_eq!(decoded, store);
        assert_eq!(boxed.extension(), "txt");
    }

    #[test]
    fn rejects_non_utf8_input() {
        let err = LinesSerializer.decode(&[0xff, 0xfe]).expect_err("should reject");
        assert_eq!(err.format, "lines");
        assert!(err.reason.contains("UTF-8"));
    }
}
