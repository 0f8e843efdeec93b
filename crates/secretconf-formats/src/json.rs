use secretconf_core::{
    serializer::decode_utf8, ConfigStore, SerializationError, Serializer,
};
use serde_json::{Map, Value};
use tracing::instrument;

const NAME: &str = "json";

/// JSON format: globals are top-level strings, sections are nested objects.
///
/// Numbers and booleans are accepted on input and kept as their textual form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Indented output, the default.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Single-line output.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonSerializer {
    fn default() -> Self {
        Self::pretty()
    }
}

impl Serializer for JsonSerializer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    #[instrument(skip_all, fields(pretty = self.pretty))]
    fn encode(&self, store: &ConfigStore) -> Result<Vec<u8>, SerializationError> {
        let mut root = Map::new();
        for kv in store.globals() {
            root.insert(kv.key, Value::String(kv.value));
        }
        for section in store.sections() {
            let entries = store
                .items(Some(section))
                .map_err(|e| SerializationError::from_config(NAME, e))?;
            let object = entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                .collect();
            root.insert(section.to_string(), Value::Object(object));
        }

        let root = Value::Object(root);
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(&root)
        } else {
            serde_json::to_vec(&root)
        };
        encoded.map_err(|e| SerializationError::new(NAME, e.to_string()))
    }

    #[instrument(skip_all, fields(len = bytes.len()))]
    fn decode(&self, bytes: &[u8]) -> Result<ConfigStore, SerializationError> {
        let text = decode_utf8(NAME, bytes)?;
        let root: Value =
            serde_json::from_str(text).map_err(|e| SerializationError::new(NAME, e.to_string()))?;
        let Value::Object(root) = root else {
            return Err(SerializationError::new(NAME, "top-level value must be an object"));
        };

        let mut store = ConfigStore::new();
        for (name, value) in root {
            match value {
                Value::Object(section) => {
                    store
                        .add_section(name.as_str())
                        .map_err(|e| SerializationError::from_config(NAME, e))?;
                    for (key, value) in section {
                        let value = scalar(value, &format!("{name}/{key}"))?;
                        store
                            .set_in(name.as_str(), key, value)
                            .map_err(|e| SerializationError::from_config(NAME, e))?;
                    }
                }
                other => {
                    let value = scalar(other, &name)?;
                    store
                        .set(name, value)
                        .map_err(|e| SerializationError::from_config(NAME, e))?;
                }
            }
        }
        Ok(store)
    }
}

fn scalar(value: Value, path: &str) -> Result<String, SerializationError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(SerializationError::new(NAME, format!("{path}: null is not a value"))),
        Value::Array(_) => Err(SerializationError::new(
            NAME,
            format!("{path}: arrays are not supported"),
        )),
        Value::Object(_) => Err(SerializationError::new(
            NAME,
            format!("{path}: sections cannot be nested"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigStore {
        let mut store = ConfigStore::new();
        store.set("hello", "world").expect("set");
        store.set_in("foo", "bar", "bas").expect("set");
        store.add_section("empty").expect("add");
        store
    }

    #[test]
    fn round_trips_globals_sections_and_empty_sections() {
        for serializer in [JsonSerializer::pretty(), JsonSerializer::compact()] {
            let bytes = serializer.encode(&sample()).expect("encode");
            let decoded = serializer.decode(&bytes).expect("decode");
            assert_eq!(decoded, sample());
        }
    }

    #[test]
    fn encodes_defaults_into_output() {
        let store = ConfigStore::with_defaults([("region", "eu")]).expect("defaults");
        let bytes = JsonSerializer::compact().encode(&store).expect("encode");
        assert_eq!(String::from_utf8(bytes).expect("utf8"), r#"{"region":"eu"}"#);
    }

    #[test]
    fn numbers_and_booleans_become_strings() {
        let decoded = JsonSerializer::default()
            .decode(br#"{"port": 8080, "server": {"debug": true, "ratio": 0.5}}"#)
            .expect("decode");
        assert_eq!(decoded.get("port"), Ok("8080"));
        assert_eq!(decoded.get_in("server", "debug"), Ok("true"));
        assert_eq!(decoded.get_in("server", "ratio"), Ok("0.5"));
    }

    #[test]
    fn rejects_arrays_nulls_and_deep_nesting() {
        let serializer = JsonSerializer::default();
        let inputs: [&[u8]; 5] = [
            br#"{"hosts": ["a", "b"]}"#,
            br#"{"host": null}"#,
            br#"{"a": {"b": {"c": "d"}}}"#,
            br#"["not", "an", "object"]"#,
            b"{not json",
        ];
        for input in inputs {
            let err = serializer.decode(input).expect_err("should reject");
            assert_eq!(err.format, "json");
        }
    }
}
