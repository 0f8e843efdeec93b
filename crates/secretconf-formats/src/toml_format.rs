use secretconf_core::{
    serializer::decode_utf8, ConfigStore, SerializationError, Serializer,
};
use toml::{Table, Value};
use tracing::instrument;

const NAME: &str = "toml";

/// TOML format: top-level values are globals, top-level tables are sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TomlSerializer;

impl Serializer for TomlSerializer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extension(&self) -> &'static str {
        "toml"
    }

    #[instrument(skip_all)]
    fn encode(&self, store: &ConfigStore) -> Result<Vec<u8>, SerializationError> {
        let mut root = Table::new();
        for kv in store.globals() {
            root.insert(kv.key, Value::String(kv.value));
        }
        for section in store.sections() {
            let entries = store
                .items(Some(section))
                .map_err(|e| SerializationError::from_config(NAME, e))?;
            let table: Table = entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                .collect();
            root.insert(section.to_string(), Value::Table(table));
        }

        toml::to_string(&root)
            .map(String::into_bytes)
            .map_err(|e| SerializationError::new(NAME, e.to_string()))
    }

    #[instrument(skip_all, fields(len = bytes.len()))]
    fn decode(&self, bytes: &[u8]) -> Result<ConfigStore, SerializationError> {
        let text = decode_utf8(NAME, bytes)?;
        let root: Table =
            toml::from_str(text).map_err(|e| SerializationError::new(NAME, e.to_string()))?;

        let mut store = ConfigStore::new();
        for (name, value) in root {
            match value {
                Value::Table(section) => {
                    store
                        .add_section(name.as_str())
                        .map_err(|e| SerializationError::from_config(NAME, e))?;
                    for (key, value) in section {
                        let value = scalar(value, &format!("{name}.{key}"))?;
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
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Datetime(d) => Ok(d.to_string()),
        Value::Array(_) => Err(SerializationError::new(
            NAME,
            format!("{path}: arrays are not supported"),
        )),
        Value::Table(_) => Err(SerializationError::new(
            NAME,
            format!("{path}: sections cannot be nested"),
        )),
    }
}
