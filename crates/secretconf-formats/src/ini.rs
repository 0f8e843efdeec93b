use secretconf_core::{
    serializer::decode_utf8, ConfigStore, SerializationError, Serializer,
};
use tracing::instrument;

const NAME: &str = "ini";

/// INI format: `key=value` lines, `[section]` headers, `#`/`;` comment lines.
///
/// Keys before the first header are globals. Values are split at the first
/// `=`, trimmed, and a single pair of surrounding double quotes is removed.
/// Duplicate keys or section headers are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IniSerializer;

impl Serializer for IniSerializer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extension(&self) -> &'static str {
        "ini"
    }

    #[instrument(skip_all)]
    fn encode(&self, store: &ConfigStore) -> Result<Vec<u8>, SerializationError> {
        let mut out = String::new();
        for kv in store.globals() {
            push_line(&mut out, &kv.key, &kv.value)?;
        }
        for section in store.sections() {
            check_section(section)?;
            if !out.is_empty() {
                out.push('\n');
            }
            out.push('[');
            out.push_str(section);
            out.push_str("]\n");
            let entries = store
                .items(Some(section))
                .map_err(|e| SerializationError::from_config(NAME, e))?;
            for (key, value) in entries {
                push_line(&mut out, key, value)?;
            }
        }
        Ok(out.into_bytes())
    }

    #[instrument(skip_all, fields(len = bytes.len()))]
    fn decode(&self, bytes: &[u8]) -> Result<ConfigStore, SerializationError> {
        let text = decode_utf8(NAME, bytes)?;
        let mut store = ConfigStore::new();
        let mut section: Option<String> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .ok_or_else(|| line_error(line_no, "unterminated section header"))?
                    .trim();
                if store.has_section(name) {
                    return Err(line_error(line_no, &format!("duplicate section [{name}]")));
                }
                store
                    .add_section(name)
                    .map_err(|e| line_error(line_no, &e.to_string()))?;
                section = Some(name.to_string());
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| line_error(line_no, "expected key=value"))?;
            let key = key.trim();
            let value = unquote(value.trim());
            if store.has_key(section.as_deref(), key) {
                return Err(line_error(line_no, &format!("duplicate key `{key}`")));
            }

            let result = match &section {
                None => store.set(key, value),
                Some(name) => store.set_in(name.as_str(), key, value),
            };
            result.map_err(|e| line_error(line_no, &e.to_string()))?;
        }

        Ok(store)
    }
}

fn push_line(out: &mut String, key: &str, value: &str) -> Result<(), SerializationError> {
    check_key(key)?;
    if value.contains(['\n', '\r']) {
        return Err(SerializationError::new(
            NAME,
            format!("value of `{key}` contains a line break"),
        ));
    }
    out.push_str(key);
    out.push('=');
    if needs_quotes(value) {
        out.push('"');
        out.push_str(value);
        out.push('"');
    } else {
        out.push_str(value);
    }
    out.push('\n');
    Ok(())
}

fn check_key(key: &str) -> Result<(), SerializationError> {
    let invalid = key.contains(['=', '\n', '\r'])
        || key.starts_with(['#', ';', '['])
        || key.trim() != key;
    if invalid {
        return Err(SerializationError::new(NAME, format!("key `{key}` cannot be written")));
    }
    Ok(())
}

fn check_section(section: &str) -> Result<(), SerializationError> {
    if section.contains([']', '\n', '\r']) || section.trim() != section {
        return Err(SerializationError::new(
            NAME,
            format!("section `{section}` cannot be written"),
        ));
    }
    Ok(())
}

fn needs_quotes(value: &str) -> bool {
    value.trim() != value || is_quoted(value)
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('"') && value.ends_with('"')
}

fn unquote(value: &str) -> &str {
    if is_quoted(value) {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn line_error(line_no: usize, reason: &str) -> SerializationError {
    SerializationError::new(NAME, format!("line {line_no}: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_globals_sections_and_comments() {
        let input = "\
# leading comment
name=app
; another comment

[db]
host = localhost
password=\"p=ss word\"
[cache]
";
        let store = IniSerializer.decode(input.as_bytes()).expect("decode");
        assert_eq!(store.get("name"), Ok("app"));
        assert_eq!(store.get_in("db", "host"), Ok("localhost"));
        assert_eq!(store.get_in("db", "password"), Ok("p=ss word"));
        assert!(store.has_section("cache"));
    }

    #[test]
    fn encodes_globals_before_sections() {
        let mut store = ConfigStore::new();
        store.set_in("db", "host", "localhost").expect("set");
        store.set("name", "app").expect("set");

        let text = String::from_utf8(IniSerializer.encode(&store).expect("encode")).expect("utf8");
        assert_eq!(text, "name=app\n\n[db]\nhost=localhost\n");
    }

    #[test]
    fn round_trips_values_that_need_quoting() {
        let mut store = ConfigStore::new();
        store.set("padded", "  spaced  ").expect("set");
        store.set("quoted", "\"already\"").expect("set");
        store.set("empty", "").expect("set");
        store.set_in("s", "eq", "a=b=c").expect("set");

        let bytes = IniSerializer.encode(&store).expect("encode");
        assert_eq!(IniSerializer.decode(&bytes).expect("decode"), store);
    }

    #[test]
    fn rejects_malformed_lines_and_duplicates() {
        for input in ["novalue\n", "[open\n", "a=1\na=2\n", "[s]\n[s]\n"] {
            let err = IniSerializer.decode(input.as_bytes()).expect_err("should reject");
            assert!(err.reason.starts_with("line "), "{}", err.reason);
        }
    }

    #[test]
    fn refuses_to_write_unrepresentable_entries() {
        let mut store = ConfigStore::new();
        store.set("multi", "line\nbreak").expect("set");
        assert!(IniSerializer.encode(&store).is_err());

        let mut store = ConfigStore::new();
        store.set("#comment", "x").expect("set");
        assert!(IniSerializer.encode(&store).is_err());

        let mut store = ConfigStore::new();
        store.set_in("bad]name", "k", "v").expect("set");
        assert!(IniSerializer.encode(&store).is_err());
    }
}
