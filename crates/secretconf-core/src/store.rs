use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::debug;

/// Errors produced when reading or mutating a [`ConfigStore`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The requested section does not exist (explicitly or via defaults).
    #[error("unknown section: {section}")]
    UnknownSection { section: String },
    /// The requested key does not exist; `path` is `key` or `section/key`.
    #[error("unknown key: {path}")]
    UnknownKey { path: String },
    /// A value could not be coerced to the requested type.
    #[error("value at {path} is not a valid {expected}")]
    InvalidValue { path: String, expected: &'static str },
    /// A name is used both as a global key and as a section.
    #[error("`{name}` is used both as a global key and as a section")]
    NamespaceCollision { name: String },
    /// Keys and section names must be non-empty.
    #[error("{what} name must not be empty")]
    EmptyName { what: &'static str },
}

/// A key/value pair in the global namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalKV {
    pub key: String,
    pub value: String,
}

/// A key/value pair scoped to a section.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectionKV {
    pub section: String,
    pub key: String,
    pub value: String,
}

/// Either kind of configuration entry; also the unit used for defaults.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Entry {
    Global(GlobalKV),
    Section(SectionKV),
}

impl From<(&str, &str)> for Entry {
    fn from((key, value): (&str, &str)) -> Self {
        Entry::Global(GlobalKV {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

impl From<(&str, &str, &str)> for Entry {
    fn from((section, key, value): (&str, &str, &str)) -> Self {
        Entry::Section(SectionKV {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Layer {
    globals: BTreeMap<String, String>,
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Layer {
    fn is_empty(&self) -> bool {
        self.globals.is_empty() && self.sections.is_empty()
    }
}

/// In-memory configuration: global keys plus named sections of keys.
///
/// Sections form a strict namespace: a key is unique within its section, and a
/// name cannot be both a global key and a section (nested formats would
/// collide). An optional defaults layer sits underneath the explicit entries;
/// every read sees the merged view, with explicit entries taking precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    entries: Layer,
    defaults: Layer,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an empty store on top of the given defaults.
    pub fn with_defaults<I, E>(defaults: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        let mut store = Self::new();
        store.set_defaults(defaults)?;
        Ok(store)
    }

    /// Replace the defaults layer. Explicit entries are left untouched.
    pub fn set_defaults<I, E>(&mut self, defaults: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        let mut layer = Layer::default();
        for entry in defaults {
            match entry.into() {
                Entry::Global(kv) => {
                    check_name(&kv.key, "key")?;
                    layer.globals.insert(kv.key, kv.value);
                }
                Entry::Section(kv) => {
                    check_name(&kv.section, "section")?;
                    check_name(&kv.key, "key")?;
                    layer
                        .sections
                        .entry(kv.section)
                        .or_default()
                        .insert(kv.key, kv.value);
                }
            }
        }

        let section_names = layer.sections.keys().chain(self.entries.sections.keys());
        for section in section_names {
            if layer.globals.contains_key(section) || self.entries.globals.contains_key(section) {
                return Err(ConfigError::NamespaceCollision {
                    name: section.clone(),
                });
            }
        }

        debug!(
            globals = layer.globals.len(),
            sections = layer.sections.len(),
            "defaults installed"
        );
        self.defaults = layer;
        Ok(())
    }

    /// The defaults layer as a flat list of entries.
    pub fn defaults(&self) -> Vec<Entry> {
        layer_entries(&self.defaults)
    }

    /// Set a global key, overwriting any existing value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), ConfigError> {
        let key = key.into();
        check_name(&key, "key")?;
        if self.has_section(&key) {
            return Err(ConfigError::NamespaceCollision { name: key });
        }
        self.entries.globals.insert(key, value.into());
        Ok(())
    }

    /// Set a key inside `section`, creating the section when needed.
    pub fn set_in(
        &mut self,
        section: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ConfigError> {
        let section = section.into();
        let key = key.into();
        check_name(&section, "section")?;
        check_name(&key, "key")?;
        self.check_section_free(&section)?;
        self.entries
            .sections
            .entry(section)
            .or_default()
            .insert(key, value.into());
        Ok(())
    }

    /// Create an empty section. Adding an existing section is a no-op.
    pub fn add_section(&mut self, section: impl Into<String>) -> Result<(), ConfigError> {
        let section = section.into();
        check_name(&section, "section")?;
        self.check_section_free(&section)?;
        self.entries.sections.entry(section).or_default();
        Ok(())
    }

    /// Value of a global key.
    pub fn get(&self, key: &str) -> Result<&str, ConfigError> {
        self.entries
            .globals
            .get(key)
            .or_else(|| self.defaults.globals.get(key))
            .map(String::as_str)
            .ok_or_else(|| ConfigError::UnknownKey {
                path: key.to_string(),
            })
    }

    /// Value of `key` inside `section`.
    pub fn get_in(&self, section: &str, key: &str) -> Result<&str, ConfigError> {
        if !self.has_section(section) {
            return Err(ConfigError::UnknownSection {
                section: section.to_string(),
            });
        }
        fn lookup<'a>(layer: &'a Layer, section: &str, key: &str) -> Option<&'a String> {
            layer.sections.get(section).and_then(|s| s.get(key))
        }
        lookup(&self.entries, section, key)
            .or_else(|| lookup(&self.defaults, section, key))
            .map(String::as_str)
            .ok_or_else(|| ConfigError::UnknownKey {
                path: format!("{section}/{key}"),
            })
    }

    pub fn get_int(&self, key: &str) -> Result<i64, ConfigError> {
        parse_int(self.get(key)?, key)
    }

    pub fn get_int_in(&self, section: &str, key: &str) -> Result<i64, ConfigError> {
        parse_int(self.get_in(section, key)?, &format!("{section}/{key}"))
    }

    /// Boolean coercion accepting `1/0`, `true/false`, `yes/no`, `on/off`.
    pub fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        parse_bool(self.get(key)?, key)
    }

    pub fn get_bool_in(&self, section: &str, key: &str) -> Result<bool, ConfigError> {
        parse_bool(self.get_in(section, key)?, &format!("{section}/{key}"))
    }

    /// Remove an explicit global entry, returning its value. Defaults stay visible.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.globals.remove(key)
    }

    /// Remove an explicit entry from a section, returning its value.
    pub fn remove_in(&mut self, section: &str, key: &str) -> Option<String> {
        self.entries
            .sections
            .get_mut(section)
            .and_then(|entries| entries.remove(key))
    }

    /// Remove a section and all of its explicit entries.
    pub fn remove_section(&mut self, section: &str) -> bool {
        self.entries.sections.remove(section).is_some()
    }

    /// Names of all sections (explicit or default), sorted.
    pub fn sections(&self) -> Vec<&str> {
        self.entries
            .sections
            .keys()
            .chain(self.defaults.sections.keys())
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.entries.sections.contains_key(section) || self.defaults.sections.contains_key(section)
    }

    /// Keys of `section`, or the global keys when `section` is `None`.
    pub fn keys(&self, section: Option<&str>) -> Result<Vec<&str>, ConfigError> {
        Ok(self.items(section)?.into_iter().map(|(key, _)| key).collect())
    }

    /// Whether `key` exists in `section` (or globally). Unknown sections yield `false`.
    pub fn has_key(&self, section: Option<&str>, key: &str) -> bool {
        match section {
            None => self.get(key).is_ok(),
            Some(section) => self.get_in(section, key).is_ok(),
        }
    }

    /// Key/value pairs of `section`, or of the global namespace when `None`.
    pub fn items(&self, section: Option<&str>) -> Result<Vec<(&str, &str)>, ConfigError> {
        let merged = match section {
            None => merge(Some(&self.defaults.globals), Some(&self.entries.globals)),
            Some(name) => {
                if !self.has_section(name) {
                    return Err(ConfigError::UnknownSection {
                        section: name.to_string(),
                    });
                }
                merge(
                    self.defaults.sections.get(name),
                    self.entries.sections.get(name),
                )
            }
        };
        Ok(merged.into_iter().collect())
    }

    pub fn globals(&self) -> Vec<GlobalKV> {
        self.items(None)
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| GlobalKV {
                key: key.to_string(),
                value: value.to_string(),
            })
            .collect()
    }

    pub fn section_entries(&self, section: &str) -> Result<Vec<SectionKV>, ConfigError> {
        Ok(self
            .items(Some(section))?
            .into_iter()
            .map(|(key, value)| SectionKV {
                section: section.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            })
            .collect())
    }

    /// The merged view as entries: globals first, then sections in name order.
    /// Empty sections contribute no entries; use [`ConfigStore::sections`] for those.
    pub fn entries(&self) -> Vec<Entry> {
        let mut out: Vec<Entry> = self.globals().into_iter().map(Entry::Global).collect();
        for section in self.sections() {
            if let Ok(entries) = self.section_entries(section) {
                out.extend(entries.into_iter().map(Entry::Section));
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.defaults.is_empty()
    }

    fn check_section_free(&self, section: &str) -> Result<(), ConfigError> {
        if self.entries.globals.contains_key(section) || self.defaults.globals.contains_key(section) {
            return Err(ConfigError::NamespaceCollision {
                name: section.to_string(),
            });
        }
        Ok(())
    }
}

fn merge<'a>(
    lower: Option<&'a BTreeMap<String, String>>,
    upper: Option<&'a BTreeMap<String, String>>,
) -> BTreeMap<&'a str, &'a str> {
    let mut out = BTreeMap::new();
    for layer in [lower, upper].into_iter().flatten() {
        for (key, value) in layer {
            out.insert(key.as_str(), value.as_str());
        }
    }
    out
}

fn layer_entries(layer: &Layer) -> Vec<Entry> {
    let globals = layer.globals.iter().map(|(key, value)| {
        Entry::Global(GlobalKV {
            key: key.clone(),
            value: value.clone(),
        })
    });
    let sections = layer.sections.iter().flat_map(|(section, entries)| {
        entries.iter().map(move |(key, value)| {
            Entry::Section(SectionKV {
                section: section.clone(),
                key: key.clone(),
                value: value.clone(),
            })
        })
    });
    globals.chain(sections).collect()
}

fn check_name(name: &str, what: &'static str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::EmptyName { what });
    }
    Ok(())
}

fn parse_int(value: &str, path: &str) -> Result<i64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        path: path.to_string(),
        expected: "integer",
    })
}

fn parse_bool(value: &str, path: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            path: path.to_string(),
            expected: "boolean",
        }),
    }
}
