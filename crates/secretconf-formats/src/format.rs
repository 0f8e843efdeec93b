use std::{fmt, path::Path, str::FromStr};

use secretconf_core::Serializer;
use serde::{Deserialize, Serialize};

use crate::{IniSerializer, JsonSerializer, TomlSerializer};

/// The built-in formats, for callers that pick one at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Ini,
    Toml,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Json, Format::Ini, Format::Toml];

    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Ini => "ini",
            Format::Toml => "toml",
        }
    }

    /// Accepts format names and their common file extensions.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "ini" | "cfg" | "conf" => Some(Format::Ini),
            "toml" => Some(Format::Toml),
            _ => None,
        }
    }

    /// Guess the format from a file name. An unrecognised last extension (such
    /// as an encryption suffix in `app.json.pwenc`) is skipped once.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if let Some(format) = Self::from_name(ext) {
            return Some(format);
        }
        let inner = Path::new(path.file_stem()?);
        Self::from_name(inner.extension()?.to_str()?)
    }

    pub fn serializer(self) -> Box<dyn Serializer> {
        match self {
            Format::Json => Box::new(JsonSerializer::default()),
            Format::Ini => Box::new(IniSerializer),
            Format::Toml => Box::new(TomlSerializer),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown format `{s}` (expected json, ini or toml)"))
    }
}

#[cfg(test)]
mod tests {
    use secretconf_core::ConfigStore;

    use super::*;

    #[test]
    fn detects_format_from_plain_and_encrypted_names() {
        assert_eq!(Format::from_path(Path::new("app.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("app.toml.pwenc")), Some(Format::Toml));
        assert_eq!(Format::from_path(Path::new("/etc/app.conf")), Some(Format::Ini));
        assert_eq!(Format::from_path(Path::new("app.txt")), None);
        assert_eq!(Format::from_path(Path::new("app")), None);
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("JSON".parse::<Format>(), Ok(Format::Json));
        assert!("yaml".parse::<Format>().is_err());
    }

    #[test]
    fn host_scenario_holds_for_every_format() {
        for format in Format::ALL {
            let serializer = format.serializer();
            let mut store = ConfigStore::new();
            store.set("host", "127.0.0.1").expect("set");

            let bytes = serializer.encode(&store).expect("encode");
            let decoded = serializer.decode(&bytes).expect("decode");
            assert_eq!(decoded.get("host"), Ok("127.0.0.1"), "format {format}");
            assert_eq!(serializer.extension(), format.name());
        }
    }
}
