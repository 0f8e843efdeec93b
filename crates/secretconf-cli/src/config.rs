use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use secretconf::{Format, KdfParams};
use serde::{Deserialize, Serialize};

/// User-level settings loaded from `~/.config/secretconf/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Format used when it cannot be guessed from a file name.
    pub default_format: Format,
    /// Argon2id work factor for new password envelopes and protected private keys.
    pub kdf: KdfParams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_format: Format::Json,
            kdf: KdfParams::default(),
        }
    }
}

/// Load settings from the default path; if missing, return defaults.
pub fn load() -> Result<Settings> {
    let path = default_path()?;
    load_from_path(path)
}

/// Load settings from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings: Settings = toml::from_str(&contents)?;
    settings.kdf.validate()?;
    Ok(settings)
}

/// Resolve the default settings path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("secretconf").join("config.toml"))
}

/// Write default settings unless a file is already there, so user edits survive.
pub fn write_default_if_missing(settings: &Settings) -> Result<PathBuf> {
    write_to_path_if_missing(settings, &default_path()?)
}

pub fn write_to_path_if_missing(settings: &Settings, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(settings)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_default_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = load_from_path(dir.path().join("config.toml")).expect("load");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn parses_custom_settings() {
        let contents = r#"
            default_format = "toml"
            [kdf]
            m_cost = 65536
            t_cost = 3
            p_cost = 4
        "#;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).expect("write temp config");

        let settings = load_from_path(&path).expect("load");
        assert_eq!(
            settings,
            Settings {
                default_format: Format::Toml,
                kdf: KdfParams::new(65536, 3, 4).expect("params"),
            }
        );
    }

    #[test]
    fn partial_settings_keep_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_format = \"ini\"\n").expect("write");

        let settings = load_from_path(&path).expect("load");
        assert_eq!(settings.default_format, Format::Ini);
        assert_eq!(settings.kdf, KdfParams::default());
    }

    #[test]
    fn rejects_out_of_range_work_factor() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[kdf]\nm_cost = 1\nt_cost = 1\np_cost = 1\n").expect("write");
        assert!(load_from_path(&path).is_err());
    }

    #[test]
    fn write_default_creates_file_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let settings = Settings {
            default_format: Format::Toml,
            kdf: KdfParams::default(),
        };

        write_to_path_if_missing(&settings, &path).expect("write should succeed");
        let second = write_to_path_if_missing(&Settings::default(), &path).expect("second write ok");
        assert_eq!(second, path);
        assert_eq!(load_from_path(&path).expect("load"), settings);
    }
}
