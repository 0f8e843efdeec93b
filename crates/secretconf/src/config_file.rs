use std::{
    fmt,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use secretconf_core::{ConfigStore, Entry, Serializer};
use secretconf_crypto::{EncryptionScheme, Envelope, KeyMaterial, Salt};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};
use zeroize::Zeroizing;

use crate::error::ConfigFileError;

/// A configuration store bound to one on-disk format and, optionally, one
/// encryption scheme.
///
/// `key` arguments are ignored when no scheme is bound and required when one
/// is. Password dumps return the freshly generated salt, which the caller may
/// keep out of band; loading without it falls back to the salt stored in the
/// envelope.
pub struct ConfigFile<S: Serializer> {
    store: ConfigStore,
    serializer: S,
    scheme: Option<EncryptionScheme>,
}

impl<S: Serializer> ConfigFile<S> {
    /// An empty, unencrypted configuration.
    pub fn new(serializer: S) -> Self {
        Self {
            store: ConfigStore::new(),
            serializer,
            scheme: None,
        }
    }

    /// An empty configuration that is encrypted on dump.
    pub fn with_scheme(serializer: S, scheme: impl Into<EncryptionScheme>) -> Self {
        Self {
            store: ConfigStore::new(),
            serializer,
            scheme: Some(scheme.into()),
        }
    }

    pub fn from_parts(serializer: S, scheme: Option<EncryptionScheme>, store: ConfigStore) -> Self {
        Self {
            store,
            serializer,
            scheme,
        }
    }

    /// Install a defaults layer under the current entries.
    pub fn with_defaults<I, E>(mut self, defaults: I) -> Result<Self, ConfigFileError>
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        self.store.set_defaults(defaults)?;
        Ok(self)
    }

    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    pub fn scheme(&self) -> Option<&EncryptionScheme> {
        self.scheme.as_ref()
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConfigStore {
        &mut self.store
    }

    pub fn into_store(self) -> ConfigStore {
        self.store
    }

    pub fn get(&self, key: &str) -> Result<&str, ConfigFileError> {
        Ok(self.store.get(key)?)
    }

    pub fn get_in(&self, section: &str, key: &str) -> Result<&str, ConfigFileError> {
        Ok(self.store.get_in(section, key)?)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), ConfigFileError> {
        Ok(self.store.set(key, value)?)
    }

    pub fn set_in(
        &mut self,
        section: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ConfigFileError> {
        Ok(self.store.set_in(section, key, value)?)
    }

    /// `stem.<ext>` for plain files, `stem.<ext>.<scheme suffix>` when encrypted.
    pub fn suggested_file_name(&self, stem: &str) -> String {
        match &self.scheme {
            Some(scheme) => format!("{stem}.{}.{}", self.serializer.extension(), scheme.id().file_suffix()),
            None => format!("{stem}.{}", self.serializer.extension()),
        }
    }

    /// Serialize, and encrypt if a scheme is bound.
    pub fn dumps(&self, key: Option<&KeyMaterial<'_>>) -> Result<(Vec<u8>, Option<Salt>), ConfigFileError> {
        let encoded = self.serializer.encode(&self.store)?;
        let Some(scheme) = &self.scheme else {
            return Ok((encoded, None));
        };
        let plaintext = Zeroizing::new(encoded);
        let key = key.ok_or(ConfigFileError::MissingKey { scheme: scheme.id() })?;
        let sealed = scheme.seal(&plaintext, key)?;
        Ok((sealed.bytes, sealed.salt))
    }

    /// Write the configuration to `path` atomically. An existing file is only
    /// replaced when `overwrite` is set.
    #[instrument(skip_all, fields(path = %path.display(), format = self.serializer.name(), scheme = self.scheme_name()))]
    pub fn dump(
        &self,
        path: &Path,
        key: Option<&KeyMaterial<'_>>,
        overwrite: bool,
    ) -> Result<Option<Salt>, ConfigFileError> {
        if !overwrite && path.exists() {
            return Err(ConfigFileError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        let (bytes, salt) = self.dumps(key)?;
        write_atomic(path, &bytes, overwrite)?;
        info!(bytes = bytes.len(), "configuration written");
        Ok(salt)
    }

    /// Decrypt (when a scheme is bound) and parse `bytes`.
    ///
    /// Without a scheme, envelope input is refused rather than parsed as
    /// configuration.
    pub fn loads(
        serializer: S,
        scheme: Option<EncryptionScheme>,
        bytes: &[u8],
        key: Option<&KeyMaterial<'_>>,
    ) -> Result<Self, ConfigFileError> {
        let store = match &scheme {
            Some(scheme) => {
                let key = key.ok_or(ConfigFileError::MissingKey { scheme: scheme.id() })?;
                let plaintext = scheme.open(bytes, key)?;
                serializer.decode(&plaintext)?
            }
            None => {
                if let Some(found) = Envelope::detect(bytes) {
                    return Err(ConfigFileError::Encrypted { scheme: found });
                }
                serializer.decode(bytes)?
            }
        };
        debug!(
            format = serializer.name(),
            sections = store.sections().len(),
            "configuration parsed"
        );
        Ok(Self {
            store,
            serializer,
            scheme,
        })
    }

    #[instrument(skip_all, fields(path = %path.display(), format = serializer.name()))]
    pub fn load(
        serializer: S,
        scheme: Option<EncryptionScheme>,
        path: &Path,
        key: Option<&KeyMaterial<'_>>,
    ) -> Result<Self, ConfigFileError> {
        let bytes = fs::read(path).map_err(|e| ConfigFileError::io(path, e))?;
        Self::loads(serializer, scheme, &bytes, key)
    }

    /// Load the first candidate that exists. Missing files are skipped; any
    /// other read error stops the search.
    pub fn load_first<I, P>(
        serializer: S,
        scheme: Option<EncryptionScheme>,
        candidates: I,
        key: Option<&KeyMaterial<'_>>,
    ) -> Result<Self, ConfigFileError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut tried = Vec::new();
        for candidate in candidates {
            let path = candidate.as_ref();
            match fs::read(path) {
                Ok(bytes) => {
                    debug!(path = %path.display(), skipped = tried.len(), "loading candidate");
                    return Self::loads(serializer, scheme, &bytes, key);
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => tried.push(path.to_path_buf()),
                Err(err) => return Err(ConfigFileError::io(path, err)),
            }
        }
        Err(ConfigFileError::NotFound { candidates: tried })
    }

    fn scheme_name(&self) -> &'static str {
        self.scheme.map_or("none", |scheme| scheme.id().as_str())
    }
}

impl<S: Serializer> fmt::Debug for ConfigFile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigFile")
            .field("format", &self.serializer.name())
            .field("scheme", &self.scheme_name())
            .field("entries", &self.store.entries().len())
            .finish()
    }
}

fn write_atomic(path: &Path, bytes: &[u8], overwrite: bool) -> Result<(), ConfigFileError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| ConfigFileError::io(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| ConfigFileError::io(parent, e))?;
    tmp.write_all(bytes).map_err(|e| ConfigFileError::io(tmp.path(), e))?;
    tmp.flush().map_err(|e| ConfigFileError::io(tmp.path(), e))?;

    let persisted = if overwrite {
        tmp.persist(path)
    } else {
        tmp.persist_noclobber(path)
    };
    persisted.map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            ConfigFileError::AlreadyExists {
                path: path.to_path_buf(),
            }
        } else {
            ConfigFileError::io(PathBuf::from(path), e.error)
        }
    })?;
    Ok(())
}
