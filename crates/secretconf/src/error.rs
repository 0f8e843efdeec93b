use std::{io, path::PathBuf};

use secretconf_core::{ConfigError, SerializationError};
use secretconf_crypto::{CryptoError, SchemeId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} already exists (pass overwrite to replace it)", path.display())]
    AlreadyExists { path: PathBuf },
    #[error("no configuration file found; tried {}", join_paths(candidates))]
    NotFound { candidates: Vec<PathBuf> },
    #[error("input is encrypted with the {scheme} scheme but no scheme is configured")]
    Encrypted { scheme: SchemeId },
    #[error("the {scheme} scheme needs key material")]
    MissingKey { scheme: SchemeId },
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ConfigFileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ConfigFileError::Io {
            path: path.into(),
            source,
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
