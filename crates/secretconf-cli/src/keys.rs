use std::{
    env,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use color_eyre::{
    eyre::{bail, eyre, WrapErr},
    Result,
};
use secretconf::{
    AsymmetricScheme, EncryptionScheme, KeyMaterial, PasswordScheme, PrivateKey, PublicKey, Salt, SchemeId,
    SymmetricKey, SymmetricScheme,
};
use tracing::debug;
use zeroize::Zeroizing;

use crate::{cli::KeyArgs, config::Settings};

/// Which half of a scheme the key is needed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Seal,
    Open,
}

/// Key material read from files or the environment, owned for the duration
/// of one command.
pub enum LoadedKey {
    Password {
        password: Zeroizing<String>,
        salt: Option<Salt>,
    },
    Symmetric(SymmetricKey),
    Public(PublicKey),
    Private(PrivateKey),
}

impl LoadedKey {
    pub fn material(&self) -> KeyMaterial<'_> {
        match self {
            LoadedKey::Password { password, salt } => KeyMaterial::Password {
                password: password.as_str(),
                salt: salt.as_ref().map(|salt| salt.as_bytes().as_slice()),
            },
            LoadedKey::Symmetric(key) => KeyMaterial::Symmetric(key.as_bytes()),
            LoadedKey::Public(key) => KeyMaterial::Public(key),
            LoadedKey::Private(key) => KeyMaterial::Private(key),
        }
    }

    /// The key that re-seals what this key opened: a private key turns into
    /// its public half, every other kind is used as is.
    pub fn into_sealing(self) -> LoadedKey {
        match self {
            LoadedKey::Private(key) => LoadedKey::Public(key.public_key()),
            other => other,
        }
    }
}

/// Scheme instance for `id`, using the configured work factor.
pub fn build_scheme(id: SchemeId, settings: &Settings) -> EncryptionScheme {
    match id {
        SchemeId::Password => PasswordScheme::new(settings.kdf).into(),
        SchemeId::Symmetric => SymmetricScheme.into(),
        SchemeId::Asymmetric => AsymmetricScheme::new(settings.kdf).into(),
    }
}

/// Resolve the key for `scheme` from the command line options.
///
/// `encrypted_file` is the envelope being opened; its `<file>.salt` sibling
/// is used when no salt file is named.
pub fn resolve(
    scheme: SchemeId,
    direction: Direction,
    args: &KeyArgs,
    settings: &Settings,
    encrypted_file: Option<&Path>,
) -> Result<LoadedKey> {
    match (scheme, direction) {
        (SchemeId::Password, Direction::Seal) => Ok(LoadedKey::Password {
            password: read_password(args)?,
            salt: None,
        }),
        (SchemeId::Password, Direction::Open) => {
            let salt = match (&args.salt_file, encrypted_file.map(salt_path)) {
                (Some(path), _) => Some(read_salt(path)?),
                (None, Some(path)) if path.exists() => Some(read_salt(&path)?),
                _ => None,
            };
            Ok(LoadedKey::Password {
                password: read_password(args)?,
                salt,
            })
        }
        (SchemeId::Symmetric, _) => {
            let path = args
                .key_file
                .as_ref()
                .ok_or_else(|| eyre!("the symmetric scheme needs --key-file"))?;
            let text = read_secret(path)?;
            Ok(LoadedKey::Symmetric(SymmetricKey::from_base64(&text)?))
        }
        (SchemeId::Asymmetric, Direction::Seal) => {
            let path = args
                .public_key
                .as_ref()
                .ok_or_else(|| eyre!("encrypting with the asymmetric scheme needs --public-key"))?;
            let text = fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
            let key = AsymmetricScheme::new(settings.kdf).loads_public_key(&text)?;
            debug!(fingerprint = %key.fingerprint(), "loaded public key");
            Ok(LoadedKey::Public(key))
        }
        (SchemeId::Asymmetric, Direction::Open) => {
            let path = args
                .private_key
                .as_ref()
                .ok_or_else(|| eyre!("decrypting with the asymmetric scheme needs --private-key"))?;
            let text = read_secret(path)?;
            let passphrase = args.passphrase_env.as_deref().map(read_env).transpose()?;
            let key = AsymmetricScheme::new(settings.kdf)
                .loads_private_key(&text, passphrase.as_ref().map(|p| p.as_str()))?;
            Ok(LoadedKey::Private(key))
        }
    }
}

/// `<file>.salt`, next to the encrypted file.
pub fn salt_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(".salt");
    PathBuf::from(name)
}

pub fn read_salt(path: &Path) -> Result<Salt> {
    let text = fs::read_to_string(path).wrap_err_with(|| format!("reading salt {}", path.display()))?;
    Ok(Salt::from_base64(&text)?)
}

/// Read a secret-bearing variable. Empty values are accepted.
pub fn read_env(name: &str) -> Result<Zeroizing<String>> {
    env::var(name)
        .map(Zeroizing::new)
        .map_err(|_| eyre!("environment variable {name} is not set"))
}

fn read_password(args: &KeyArgs) -> Result<Zeroizing<String>> {
    match (&args.password_env, &args.password_file) {
        (Some(_), Some(_)) => bail!("pass only one of --password-env and --password-file"),
        (Some(var), None) => read_env(var),
        (None, Some(path)) => {
            let mut text = read_secret(path)?;
            let trimmed = text.trim_end_matches(['\r', '\n']).len();
            text.truncate(trimmed);
            Ok(text)
        }
        (None, None) => bail!("the password scheme needs --password-env or --password-file"),
    }
}

fn read_secret(path: &Path) -> Result<Zeroizing<String>> {
    fs::read_to_string(path)
        .map(Zeroizing::new)
        .wrap_err_with(|| format!("reading {}", path.display()))
}

/// Create `path` with `contents`, refusing to replace an existing file.
/// On Unix the file is readable by the owner only.
pub fn write_new(path: &Path, contents: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .wrap_err_with(|| format!("creating {}", path.display()))?;
    file.write_all(contents)?;
    file.flush()?;
    Ok(())
}
