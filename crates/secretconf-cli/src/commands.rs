use std::{fs, path::Path};

use color_eyre::{
    eyre::{bail, WrapErr},
    Result,
};
use secretconf::{AsymmetricScheme, ConfigFile, Envelope, Format, Salt, SchemeId, Serializer, SymmetricKey};
use tracing::info;
use zeroize::Zeroizing;

use crate::{
    cli::{GetArgs, KeygenCommand, SetArgs, TransformArgs},
    config::Settings,
    keys::{self, Direction},
};

/// Explicit `--format`, else the file name, else the configured default.
fn pick_format(explicit: Option<Format>, path: &Path, settings: &Settings) -> Format {
    explicit
        .or_else(|| Format::from_path(path))
        .unwrap_or(settings.default_format)
}

pub fn keygen(cmd: KeygenCommand, settings: &Settings) -> Result<()> {
    match cmd {
        KeygenCommand::Symmetric { out } => {
            let text = SymmetricKey::generate().to_base64();
            match out {
                Some(path) => {
                    keys::write_new(&path, format!("{}\n", text.as_str()).as_bytes())?;
                    println!("Symmetric key written to {}", path.display());
                }
                None => println!("{}", text.as_str()),
            }
        }
        KeygenCommand::Pair {
            public,
            private,
            passphrase_env,
        } => {
            for path in [&public, &private] {
                if path.exists() {
                    bail!("{} already exists", path.display());
                }
            }
            let passphrase = passphrase_env.as_deref().map(keys::read_env).transpose()?;
            let scheme = AsymmetricScheme::new(settings.kdf);
            let pair = scheme.generate_keys();

            let private_text = scheme.dumps_private_key(&pair.private, passphrase.as_ref().map(|p| p.as_str()))?;
            keys::write_new(&private, private_text.as_bytes())?;
            keys::write_new(&public, scheme.dumps_public_key(&pair.public).as_bytes())?;
            info!(protected = passphrase.is_some(), "key pair generated");
            println!("Public key:  {}", public.display());
            println!("Private key: {}", private.display());
            println!("Fingerprint: {}", pair.public.fingerprint());
        }
    }
    Ok(())
}

pub fn encrypt(args: &TransformArgs, settings: &Settings) -> Result<()> {
    let format = pick_format(args.format, &args.input, settings);
    let scheme = SchemeId::from(args.scheme);
    let salt_file = args
        .keys
        .salt_file
        .clone()
        .unwrap_or_else(|| keys::salt_path(&args.output));
    if scheme == SchemeId::Password && !args.force && salt_file.exists() {
        bail!("{} already exists (use --force to replace it)", salt_file.display());
    }

    let plain = ConfigFile::load(format.serializer(), None, &args.input, None)
        .wrap_err_with(|| format!("reading {}", args.input.display()))?;
    let key = keys::resolve(scheme, Direction::Seal, &args.keys, settings, None)?;
    let file = ConfigFile::from_parts(
        format.serializer(),
        Some(keys::build_scheme(scheme, settings)),
        plain.into_store(),
    );
    let salt = file.dump(&args.output, Some(&key.material()), args.force)?;

    println!("Encrypted {} -> {}", args.input.display(), args.output.display());
    if let Some(salt) = salt {
        write_salt(&salt_file, &salt, args.force)?;
    }
    Ok(())
}

fn write_salt(path: &Path, salt: &Salt, overwrite: bool) -> Result<()> {
    let text = format!("{}\n", salt.to_base64());
    if overwrite {
        fs::write(path, text).wrap_err_with(|| format!("writing {}", path.display()))?;
    } else {
        keys::write_new(path, text.as_bytes())?;
    }
    println!("Salt written to {} (needed to decrypt)", path.display());
    Ok(())
}

pub fn decrypt(args: &TransformArgs, settings: &Settings) -> Result<()> {
    let format = pick_format(args.format, &args.input, settings);
    let scheme = SchemeId::from(args.scheme);
    let key = keys::resolve(scheme, Direction::Open, &args.keys, settings, Some(&args.input))?;
    let encrypted = ConfigFile::load(
        format.serializer(),
        Some(keys::build_scheme(scheme, settings)),
        &args.input,
        Some(&key.material()),
    )
    .wrap_err_with(|| format!("decrypting {}", args.input.display()))?;

    let plain = ConfigFile::from_parts(format.serializer(), None, encrypted.into_store());
    plain.dump(&args.output, None, args.force)?;
    println!("Decrypted {} -> {}", args.input.display(), args.output.display());
    Ok(())
}

/// Look up one value. The scheme is read from the file unless given.
pub fn get(args: &GetArgs, settings: &Settings) -> Result<String> {
    let bytes = fs::read(&args.file).wrap_err_with(|| format!("reading {}", args.file.display()))?;
    let format = pick_format(args.format, &args.file, settings);
    let scheme = args.scheme.map(SchemeId::from).or_else(|| Envelope::detect(&bytes));

    let file = match scheme {
        None => ConfigFile::loads(format.serializer(), None, &bytes, None)?,
        Some(scheme) => {
            let key = keys::resolve(scheme, Direction::Open, &args.keys, settings, Some(&args.file))?;
            ConfigFile::loads(
                format.serializer(),
                Some(keys::build_scheme(scheme, settings)),
                &bytes,
                Some(&key.material()),
            )?
        }
    };
    let value = match &args.section {
        Some(section) => file.get_in(section, &args.key)?,
        None => file.get(&args.key)?,
    };
    Ok(value.to_string())
}

/// Update one value and write the file back in place. Encrypted files are
/// re-sealed with the same scheme; a private key re-seals to its own public
/// half, and a password file gets a fresh salt.
pub fn set(args: &SetArgs, settings: &Settings) -> Result<()> {
    let bytes = fs::read(&args.file).wrap_err_with(|| format!("reading {}", args.file.display()))?;
    let format = pick_format(args.format, &args.file, settings);
    let scheme = args.scheme.map(SchemeId::from).or_else(|| Envelope::detect(&bytes));
    let value = match (&args.value, &args.value_env) {
        (Some(value), _) => Zeroizing::new(value.clone()),
        (None, Some(var)) => keys::read_env(var)?,
        (None, None) => bail!("pass a value or --value-env"),
    };

    let Some(scheme) = scheme else {
        let mut file = ConfigFile::loads(format.serializer(), None, &bytes, None)?;
        assign(&mut file, args, &value)?;
        file.dump(&args.file, None, true)?;
        println!("Updated {}", args.file.display());
        return Ok(());
    };

    let key = keys::resolve(scheme, Direction::Open, &args.keys, settings, Some(&args.file))?;
    let mut file = ConfigFile::loads(
        format.serializer(),
        Some(keys::build_scheme(scheme, settings)),
        &bytes,
        Some(&key.material()),
    )?;
    assign(&mut file, args, &value)?;

    let sealing = key.into_sealing();
    let salt = file.dump(&args.file, Some(&sealing.material()), true)?;
    println!("Updated {}", args.file.display());
    if let Some(salt) = salt {
        let salt_file = args
            .keys
            .salt_file
            .clone()
            .unwrap_or_else(|| keys::salt_path(&args.file));
        write_salt(&salt_file, &salt, true)?;
    }
    Ok(())
}

fn assign<S: Serializer>(file: &mut ConfigFile<S>, args: &SetArgs, value: &str) -> Result<()> {
    match &args.section {
        Some(section) => file.set_in(section.as_str(), args.key.as_str(), value)?,
        None => file.set(args.key.as_str(), value)?,
    }
    Ok(())
}
