use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use secretconf::{Format, SchemeId};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "secretconf",
    about = "Read and write encrypted configuration files",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate key material.
    #[command(subcommand)]
    Keygen(KeygenCommand),
    /// Encrypt a plain configuration file.
    Encrypt(TransformArgs),
    /// Decrypt an encrypted configuration file back to plain text.
    Decrypt(TransformArgs),
    /// Print one value from a plain or encrypted configuration file.
    Get(GetArgs),
    /// Change one value in place, re-encrypting with the same scheme.
    Set(SetArgs),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum KeygenCommand {
    /// Generate a 32-byte symmetric key (base64). Printed to stdout unless --out is given.
    Symmetric {
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Generate an X25519 key pair.
    Pair {
        #[arg(long, value_name = "PATH")]
        public: PathBuf,
        #[arg(long, value_name = "PATH")]
        private: PathBuf,
        /// Environment variable holding a passphrase that protects the private key.
        #[arg(long, value_name = "VAR")]
        passphrase_env: Option<String>,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct TransformArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    #[arg(long, value_enum)]
    pub scheme: SchemeArg,
    /// Configuration format; guessed from the file name when omitted.
    #[arg(long)]
    pub format: Option<Format>,
    /// Replace the output file if it exists.
    #[arg(long)]
    pub force: bool,
    #[command(flatten)]
    pub keys: KeyArgs,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GetArgs {
    pub file: PathBuf,
    pub key: String,
    #[arg(long)]
    pub section: Option<String>,
    /// Expected scheme; read from the file when omitted.
    #[arg(long, value_enum)]
    pub scheme: Option<SchemeArg>,
    #[arg(long)]
    pub format: Option<Format>,
    #[command(flatten)]
    pub keys: KeyArgs,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SetArgs {
    pub file: PathBuf,
    pub key: String,
    #[arg(required_unless_present = "value_env", conflicts_with = "value_env")]
    pub value: Option<String>,
    /// Environment variable holding the value, for values that should stay out of argv.
    #[arg(long, value_name = "VAR")]
    pub value_env: Option<String>,
    #[arg(long)]
    pub section: Option<String>,
    /// Expected scheme; read from the file when omitted.
    #[arg(long, value_enum)]
    pub scheme: Option<SchemeArg>,
    #[arg(long)]
    pub format: Option<Format>,
    #[command(flatten)]
    pub keys: KeyArgs,
}

/// Where key material comes from. Secrets are never taken as argument values.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyArgs {
    /// Environment variable holding the password.
    #[arg(long, value_name = "VAR")]
    pub password_env: Option<String>,
    /// File holding the password (trailing newline ignored).
    #[arg(long, value_name = "PATH")]
    pub password_file: Option<PathBuf>,
    /// Base64 salt file for password decryption. Defaults to `<input>.salt`
    /// when present, then to the salt stored in the file.
    #[arg(long, value_name = "PATH")]
    pub salt_file: Option<PathBuf>,
    /// Base64 symmetric key file.
    #[arg(long, value_name = "PATH")]
    pub key_file: Option<PathBuf>,
    #[arg(long, value_name = "PATH")]
    pub public_key: Option<PathBuf>,
    #[arg(long, value_name = "PATH")]
    pub private_key: Option<PathBuf>,
    /// Environment variable holding the private key passphrase.
    #[arg(long, value_name = "VAR")]
    pub passphrase_env: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeArg {
    Password,
    Symmetric,
    Asymmetric,
}

impl From<SchemeArg> for SchemeId {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Password => SchemeId::Password,
            SchemeArg::Symmetric => SchemeId::Symmetric,
            SchemeArg::Asymmetric => SchemeId::Asymmetric,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_init_subcommand() {
        let cli = Cli::try_parse_from(["secretconf", "config", "init"]).expect("parse should succeed");
        assert_eq!(cli.command, Command::Config(ConfigCommand::Init));
    }

    #[test]
    fn requires_a_subcommand() {
        assert!(Cli::try_parse_from(["secretconf"]).is_err());
    }

    #[test]
    fn parses_encrypt_with_password_env() {
        let cli = Cli::try_parse_from([
            "secretconf",
            "encrypt",
            "app.json",
            "app.json.pwenc",
            "--scheme",
            "password",
            "--password-env",
            "APP_PASSWORD",
        ])
        .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Encrypt(TransformArgs {
                input: PathBuf::from("app.json"),
                output: PathBuf::from("app.json.pwenc"),
                scheme: SchemeArg::Password,
                format: None,
                force: false,
                keys: KeyArgs {
                    password_env: Some("APP_PASSWORD".into()),
                    ..KeyArgs::default()
                },
            })
        );
    }

    #[test]
    fn parses_keygen_pair() {
        let cli = Cli::try_parse_from([
            "secretconf",
            "keygen",
            "pair",
            "--public",
            "id.pub",
            "--private",
            "id.key",
            "--passphrase-env",
            "KEY_PASS",
        ])
        .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Keygen(KeygenCommand::Pair {
                public: PathBuf::from("id.pub"),
                private: PathBuf::from("id.key"),
                passphrase_env: Some("KEY_PASS".into()),
            })
        );
    }

    #[test]
    fn parses_get_with_section_and_format() {
        let cli = Cli::try_parse_from([
            "secretconf",
            "get",
            "app.conf",
            "password",
            "--section",
            "database",
            "--format",
            "ini",
        ])
        .expect("parse should succeed");
        let Command::Get(args) = cli.command else {
            panic!("expected get");
        };
        assert_eq!(args.section.as_deref(), Some("database"));
        assert_eq!(args.format, Some(Format::Ini));
        assert_eq!(args.scheme, None);
    }

    #[test]
    fn set_takes_a_value_or_an_environment_variable() {
        let cli = Cli::try_parse_from(["secretconf", "set", "app.toml", "port", "8080"]).expect("parse should succeed");
        let Command::Set(args) = cli.command else {
            panic!("expected set");
        };
        assert_eq!(args.value.as_deref(), Some("8080"));

        let cli = Cli::try_parse_from(["secretconf", "set", "app.toml", "token", "--value-env", "TOKEN"])
            .expect("parse should succeed");
        let Command::Set(args) = cli.command else {
            panic!("expected set");
        };
        assert_eq!(args.value, None);
        assert_eq!(args.value_env.as_deref(), Some("TOKEN"));

        assert!(Cli::try_parse_from(["secretconf", "set", "app.toml", "port"]).is_err());
        assert!(Cli::try_parse_from(["secretconf", "set", "app.toml", "k", "v", "--value-env", "V"]).is_err());
    }

    #[test]
    fn rejects_unknown_scheme_and_format() {
        assert!(Cli::try_parse_from(["secretconf", "encrypt", "a", "b", "--scheme", "rot13"]).is_err());
        assert!(Cli::try_parse_from(["secretconf", "get", "a", "k", "--format", "yaml"]).is_err());
    }

    #[test]
    fn secrets_are_not_accepted_as_values() {
        assert!(Cli::try_parse_from(["secretconf", "encrypt", "a", "b", "--scheme", "password", "--password", "x"]).is_err());
    }
}
