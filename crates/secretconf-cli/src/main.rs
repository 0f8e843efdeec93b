mod cli;
mod commands;
mod config;
mod keys;

use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Command, ConfigCommand};

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let settings = config::load()?;
    match cli.command {
        Command::Version => print_version(),
        Command::Config(ConfigCommand::Init) => init_config(&settings)?,
        Command::Keygen(cmd) => commands::keygen(cmd, &settings)?,
        Command::Encrypt(args) => commands::encrypt(&args, &settings)?,
        Command::Decrypt(args) => commands::decrypt(&args, &settings)?,
        Command::Get(args) => println!("{}", commands::get(&args, &settings)?),
        Command::Set(args) => commands::set(&args, &settings)?,
    }

    Ok(())
}

fn init_tracing() {
    // Logs go to stderr so `get` output stays pipeable.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("secretconf {}", env!("CARGO_PKG_VERSION"));
}

fn init_config(settings: &config::Settings) -> Result<()> {
    let path = config::write_default_if_missing(settings)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
