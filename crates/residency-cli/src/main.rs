use std::path::PathBuf;

use clap::{Parser, Subcommand};
use residency_core::ResidencyConfig;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "residency", version, about = "Residency platform API")]
struct Cli {
    /// Configuration file (YAML). Environment variables override its values.
    #[arg(long, short, global = true, env = "RESIDENCY_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset, e.g. "debug" or "residency_server=debug".
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API.
    Serve {
        /// Keep data in memory instead of PostgreSQL (local development).
        #[arg(long, default_value_t = false)]
        memory: bool,
    },

    /// Apply the embedded database schema.
    Migrate {
        /// Only print the current schema version.
        #[arg(long, default_value_t = false)]
        status: bool,
    },

    /// Session signing keys.
    Keys {
        #[command(subcommand)]
        cmd: KeysCommand,
    },

    /// Configuration helpers.
    Config {
        #[command(subcommand)]
        cmd: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate an Ed25519 keypair for admin sessions.
    Generate {
        /// Directory to write private.key and public.key into. Prints to stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration and print it with secrets masked.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.cmd {
        Command::Serve { memory } => {
            let config = ResidencyConfig::load(cli.config.as_deref())?;
            commands::serve::run(config, memory).await?
        }
        Command::Migrate { status } => {
            let config = ResidencyConfig::load(cli.config.as_deref())?;
            commands::migrate::run(&config, status).await?
        }
        Command::Keys {
            cmd: KeysCommand::Generate { output },
        } => commands::keys::generate(output)?,
        Command::Config {
            cmd: ConfigCommand::Check,
        } => commands::check::run(cli.config.as_deref())?,
    }

    Ok(())
}
