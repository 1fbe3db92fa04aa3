//! fairdraw command line entry point.

mod simulate;

use anyhow::Context;
use clap::Parser;
use fairdraw_commit_reveal::{create_commit, create_reveal, random_nonce, validate_reveal, Commit, RawCommit};
use fairdraw_crypto::{export_keypair, generate_keypair};
use fairdraw_service::ServiceConfig;
use fairdraw_types::{HashFunction, UserId};
use fairdraw_utils::LogFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fairdraw", about = "Commit-reveal fair draw tooling")]
struct Cli {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "FAIRDRAW_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output: "human" or "json".
    #[arg(long, env = "FAIRDRAW_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Transport request timeout in milliseconds.
    #[arg(long, env = "FAIRDRAW_REQUEST_TIMEOUT_MS")]
    request_timeout_ms: Option<u64>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "FAIRDRAW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Generate an Ed25519 key pair and print it as an exported key.
    Keygen,

    /// Print a fresh random nonce.
    Nonce,

    /// Hash a value into a commit and print it with the nonce used.
    Commit {
        #[arg(long)]
        data: String,

        #[arg(long)]
        user: String,

        /// Generated when omitted.
        #[arg(long)]
        nonce: Option<String>,

        /// Defaults to the configured hash function.
        #[arg(long = "hash")]
        hash_function: Option<HashFunction>,

        /// JSON metadata folded into the digest.
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Check that the given opening reproduces a commit (a JSON document).
    VerifyReveal {
        #[arg(long)]
        commit: String,

        #[arg(long)]
        data: String,

        #[arg(long)]
        nonce: String,

        #[arg(long)]
        user: String,

        #[arg(long)]
        metadata: Option<String>,
    },

    /// Run a complete draw between local peers over an in-memory transport.
    Simulate {
        #[arg(long, default_value_t = 3)]
        spots: usize,

        /// Make the last peer reveal with the wrong nonce.
        #[arg(long)]
        cheat: bool,
    },
}

fn raw_commit(data: String, nonce: String, user: String, metadata: Option<String>) -> anyhow::Result<RawCommit> {
    let raw = RawCommit::new(data, nonce, UserId::from(user));
    Ok(match metadata {
        Some(metadata) => raw.with_metadata(serde_json::from_str(&metadata).context("metadata is not JSON")?),
        None => raw,
    })
}

fn load_config(cli: &Cli) -> ServiceConfig {
    let mut config = match &cli.config {
        Some(path) => match ServiceConfig::from_toml_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load config {}: {e}, using defaults", path.display());
                ServiceConfig::default()
            }
        },
        None => ServiceConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(timeout) = cli.request_timeout_ms {
        config.request_timeout_ms = timeout;
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli);
    fairdraw_utils::init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::debug!(path = %path.display(), "configuration loaded");
    }

    match cli.command {
        Command::Keygen => {
            let keys = generate_keypair()?;
            println!("{}", serde_json::to_string_pretty(&export_keypair(&keys))?);
        }
        Command::Nonce => println!("{}", random_nonce()?),
        Command::Commit {
            data,
            user,
            nonce,
            hash_function,
            metadata,
        } => {
            let nonce = match nonce {
                Some(nonce) => nonce,
                None => random_nonce()?,
            };
            let raw = raw_commit(data, nonce.clone(), user, metadata)?;
            let commit = create_commit(&raw, hash_function.unwrap_or(config.default_hash_function))?;
            let out = serde_json::json!({ "commit": commit, "nonce": nonce });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::VerifyReveal {
            commit,
            data,
            nonce,
            user,
            metadata,
        } => {
            let commit: Commit = serde_json::from_str(&commit).context("commit is not a valid commit document")?;
            let reveal = create_reveal(raw_commit(data, nonce, user, metadata)?);
            if !validate_reveal(&reveal, &commit) {
                anyhow::bail!("reveal does not open the commit of {}", commit.user_id);
            }
            println!("valid");
        }
        Command::Simulate { spots, cheat } => {
            anyhow::ensure!(spots > 0, "a draw needs at least one spot");
            let outcome = simulate::run(config, spots, cheat).await?;
            println!("{outcome}");
        }
    }

    Ok(())
}
