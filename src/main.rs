//! Binary entry point for chancache.
//!
//! Operator tool for inspecting and repairing the channel connectivity cache
//! by hand, e.g. after a `CacheWrite` error was logged by the service.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use chancache::config::CacheConfig;
use chancache::observability;
use chancache::{
    ChannelCache, ConnectivityCache, Error, RedisSetBackend, ResilientChannelCache,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Exit code for `has` when the thing is not connected.
const EXIT_NOT_CONNECTED: u8 = 1;

/// Exit code for any error, including a degraded lookup.
const EXIT_ERROR: u8 = 2;

/// Chancache - channel connectivity cache operator tool.
#[derive(Parser)]
#[command(name = "chancache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "CHANCACHE_CONFIG")]
    config: Option<PathBuf>,

    /// Redis URL (overrides configuration).
    #[arg(long, global = true)]
    redis_url: Option<String>,

    /// Per-operation timeout in milliseconds (overrides configuration).
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Record that a thing is connected to a channel.
    Connect {
        /// Channel ID.
        channel_id: String,
        /// Thing IDs.
        #[arg(required = true)]
        thing_ids: Vec<String>,
    },

    /// Check whether a thing is connected to a channel.
    ///
    /// Exits 0 if connected, 1 if not, 2 if the cache could not answer.
    Has {
        /// Channel ID.
        channel_id: String,
        /// Thing ID.
        thing_id: String,
    },

    /// Remove a thing's connection to a channel.
    Disconnect {
        /// Channel ID.
        channel_id: String,
        /// Thing IDs.
        #[arg(required = true)]
        thing_ids: Vec<String>,
    },

    /// Drop every connection of a channel.
    Remove {
        /// Channel ID.
        channel_id: String,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::from(EXIT_ERROR);
        },
    };

    let logging = if cli.verbose {
        config.logging.clone().verbose()
    } else {
        config.logging.clone()
    };
    if let Err(e) = observability::init(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::from(EXIT_ERROR);
    }

    match run_command(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_ERROR)
        },
    }
}

/// Loads configuration and applies command-line overrides.
fn load_config(cli: &Cli) -> anyhow::Result<CacheConfig> {
    let mut config = CacheConfig::load(cli.config.as_deref())?;
    if let Some(url) = &cli.redis_url {
        config.redis_url.clone_from(url);
    }
    if let Some(timeout) = cli.timeout_ms {
        config.operation_timeout_ms = timeout;
    }
    config.validate()?;
    Ok(config)
}

/// Builds the cache described by the configuration.
async fn build_cache(config: &CacheConfig) -> anyhow::Result<Arc<dyn ChannelCache>> {
    let backend = RedisSetBackend::connect_within(&config.redis_url, config.operation_timeout())
        .await
        .context("connecting to Redis")?;
    let cache = ConnectivityCache::with_key_prefix(backend, config.key_prefix.clone());

    if config.resilience.enabled {
        Ok(Arc::new(ResilientChannelCache::new(
            cache,
            &config.resilience,
            "redis",
        )))
    } else {
        Ok(Arc::new(cache))
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, config: &CacheConfig) -> anyhow::Result<ExitCode> {
    let cache = build_cache(config).await?;

    match command {
        Commands::Connect {
            channel_id,
            thing_ids,
        } => {
            for thing_id in &thing_ids {
                cache
                    .connect(&config.call_context(), &channel_id, thing_id)
                    .await
                    .with_context(|| format!("connect {thing_id} to {channel_id}"))?;
                println!("connected {thing_id} -> {channel_id}");
            }
            Ok(ExitCode::SUCCESS)
        },

        Commands::Has {
            channel_id,
            thing_id,
        } => match cache
            .has_thing(&config.call_context(), &channel_id, &thing_id)
            .await
        {
            Ok(true) => {
                println!("connected");
                Ok(ExitCode::SUCCESS)
            },
            Ok(false) => {
                println!("not connected");
                Ok(ExitCode::from(EXIT_NOT_CONNECTED))
            },
            Err(e @ Error::ReadDegraded { .. }) => {
                println!("unknown (cache degraded)");
                Err(e.into())
            },
            Err(e) => Err(e.into()),
        },

        Commands::Disconnect {
            channel_id,
            thing_ids,
        } => {
            for thing_id in &thing_ids {
                cache
                    .disconnect(&config.call_context(), &channel_id, thing_id)
                    .await
                    .with_context(|| format!("disconnect {thing_id} from {channel_id}"))?;
                println!("disconnected {thing_id} -x {channel_id}");
            }
            Ok(ExitCode::SUCCESS)
        },

        Commands::Remove { channel_id } => {
            cache
                .remove(&config.call_context(), &channel_id)
                .await
                .with_context(|| format!("remove {channel_id}"))?;
            println!("removed {channel_id}");
            Ok(ExitCode::SUCCESS)
        },
    }
}
