//! Autocomplete Daemon - JSON/HTTP prefix lookup server

mod auth;
mod config;
mod error;
mod handlers;
mod logging;
mod rate_limit;
mod server;
mod users;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::info;
use triecache::{CacheConfig, InvalidationPolicy};

use crate::config::{non_zero, parse_user_spec, Config};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Token signing secret
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Lifetime of cached lookups, in seconds
    #[arg(long, default_value_t = 300)]
    cache_ttl_secs: u64,

    /// Period of the expired-entry sweep, in seconds
    #[arg(long, default_value_t = 600)]
    sweep_interval_secs: u64,

    /// Cache invalidation on writes: flush or precise
    #[arg(long, default_value = "flush")]
    invalidation: InvalidationPolicy,

    /// Sustained requests per second per client
    #[arg(long, default_value_t = 1)]
    rate_per_second: u32,

    /// Burst size per client
    #[arg(long, default_value_t = 3)]
    rate_burst: u32,

    /// Lifetime of issued tokens, in seconds
    #[arg(long, default_value_t = 24 * 60 * 60)]
    token_ttl_secs: u64,

    /// Longest accepted word, in characters
    #[arg(long, default_value_t = 256)]
    max_word_len: usize,

    /// JSON file of users with bcrypt password hashes
    #[arg(long)]
    users_file: Option<PathBuf>,

    /// Extra user as name:password (repeatable)
    #[arg(long = "user")]
    users: Vec<String>,

    /// Print the bcrypt hash of a password for the users file and exit
    #[arg(long, value_name = "PASSWORD")]
    hash_password: Option<String>,

    /// Health check mode (for Docker)
    #[arg(long)]
    health: bool,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let users = self
            .users
            .iter()
            .map(|spec| parse_user_spec(spec))
            .collect::<Result<Vec<_>>>()?;

        let config = Config {
            bind: self.bind,
            secret_key: self.secret_key.unwrap_or_default().into_bytes(),
            cache: CacheConfig {
                ttl: Duration::from_secs(self.cache_ttl_secs),
                policy: self.invalidation,
            },
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            rate_per_second: non_zero(self.rate_per_second, "Rate per second")?,
            rate_burst: non_zero(self.rate_burst, "Rate burst")?,
            token_ttl: Duration::from_secs(self.token_ttl_secs),
            max_word_len: self.max_word_len,
            users_file: self.users_file,
            users,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args = Args::parse();

    if let Some(password) = &args.hash_password {
        let hash =
            bcrypt::hash(password, bcrypt::DEFAULT_COST).context("Failed to hash password")?;
        println!("{}", hash);
        return Ok(());
    }

    // Health check
    if args.health {
        match TcpStream::connect(&args.bind).await {
            Ok(_) => {
                println!("OK");
                std::process::exit(0);
            }
            Err(_) => {
                eprintln!("FAILED");
                std::process::exit(1);
            }
        }
    }

    let config = args.into_config()?;

    info!("Starting Autocomplete Daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("Binding to {}", config.bind);
    info!(
        "Cache TTL: {:?}, invalidation: {:?}",
        config.cache.ttl, config.cache.policy
    );
    info!(
        "Rate limit: {}/s per client, burst {}",
        config.rate_per_second, config.rate_burst
    );

    server::run(config).await
}
