//! Runtime configuration for the daemon

use anyhow::{bail, Context, Result};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;
use triecache::CacheConfig;

/// Longest accepted token lifetime, ten years
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Validated server settings
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address
    pub bind: String,
    /// HMAC key for signing bearer tokens
    pub secret_key: Vec<u8>,
    /// Lookup cache settings
    pub cache: CacheConfig,
    /// Period of the expired-entry sweep
    pub sweep_interval: Duration,
    /// Sustained requests per second per client
    pub rate_per_second: NonZeroU32,
    /// Requests a client may burst above the sustained rate
    pub rate_burst: NonZeroU32,
    /// Lifetime of an issued token
    pub token_ttl: Duration,
    /// Longest word accepted on write or lookup, in code points
    pub max_word_len: usize,
    /// Optional JSON file of users with bcrypt hashes
    pub users_file: Option<PathBuf>,
    /// Users given on the command line as (name, password)
    pub users: Vec<(String, String)>,
    /// bcrypt cost for passwords hashed at startup
    pub bcrypt_cost: u32,
}

impl Config {
    /// Check values that would only fail later at runtime
    pub fn validate(&self) -> Result<()> {
        if self.secret_key.is_empty() {
            bail!("SECRET_KEY environment variable is required");
        }
        if self.sweep_interval.is_zero() {
            bail!("Sweep interval must be greater than 0");
        }
        if self.token_ttl.is_zero() {
            bail!("Token lifetime must be greater than 0");
        }
        if self.token_ttl > MAX_TOKEN_TTL {
            bail!(
                "Token lifetime must not exceed {} seconds",
                MAX_TOKEN_TTL.as_secs()
            );
        }
        if self.max_word_len == 0 {
            bail!("Maximum word length must be greater than 0");
        }
        Ok(())
    }
}

/// Parse a `name:password` pair
pub fn parse_user_spec(spec: &str) -> Result<(String, String)> {
    let (name, password) = spec
        .split_once(':')
        .context("User must be given as name:password")?;

    if name.is_empty() || password.is_empty() {
        bail!("User name and password must not be empty");
    }

    Ok((name.to_string(), password.to_string()))
}

/// Wrap a rate limit setting, rejecting zero
pub fn non_zero(value: u32, what: &str) -> Result<NonZeroU32> {
    NonZeroU32::new(value).with_context(|| format!("{} must be greater than 0", what))
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        bind: "127.0.0.1:0".to_string(),
        secret_key: b"test-secret".to_vec(),
        cache: CacheConfig::default(),
        sweep_interval: Duration::from_secs(600),
        rate_per_second: NonZeroU32::new(1000).unwrap(),
        rate_burst: NonZeroU32::new(1000).unwrap(),
        token_ttl: Duration::from_secs(3600),
        max_word_len: 16,
        users_file: None,
        users: vec![("user1".to_string(), "password123".to_string())],
        bcrypt_cost: 4,
    }
}
