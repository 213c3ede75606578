//! User credentials for token issuance
//!
//! Passwords are kept as bcrypt hashes only.

use anyhow::{Context, Result};
use bcrypt::{hash, verify};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;

/// Name and password seeded when nothing else is configured
const DEFAULT_USER: (&str, &str) = ("user1", "password123");

fn active_default() -> bool {
    true
}

/// User account information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Username
    pub username: String,
    /// BCrypt password hash
    pub password_hash: String,
    /// Whether the user may log in
    #[serde(default = "active_default")]
    pub active: bool,
}

impl User {
    /// Create a new user, hashing `password` at `cost`
    pub fn new(username: String, password: &str, cost: u32) -> Result<Self> {
        let password_hash = hash(password, cost).context("Failed to hash password")?;

        Ok(Self {
            username,
            password_hash,
            active: true,
        })
    }

    /// Verify password
    pub fn verify_password(&self, password: &str) -> bool {
        verify(password, &self.password_hash).unwrap_or(false)
    }
}

/// In-memory user database
pub struct UserManager {
    users: RwLock<HashMap<String, User>>,
    cost: u32,
}

impl UserManager {
    /// Create an empty user manager hashing at `cost`
    pub fn new(cost: u32) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            cost,
        }
    }

    /// Build the user set from the users file and command-line users
    ///
    /// Falls back to a default account if neither provides one.
    pub fn from_config(config: &Config) -> Result<Self> {
        let manager = Self::new(config.bcrypt_cost);

        if let Some(path) = &config.users_file {
            manager.load_file(path)?;
        }

        for (username, password) in &config.users {
            manager.create_user(username, password)?;
        }

        if manager.is_empty() {
            let (username, password) = DEFAULT_USER;
            info!("No users configured, creating default user");
            manager.create_user(username, password)?;
            warn!(
                "⚠️  Default user '{}' created with password '{}' - CHANGE THIS!",
                username, password
            );
        }

        info!("{} users available for login", manager.len());
        Ok(manager)
    }

    /// Load users from a JSON array of [`User`]
    ///
    /// # Returns
    /// * `Result<usize>` - Number of users loaded
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read users file {}", path.display()))?;
        let loaded: Vec<User> =
            serde_json::from_str(&content).context("Failed to parse users file")?;

        let count = loaded.len();
        let mut users = self.users.write();
        for user in loaded {
            users.insert(user.username.clone(), user);
        }

        info!("Loaded {} users from {}", count, path.display());
        Ok(count)
    }

    /// Create or replace a user
    pub fn create_user(&self, username: &str, password: &str) -> Result<()> {
        let user = User::new(username.to_string(), password, self.cost)?;

        if self.users.write().insert(username.to_string(), user).is_some() {
            warn!("Replaced existing user: {}", username);
        } else {
            info!("Created user: {}", username);
        }

        Ok(())
    }

    /// Authenticate a user
    pub fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        let user = self.users.read().get(username).cloned()?;

        if user.active && user.verify_password(password) {
            Some(user)
        } else {
            None
        }
    }

    /// Number of known users
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Check if no user is known
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}
