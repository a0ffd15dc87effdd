use anyhow::{Context, Result, bail};
use chrono::Local;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::storage::Storage;

/// Hex MD5 of the password, the form the login endpoint accepts.
pub fn password_hash(password: &str) -> String {
    hex::encode(Md5::digest(password.as_bytes()))
}

/// Saved login: email plus password hash, never the password itself.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password_hash: String,
    saved: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Result<Self> {
        Self::from_hash(email, &password_hash(password))
    }

    pub fn from_hash(email: &str, password_hash: &str) -> Result<Self> {
        let email = email.trim();
        if email.is_empty() {
            bail!("email cannot be empty");
        }
        if password_hash.len() != 32 || !password_hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            bail!("password hash must be 32 hex characters");
        }

        Ok(Self {
            email: email.to_string(),
            password_hash: password_hash.to_ascii_lowercase(),
            saved: Local::now().to_string(),
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn saved(&self) -> &str {
        &self.saved
    }

    pub fn load(storage: &Storage) -> Result<Self> {
        if !storage.exists() {
            bail!("no saved credentials at {}", storage.path().display());
        }
        let data = storage.load()?;
        serde_json::from_slice(&data).context("failed to parse credentials file")
    }

    pub fn save(&self, storage: &Storage) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        storage.save(&data)?;
        info!(email = %self.email, path = %storage.path().display(), "credentials saved");
        Ok(())
    }
}
