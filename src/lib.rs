//! Request signing for the Electric Kiwi API.
//!
//! [`crypto`] reproduces the CryptoJS / `openssl enc` passphrase envelope;
//! [`token`] builds the per-request `x-token` header on top of it and
//! [`Signer`] holds the session state an API client needs.

pub mod credentials;
pub mod crypto;
pub mod error;
pub mod signer;
pub mod storage;
pub mod token;

pub use crate::credentials::{Credentials, password_hash};
pub use crate::error::{Error, Result};
pub use crate::signer::Signer;
pub use crate::storage::Storage;
pub use crate::token::{OpenedToken, Session, TokenPayload};
use anyhow::Context;
use directories::ProjectDirs;

/// Credential file in the platform data directory.
pub fn default_storage() -> anyhow::Result<Storage> {
    let project_dirs =
        ProjectDirs::from("", "", "ektoken").context("could not determine platform directories")?;

    let path = project_dirs.data_dir().join("credentials.json");

    Ok(Storage::new(path))
}
