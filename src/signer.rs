//! Authenticated header set for outgoing API requests.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{Error, Result};
use crate::token::Session;

pub const CLIENT_HEADER: &str = "x-client";
pub const API_VERSION_HEADER: &str = "x-apiversion";
pub const TOKEN_HEADER: &str = "x-token";
pub const SID_HEADER: &str = "x-sid";

pub const CLIENT_ID: &str = "ek-app";
pub const API_VERSION: &str = "1_0";

/// Holds the session secret and login id for one API client.
///
/// Readers building tokens never observe a half-replaced session: a new
/// `/at/` token or login takes the write lock.
#[derive(Debug, Default)]
pub struct Signer {
    session: RwLock<Option<Session>>,
    sid: RwLock<Option<String>>,
}

impl Signer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
            sid: RwLock::new(None),
        }
    }

    pub fn set_session(&self, session: Session) {
        info!(offset = session.offset(), secret_len = session.secret_len(), "session secret replaced");
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    /// Parse and install the server-issued `/at/` token.
    pub fn set_at_token(&self, at_token: &str) -> Result<()> {
        self.set_session(Session::from_at_token(at_token)?);
        Ok(())
    }

    pub fn set_sid(&self, sid: impl Into<String>) {
        *self.sid.write().unwrap_or_else(PoisonError::into_inner) = Some(sid.into());
        info!("logged in");
    }

    /// Forget both the session secret and the login id.
    pub fn clear(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
        *self.sid.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn has_session(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Build a fresh `x-token` value for `endpoint`.
    pub fn token_for(&self, endpoint: &str, now: DateTime<Utc>) -> Result<String> {
        let guard = self.session.read().unwrap_or_else(PoisonError::into_inner);
        let session = guard
            .as_ref()
            .ok_or(Error::AuthenticationRequired("no session secret"))?;
        session.build_token(endpoint, now)
    }

    /// The login session id, for endpoints that need a logged-in customer.
    pub fn require_login(&self) -> Result<String> {
        self.sid
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::AuthenticationRequired("login required"))
    }

    /// Headers for a request to `endpoint`. `x-token` is only present once a
    /// session secret is installed and `x-sid` only after login.
    pub fn headers_for(&self, endpoint: &str, now: DateTime<Utc>) -> Result<Vec<(&'static str, String)>> {
        let mut headers = vec![
            (CLIENT_HEADER, CLIENT_ID.to_string()),
            (API_VERSION_HEADER, API_VERSION.to_string()),
        ];

        if self.has_session() {
            headers.push((TOKEN_HEADER, self.token_for(endpoint, now)?));
        }
        if let Ok(sid) = self.require_login() {
            headers.push((SID_HEADER, sid));
        }

        Ok(headers)
    }
}
