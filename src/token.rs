//! Per-request `x-token` construction.
//!
//! A token is the base64 envelope of `endpoint|expiry|nonce`, encrypted under
//! a random-length prefix of the session secret. The decimal prefix length is
//! spliced into the base64 text at the session offset so the server can
//! recover it.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto;
use crate::error::{Error, Result};

/// Shortest secret prefix used as a passphrase.
pub const MIN_PREFIX_LEN: usize = 10;
/// Secret bytes that are never used as passphrase.
pub const SECRET_TAIL: usize = 2;
/// Seconds added to the current time to form the token expiry.
pub const TOKEN_TTL_SECS: i64 = 30;
/// Characters in the per-request nonce.
pub const NONCE_LEN: usize = 16;
const NONCE_ALPHABET: &[u8; 16] = b"0123456789ABCDEF";

/// Largest valid offset (two decimal digits).
pub const MAX_OFFSET: usize = 99;
const OFFSET_DIGITS: usize = 2;
const AT_TOKEN_SUFFIX: usize = 2;

/// Session secret and splice offset obtained from the server's `/at/` token.
///
/// Immutable once created; the secret is wiped on drop.
pub struct Session {
    secret: Zeroizing<String>,
    offset: usize,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("secret", &format_args!("<{} bytes>", self.secret.len()))
            .field("offset", &self.offset)
            .finish()
    }
}

impl Session {
    pub fn new(secret: impl Into<String>, offset: usize) -> Result<Self> {
        let secret = Zeroizing::new(secret.into());
        if !secret.is_ascii() {
            return Err(Error::precondition("session secret must be ASCII"));
        }
        if offset > MAX_OFFSET {
            return Err(Error::precondition(format!(
                "secret offset {offset} exceeds {MAX_OFFSET}"
            )));
        }
        Ok(Self { secret, offset })
    }

    /// Parses `NN<secret>XX`: `NN` is the decimal offset and the two trailing
    /// characters are discarded.
    pub fn from_at_token(token: &str) -> Result<Self> {
        let token = token.trim();
        if !token.is_ascii() {
            return Err(Error::precondition("session token must be ASCII"));
        }
        if token.len() < OFFSET_DIGITS + AT_TOKEN_SUFFIX {
            return Err(Error::precondition("session token too short"));
        }

        let digits = &token[..OFFSET_DIGITS];
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::precondition(format!(
                "session token offset '{digits}' is not numeric"
            )));
        }
        let offset: usize = digits
            .parse()
            .map_err(|_| Error::precondition("invalid session token offset"))?;

        Self::new(&token[OFFSET_DIGITS..token.len() - AT_TOKEN_SUFFIX], offset)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn secret_len(&self) -> usize {
        self.secret.len()
    }

    fn max_prefix_len(&self) -> Result<usize> {
        if self.secret.len() < MIN_PREFIX_LEN + SECRET_TAIL {
            return Err(Error::precondition(format!(
                "session secret must be at least {} bytes, got {}",
                MIN_PREFIX_LEN + SECRET_TAIL,
                self.secret.len()
            )));
        }
        Ok(self.secret.len() - SECRET_TAIL)
    }

    fn passphrase(&self, prefix_len: usize) -> &[u8] {
        &self.secret.as_bytes()[..prefix_len]
    }

    /// Build the `x-token` value for `endpoint` using the thread RNG.
    pub fn build_token(&self, endpoint: &str, now: DateTime<Utc>) -> Result<String> {
        self.build_token_with(endpoint, now, &mut rand::rng())
    }

    /// Build the `x-token` value drawing prefix length and nonce from `rng`.
    pub fn build_token_with<R: Rng>(
        &self,
        endpoint: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<String> {
        let max = self.max_prefix_len()?;
        let prefix_len = rng.random_range(MIN_PREFIX_LEN..=max);

        let payload = TokenPayload {
            endpoint: endpoint.to_string(),
            expires_at: now.timestamp() + TOKEN_TTL_SECS,
            nonce: random_nonce(rng),
        };
        let plaintext = Zeroizing::new(payload.to_string());
        let ciphertext = crypto::encrypt(plaintext.as_bytes(), self.passphrase(prefix_len))?;

        debug!(endpoint, prefix_len, "built request token");
        Ok(splice(&ciphertext, self.offset, prefix_len))
    }

    /// Reverse a token built for this session: strip the spliced length,
    /// decrypt and parse the payload.
    pub fn open_token(&self, token: &str) -> Result<OpenedToken> {
        let max = self.max_prefix_len()?;
        let token = token.trim();
        if !token.is_ascii() {
            return Err(Error::format("token must be ASCII"));
        }

        let mut last_err = Error::format("no spliced prefix length found at offset");
        for digits in 2..=decimal_len(max) {
            let Some((prefix_len, ciphertext)) = unsplice(token, self.offset, digits) else {
                continue;
            };
            if !(MIN_PREFIX_LEN..=max).contains(&prefix_len) {
                continue;
            }

            match self.open_candidate(&ciphertext, prefix_len) {
                Ok(payload) => {
                    debug!(endpoint = %payload.endpoint, prefix_len, "opened request token");
                    return Ok(OpenedToken {
                        prefix_len,
                        payload,
                    });
                }
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    fn open_candidate(&self, ciphertext: &str, prefix_len: usize) -> Result<TokenPayload> {
        let plaintext = Zeroizing::new(crypto::decrypt(ciphertext, self.passphrase(prefix_len))?);
        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| Error::format("token payload is not UTF-8"))?;
        text.parse()
    }
}

/// Decrypted contents of a request token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPayload {
    pub endpoint: String,
    /// Unix timestamp after which the server rejects the token.
    pub expires_at: i64,
    pub nonce: String,
}

impl TokenPayload {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.expires_at
    }
}

impl fmt::Display for TokenPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.endpoint, self.expires_at, self.nonce)
    }
}

impl std::str::FromStr for TokenPayload {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.rsplitn(3, '|');
        let (Some(nonce), Some(expiry), Some(endpoint)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::format("token payload must be endpoint|expiry|nonce"));
        };

        if nonce.len() != NONCE_LEN || !nonce.bytes().all(|b| NONCE_ALPHABET.contains(&b)) {
            return Err(Error::format("invalid token nonce"));
        }
        let expires_at = expiry
            .parse()
            .map_err(|_| Error::format(format!("invalid token expiry '{expiry}'")))?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            expires_at,
            nonce: nonce.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedToken {
    pub prefix_len: usize,
    pub payload: TokenPayload,
}

fn random_nonce<R: Rng>(rng: &mut R) -> String {
    (0..NONCE_LEN)
        .map(|_| NONCE_ALPHABET[rng.random_range(0..NONCE_ALPHABET.len())] as char)
        .collect()
}

fn decimal_len(mut n: usize) -> usize {
    let mut len = 1;
    while n >= 10 {
        n /= 10;
        len += 1;
    }
    len
}

/// Insert the decimal `prefix_len` at `offset`, or at the end when the
/// base64 text is shorter than the offset.
pub fn splice(ciphertext: &str, offset: usize, prefix_len: usize) -> String {
    let at = offset.min(ciphertext.len());
    let mut out = String::with_capacity(ciphertext.len() + 4);
    out.push_str(&ciphertext[..at]);
    out.push_str(&prefix_len.to_string());
    out.push_str(&ciphertext[at..]);
    out
}

/// Remove a `digits`-long decimal run inserted by [`splice`].
///
/// Returns `None` if the token is too short or the run is not numeric.
pub fn unsplice(token: &str, offset: usize, digits: usize) -> Option<(usize, String)> {
    let at = offset.min(token.len().checked_sub(digits)?);
    let run = token.get(at..at + digits)?;
    if !run.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let prefix_len = run.parse().ok()?;

    let mut ciphertext = String::with_capacity(token.len() - digits);
    ciphertext.push_str(&token[..at]);
    ciphertext.push_str(&token[at + digits..]);
    Some((prefix_len, ciphertext))
}
