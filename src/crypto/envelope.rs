//! `Salted__` envelope shared with CryptoJS and `openssl enc`.
//!
//! ```text
//! MARKER "Salted__" (8) | SALT (8) | CIPHERTEXT (n * 16)
//! ```
//!
//! Transported as standard padded base64.

use base64::{Engine, engine::general_purpose::STANDARD};

use super::{BLOCK_SIZE, MARKER, MARKER_LEN, SALT_LEN};
use crate::error::{Error, Result};

/// Smallest valid envelope: marker, salt and one cipher block.
pub const MIN_LEN: usize = MARKER_LEN + SALT_LEN + BLOCK_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    salt: [u8; SALT_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn new(salt: [u8; SALT_LEN], ciphertext: Vec<u8>) -> Result<Self> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(Error::format(format!(
                "ciphertext length {} is not a positive multiple of {BLOCK_SIZE}",
                ciphertext.len()
            )));
        }
        Ok(Self { salt, ciphertext })
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MARKER_LEN + SALT_LEN + self.ciphertext.len());
        buf.extend_from_slice(MARKER);
        buf.extend_from_slice(&self.salt);
        buf.extend_from_slice(&self.ciphertext);
        buf
    }

    /// Parses raw envelope bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if:
    /// - The data is shorter than marker + salt + one block
    /// - The marker is not `Salted__`
    /// - The ciphertext is not block aligned
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_LEN {
            return Err(Error::format(format!(
                "envelope too short: {} bytes",
                data.len()
            )));
        }

        if &data[..MARKER_LEN] != MARKER {
            return Err(Error::format("missing Salted__ marker"));
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&data[MARKER_LEN..MARKER_LEN + SALT_LEN]);

        Self::new(salt, data[MARKER_LEN + SALT_LEN..].to_vec())
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub fn from_base64(text: &str) -> Result<Self> {
        let data = STANDARD.decode(text.trim())?;
        Self::from_bytes(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_marker_then_salt() {
        let env = Envelope::new([1, 2, 3, 4, 5, 6, 7, 8], vec![0xAA; 16]).unwrap();
        let bytes = env.to_bytes();

        assert_eq!(bytes.len(), MIN_LEN);
        assert_eq!(&bytes[..8], b"Salted__");
        assert_eq!(&bytes[8..16], &[1, 2, 3, 4, 5, 6, 7, 8]);
        // "Salted__" always encodes to this prefix
        assert!(env.to_base64().starts_with("U2FsdGVkX1"));
    }

    #[test]
    fn parses_openssl_output() {
        let env = Envelope::from_base64("U2FsdGVkX18BAgMEBQYHCB/jznCffog+0Y5ov+s0rzY=").unwrap();
        assert_eq!(env.salt(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(env.ciphertext().len(), 16);
    }

    #[test]
    fn invalid_marker_fails() {
        let mut data = vec![0u8; MIN_LEN];
        data[..8].copy_from_slice(b"Peppered");

        assert!(matches!(Envelope::from_bytes(&data), Err(Error::Format(_))));
    }

    #[test]
    fn too_short_fails() {
        let mut data = vec![0u8; MIN_LEN - 1];
        data[..8].copy_from_slice(MARKER);

        assert!(matches!(Envelope::from_bytes(&data), Err(Error::Format(_))));
    }

    #[test]
    fn unaligned_ciphertext_fails() {
        let mut data = vec![0u8; MIN_LEN + 5];
        data[..8].copy_from_slice(MARKER);

        assert!(matches!(Envelope::from_bytes(&data), Err(Error::Format(_))));
    }

    #[test]
    fn invalid_base64_fails() {
        assert!(matches!(
            Envelope::from_base64("not base64!"),
            Err(Error::Format(_))
        ));
    }
}
