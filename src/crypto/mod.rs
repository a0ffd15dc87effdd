//! CryptoJS-compatible passphrase encryption.
//!
//! Reproduces the legacy OpenSSL `enc` / CryptoJS `AES.encrypt(msg, passphrase)`
//! format: MD5 `EVP_BytesToKey` stretching, AES-256-CBC and PKCS#7 padding,
//! wrapped in a base64 `Salted__` envelope.

pub mod cipher;
pub mod envelope;
pub mod kdf;

pub use cipher::{decrypt, encrypt, encrypt_with_salt, generate_salt};
pub use envelope::Envelope;
pub use kdf::{KeyStream, derive_key};

/// Length of the salt (8 bytes, fixed by the legacy format).
pub const SALT_LEN: usize = 8;
/// Length of the AES-256 key (32 bytes).
pub const KEY_LEN: usize = 32;
/// Length of the CBC initialization vector (16 bytes).
pub const IV_LEN: usize = 16;
/// AES block size (16 bytes).
pub const BLOCK_SIZE: usize = 16;
/// Length of the marker (8 bytes "Salted__").
pub const MARKER_LEN: usize = 8;
/// Marker opening every envelope.
pub const MARKER: &[u8; MARKER_LEN] = b"Salted__";
