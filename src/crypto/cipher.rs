use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding};
use getrandom::fill;
use zeroize::Zeroizing;

use super::{BLOCK_SIZE, Envelope, IV_LEN, KEY_LEN, SALT_LEN, kdf::KeyStream};
use crate::error::{Error, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|_| Error::Entropy)
}

/// Generate salt
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(salt)
}

struct KeyIv {
    key: Zeroizing<[u8; KEY_LEN]>,
    iv: Zeroizing<[u8; IV_LEN]>,
}

fn key_iv(passphrase: &[u8], salt: &[u8]) -> Result<KeyIv> {
    let mut stream = KeyStream::new(passphrase, salt)?;
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    let mut iv = Zeroizing::new([0u8; IV_LEN]);
    stream.read(&mut key[..]);
    stream.read(&mut iv[..]);
    Ok(KeyIv { key, iv })
}

/// PKCS#7: always appends 1..=16 bytes, a whole block when already aligned.
pub(crate) fn pad(data: &[u8]) -> Zeroizing<Vec<u8>> {
    let n = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut out = Zeroizing::new(Vec::with_capacity(data.len() + n));
    out.extend_from_slice(data);
    out.resize(data.len() + n, n as u8);
    out
}

pub(crate) fn unpad(mut data: Vec<u8>) -> Result<Vec<u8>> {
    let n = match data.last() {
        Some(&n) => n as usize,
        None => return Err(Error::Padding),
    };
    if n == 0 || n > BLOCK_SIZE || n > data.len() {
        return Err(Error::Padding);
    }
    data.truncate(data.len() - n);
    Ok(data)
}

/// Encrypt with a caller-chosen salt. Output is the base64 envelope.
pub fn encrypt_with_salt(plaintext: &[u8], passphrase: &[u8], salt: [u8; SALT_LEN]) -> Result<String> {
    let KeyIv { key, iv } = key_iv(passphrase, &salt)?;

    let padded = pad(plaintext);
    let ciphertext = Aes256CbcEnc::new_from_slices(&key[..], &iv[..])
        .map_err(|_| Error::precondition("invalid key or iv length"))?
        .encrypt_padded_vec_mut::<NoPadding>(&padded);

    Ok(Envelope::new(salt, ciphertext)?.to_base64())
}

/// Encrypt plaintext under a passphrase with a fresh random salt.
pub fn encrypt(plaintext: &[u8], passphrase: &[u8]) -> Result<String> {
    let salt = generate_salt()?;
    encrypt_with_salt(plaintext, passphrase, salt)
}

/// Decrypt a base64 envelope
pub fn decrypt(envelope: &str, passphrase: &[u8]) -> Result<Vec<u8>> {
    let envelope = Envelope::from_base64(envelope)?;
    let KeyIv { key, iv } = key_iv(passphrase, envelope.salt())?;

    let plaintext = Aes256CbcDec::new_from_slices(&key[..], &iv[..])
        .map_err(|_| Error::precondition("invalid key or iv length"))?
        .decrypt_padded_vec_mut::<NoPadding>(envelope.ciphertext())
        .map_err(|_| Error::format("ciphertext is not block aligned"))?;

    unpad(plaintext)
}
