use md5::{Digest, Md5};
use zeroize::Zeroizing;

use super::SALT_LEN;
use crate::error::{Error, Result};

/// Resumable MD5 digest chain behind `EVP_BytesToKey`.
///
/// Each round hashes `previous || passphrase || salt`; the first round has an
/// empty `previous`. Reading more bytes continues the chain, so a longer
/// derivation always starts with the shorter one.
pub struct KeyStream<'a> {
    passphrase: &'a [u8],
    salt: [u8; SALT_LEN],
    previous: Option<[u8; 16]>,
    buffered: Zeroizing<Vec<u8>>,
}

impl<'a> KeyStream<'a> {
    pub fn new(passphrase: &'a [u8], salt: &[u8]) -> Result<Self> {
        let salt: [u8; SALT_LEN] = salt.try_into().map_err(|_| {
            Error::precondition(format!(
                "salt must be {SALT_LEN} bytes, got {}",
                salt.len()
            ))
        })?;

        Ok(Self {
            passphrase,
            salt,
            previous: None,
            buffered: Zeroizing::new(Vec::new()),
        })
    }

    fn next_digest(&mut self) -> [u8; 16] {
        let mut hasher = Md5::new();
        if let Some(prev) = &self.previous {
            hasher.update(prev);
        }
        hasher.update(self.passphrase);
        hasher.update(self.salt);

        let mut digest = [0u8; 16];
        digest.copy_from_slice(&hasher.finalize());
        self.previous = Some(digest);
        digest
    }

    /// Fill `out` with the next `out.len()` bytes of key material.
    pub fn read(&mut self, out: &mut [u8]) {
        while self.buffered.len() < out.len() {
            let digest = self.next_digest();
            self.buffered.extend_from_slice(&digest);
        }
        out.copy_from_slice(&self.buffered[..out.len()]);
        self.buffered.drain(..out.len());
    }
}

/// Derive `output_len` bytes of key material from a passphrase and 8-byte salt.
pub fn derive_key(passphrase: &[u8], salt: &[u8], output_len: usize) -> Result<Zeroizing<Vec<u8>>> {
    if output_len == 0 {
        return Err(Error::precondition("output length must be positive"));
    }

    let mut stream = KeyStream::new(passphrase, salt)?;
    let mut out = Zeroizing::new(vec![0u8; output_len]);
    stream.read(&mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

    #[test]
    fn matches_openssl_bytes_to_key() {
        let out = derive_key(b"password", &SALT, 48).unwrap();
        assert_eq!(
            hex::encode(&*out),
            "e7b0971e52ca5cc8d0539fb3412f6316f7ba2e6ee293d9f3457b99436b51ce02\
             8d450e2ed75a84a923d4eac9fe49226b"
        );
    }

    #[test]
    fn empty_passphrase_single_round() {
        let out = derive_key(b"", &SALT, 16).unwrap();
        assert_eq!(hex::encode(&*out), "0ee0646c1c77d8131cc8f4ee65c7673b");
    }

    #[test]
    fn kdf_is_deterministic() {
        let k1 = derive_key(b"pw", &SALT, 48).unwrap();
        let k2 = derive_key(b"pw", &SALT, 48).unwrap();
        assert_eq!(*k1, *k2);
    }

    #[test]
    fn longer_output_extends_shorter() {
        let short = derive_key(b"password", &SALT, 48).unwrap();
        let long = derive_key(b"password", &SALT, 64).unwrap();
        assert_eq!(&long[..48], &short[..]);
        assert_eq!(
            hex::encode(&long[48..]),
            "19ebc118602201f8c0d0798d321aa279"
        );
    }

    #[test]
    fn stream_reads_resume() {
        let mut stream = KeyStream::new(b"password", &SALT).unwrap();
        let mut key = [0u8; 32];
        let mut iv = [0u8; 16];
        stream.read(&mut key);
        stream.read(&mut iv);

        let whole = derive_key(b"password", &SALT, 48).unwrap();
        assert_eq!(&whole[..32], &key);
        assert_eq!(&whole[32..], &iv);
    }

    #[test]
    fn wrong_salt_length_fails() {
        assert!(matches!(
            derive_key(b"pw", &[0u8; 16], 48),
            Err(Error::Precondition(_))
        ));
        assert!(matches!(
            derive_key(b"pw", &[0u8; 7], 48),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn zero_output_length_fails() {
        assert!(matches!(
            derive_key(b"pw", &SALT, 0),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn salt_affects_output() {
        let k1 = derive_key(b"pw", &SALT, 32).unwrap();
        let k2 = derive_key(b"pw", &[8, 7, 6, 5, 4, 3, 2, 1], 32).unwrap();
        assert_ne!(*k1, *k2);
    }
}
