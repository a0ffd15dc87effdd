use thiserror::Error;

/// Errors produced by the cipher layer and token protocol.
#[derive(Debug, Error)]
pub enum Error {
    /// The envelope is not valid base64, lacks the `Salted__` marker, or has a bad length.
    #[error("invalid envelope: {0}")]
    Format(String),

    /// Padding after decryption is malformed (tampered data or wrong passphrase).
    #[error("invalid padding: wrong passphrase or corrupted data")]
    Padding,

    /// An input violates a fixed protocol constraint.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A token was requested before a session secret (or login) exists.
    #[error("authentication required: {0}")]
    AuthenticationRequired(&'static str),

    #[error("OS random generator unavailable")]
    Entropy,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        Error::Precondition(msg.into())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Format(format!("base64: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let e = Error::precondition("salt must be 8 bytes");
        assert_eq!(e.to_string(), "precondition failed: salt must be 8 bytes");

        let e = Error::AuthenticationRequired("no session secret");
        assert!(e.to_string().contains("no session secret"));
    }

    #[test]
    fn base64_errors_become_format_errors() {
        use base64::Engine;
        let err = base64::engine::general_purpose::STANDARD
            .decode("***")
            .unwrap_err();
        assert!(matches!(Error::from(err), Error::Format(_)));
    }
}
