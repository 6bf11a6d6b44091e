use thiserror::Error;

/// Errors raised while talking to the mail provider or shaping its data
#[derive(Debug, Error)]
pub enum MailError {
    /// Missing or rejected credentials
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// Any failure reported by the mail provider (listing, fetching, modifying)
    #[error("mail provider error: {0}")]
    Provider(String),

    /// Malformed message content (base64, MIME)
    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MailError {
    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }
}

impl From<google_gmail1::Error> for MailError {
    fn from(err: google_gmail1::Error) -> Self {
        Self::Provider(err.to_string())
    }
}

pub type MailResult<T> = Result<T, MailError>;
