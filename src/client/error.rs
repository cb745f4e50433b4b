use thiserror::Error;

/// Errors surfaced to the participant. None of them end the attempt session.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("local store error: {0}")]
    Store(#[from] std::io::Error),

    #[error("no stored credential; sign in first")]
    SignedOut,

    #[error("corrupt local state: {0}")]
    Corrupt(#[from] serde_json::Error),
}
