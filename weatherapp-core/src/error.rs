use thiserror::Error;

/// Why a weather fetch produced no record.
///
/// The `Display` text is what ends up in [`FetchState::Error`](crate::FetchState::Error).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The provider could not be reached or the body could not be read.
    #[error("Network error: {0}")]
    Transport(String),

    /// The provider answered with a non-2xx status.
    #[error("Error {status}: {message}")]
    Provider { status: u16, message: String },

    /// A 2xx body that does not have the expected shape.
    #[error("Unexpected response from provider: {0}")]
    Schema(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the API key in its query string.
        FetchError::Transport(err.without_url().to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Schema(err.to_string())
    }
}
