use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from a non-auth failure (propagated unchanged).
    #[error("{operation} failed with status {status}: {detail}")]
    Status {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    /// Unauthorized response that a refresh cannot recover.
    #[error("Unauthorized (code: {})", .code.as_deref().unwrap_or("none"))]
    Unauthorized { code: Option<String> },

    /// Raised instead of navigating when there is no interactive user,
    /// so a server-rendered page can redirect on its own.
    #[error("Auth token invalid")]
    AuthTokenInvalid,

    #[error("Token refresh failed: {0}")]
    Refresh(#[from] RefreshError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for failures that end the session rather than a single request.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::AuthTokenInvalid | Self::Refresh(_)
        )
    }
}

/// Why a refresh did not produce a new access token.
///
/// `Clone` because one failed refresh is delivered to every queued request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RefreshError {
    #[error("refresh rejected with status {status}")]
    Rejected { status: u16, code: Option<String> },

    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh response could not be decoded: {0}")]
    Decode(String),

    #[error("refresh timed out after {0:?}")]
    TimedOut(Duration),

    #[error("refresh abandoned before it settled")]
    Abandoned,

    #[error("no refresh token available")]
    MissingRefreshToken,
}
