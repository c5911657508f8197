use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Authentication errors for the page-gating layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The page guard did not admit this request.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The API failed for a reason other than authentication.
    #[error("Upstream error: {0}")]
    Upstream(#[from] crate::error::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()).into_response(),
            Self::Upstream(_) => {
                tracing::error!(error = %self, "Auth internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
