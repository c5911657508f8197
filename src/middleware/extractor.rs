use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use super::error::AuthError;
use crate::guard::{self, Requirement};
use crate::types::User;

/// User admitted by [`require_access`](super::require_access).
///
/// Use as an Axum extractor in page handlers behind the guard. Returns
/// `401 Unauthorized` when the guard did not run for this route.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("Dashboard {}", user.email)
/// }
///
/// // Optional: pages reachable with or without the guard
/// async fn home(user: Option<CurrentUser>) -> impl IntoResponse {
///     match user {
///         Some(CurrentUser(u)) => format!("Hello, {}", u.email),
///         None => "Hello, guest".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Arc<User>);

impl CurrentUser {
    /// Whether a UI fragment requiring `requirement` should render.
    #[must_use]
    pub fn can(&self, requirement: &Requirement) -> bool {
        guard::authorized(Some(&self.0), requirement)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned())
    }
}
