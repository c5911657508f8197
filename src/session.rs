use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::client::{self, ApiClient, ApiRequest};
use crate::error::Error;
use crate::guard::{self, Requirement};
use crate::types::{AccessToken, RefreshToken, Session, SignInCredentials, TokenPair, User};

/// Response from the sign-in endpoint.
#[derive(Debug, Deserialize)]
struct SignInResponse {
    token: AccessToken,
    #[serde(rename = "refreshToken")]
    refresh_token: RefreshToken,
    #[serde(default)]
    permissions: BTreeSet<String>,
    #[serde(default)]
    roles: BTreeSet<String>,
}

/// Signed-in state for one page load or one server-side request.
///
/// # Example
///
/// ```rust,ignore
/// let session = SessionContext::new(client);
/// session.initialize().await;
///
/// if session.user().is_none() {
///     session
///         .sign_in(&SignInCredentials::new("me@example.com", "secret"))
///         .await?;
/// }
/// ```
pub struct SessionContext {
    client: ApiClient,
    user: RwLock<Option<Arc<User>>>,
}

impl SessionContext {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            user: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Restore the user from a persisted access token.
    ///
    /// Does nothing without a token cookie. If the profile cannot be fetched
    /// the session is signed out.
    pub async fn initialize(&self) -> Option<Arc<User>> {
        if !self.client.credentials().has_session() {
            return None;
        }

        match self.client.get::<User>(&self.client.config().me_path).await {
            Ok(user) => {
                let user = Arc::new(user);
                *self.user.write() = Some(user.clone());
                tracing::debug!(email = %user.email, "Session restored");
                Some(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session restore failed");
                *self.user.write() = None;
                // The client already signed out on an unrecoverable 401.
                if self.client.credentials().has_session() {
                    self.client.sign_out();
                }
                None
            }
        }
    }

    /// Sign in, persist the tokens, and navigate to the landing page.
    ///
    /// Failures are logged and returned; the session stays signed out.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCredentials`] if the server rejects the credentials
    /// - [`Error::Status`] for other error responses
    /// - [`Error::Http`] on network or decoding failure
    pub async fn sign_in(&self, credentials: &SignInCredentials) -> Result<Arc<User>, Error> {
        match self.try_sign_in(credentials).await {
            Ok(user) => {
                tracing::info!(email = %user.email, "Signed in");
                self.client
                    .interaction()
                    .navigate(self.client.config().landing_page());
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, email = %credentials.email, "Sign-in failed");
                Err(e)
            }
        }
    }

    async fn try_sign_in(&self, credentials: &SignInCredentials) -> Result<Arc<User>, Error> {
        let request =
            ApiRequest::post(self.client.config().sign_in_path.as_str()).with_json(credentials)?;
        let response = self.client.send_public(&request).await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(client::status_error("sign-in", response).await);
        }

        let body: SignInResponse = response.json().await?;
        let tokens = TokenPair {
            access_token: body.token,
            refresh_token: body.refresh_token,
        };
        let user = Arc::new(User {
            email: credentials.email.clone(),
            permissions: body.permissions,
            roles: body.roles,
        });

        self.client.credentials().store(&tokens);
        *self.user.write() = Some(user.clone());
        self.client.set_access_token(&tokens.access_token);

        Ok(user)
    }

    /// Clear cookies and user, then go to the sign-in page.
    pub fn sign_out(&self) {
        *self.user.write() = None;
        self.client.sign_out();
    }

    /// The signed-in user, if the access cookie is still present.
    #[must_use]
    pub fn user(&self) -> Option<Arc<User>> {
        if !self.client.credentials().has_session() {
            return None;
        }
        self.user.read().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    /// Tokens and user, if a session exists.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.client.credentials().has_session().then(|| Session {
            tokens: self.client.credentials().load(),
            user: self.user(),
        })
    }

    #[must_use]
    pub fn can(&self, requirement: &Requirement) -> bool {
        guard::authorized(self.user().as_deref(), requirement)
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("client", &self.client)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
