use std::sync::Arc;

use super::cookies::JarCookieStore;
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::credentials::CredentialProvider;
use crate::error::Error;
use crate::guard::Requirement;
use crate::interaction::Interaction;

/// Access rules for a group of server-rendered pages.
///
/// Use [`from_env()`](PageGuard::from_env) for convention-based setup,
/// or [`new()`](PageGuard::new) with `with_*` methods for full control.
#[derive(Debug, Clone)]
pub struct PageGuard {
    pub(super) config: ClientConfig,
    pub(super) requirement: Requirement,
    pub(super) forbidden_redirect: Option<String>,
    pub(super) secure_cookies: bool,
    pub(super) http: reqwest::Client,
}

impl PageGuard {
    /// Guard that only requires a valid session.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            requirement: Requirement::new(),
            forbidden_redirect: None,
            secure_cookies: false,
            http: reqwest::Client::new(),
        }
    }

    /// Create a guard from environment variables.
    ///
    /// Reads everything [`ClientConfig::from_env`] reads, plus
    /// `AUTH_SECURE_COOKIES` (`"1"` or `"true"`) to mark refreshed token
    /// cookies `Secure`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required env vars are missing or invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let secure = matches!(lookup("AUTH_SECURE_COOKIES").as_deref(), Some("1" | "true"));
        Ok(Self::new(ClientConfig::from_lookup(lookup)?).with_secure_cookies(secure))
    }

    #[must_use]
    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }

    /// Where to send signed-in users who lack the requirement
    /// (default: the sign-in page).
    #[must_use]
    pub fn with_forbidden_redirect(mut self, path: impl Into<String>) -> Self {
        self.forbidden_redirect = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    pub(super) fn sign_in_page(&self) -> &str {
        self.config.sign_in_page()
    }

    pub(super) fn forbidden_page(&self) -> &str {
        self.forbidden_redirect
            .as_deref()
            .unwrap_or_else(|| self.config.sign_in_page())
    }

    /// Per-request client reading and writing the request's cookies.
    pub(super) fn client(&self, store: Arc<JarCookieStore>) -> ApiClient {
        let credentials = CredentialProvider::new(store).with_secure_cookies(self.secure_cookies);
        ApiClient::with_http_client(
            self.http.clone(),
            self.config.clone(),
            credentials,
            Interaction::ServerRendered,
        )
    }
}
