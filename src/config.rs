use std::time::Duration;

use url::Url;

use crate::error::Error;

const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// API client configuration.
///
/// The base URL is the only required field. Override the rest with `with_*`.
///
/// ```rust,ignore
/// use auth_session::ClientConfig;
///
/// let config = ClientConfig::new("http://localhost:3333".parse()?)
///     .with_refresh_timeout(std::time::Duration::from_secs(5))
///     .with_landing_page("/home");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) me_path: String,
    pub(crate) sign_in_path: String,
    pub(crate) refresh_path: String,
    pub(crate) refresh_timeout: Duration,
    pub(crate) sign_in_page: String,
    pub(crate) landing_page: String,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            me_path: "/me".into(),
            sign_in_path: "/sessions".into(),
            refresh_path: "/refresh".into(),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            sign_in_page: "/".into(),
            landing_page: "/dashboard".into(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `AUTH_API_URL`: API base URL
    ///
    /// # Optional env vars
    /// - `AUTH_REFRESH_TIMEOUT_SECS`: refresh call timeout in seconds
    /// - `AUTH_SIGN_IN_PAGE`: page shown after sign-out
    /// - `AUTH_LANDING_PAGE`: page shown after sign-in
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required env vars are missing or values are invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) over any variable source.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let base_url = lookup("AUTH_API_URL")
            .ok_or_else(|| Error::Config("AUTH_API_URL is required".into()))?;
        let base_url: Url = base_url
            .parse()
            .map_err(|e| Error::Config(format!("AUTH_API_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Some(secs) = lookup("AUTH_REFRESH_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("AUTH_REFRESH_TIMEOUT_SECS: {e}")))?;
            config = config.with_refresh_timeout(Duration::from_secs(secs));
        }
        if let Some(page) = lookup("AUTH_SIGN_IN_PAGE") {
            config = config.with_sign_in_page(page);
        }
        if let Some(page) = lookup("AUTH_LANDING_PAGE") {
            config = config.with_landing_page(page);
        }

        Ok(config)
    }

    /// Override the identity endpoint path (default: `/me`).
    #[must_use]
    pub fn with_me_path(mut self, path: impl Into<String>) -> Self {
        self.me_path = path.into();
        self
    }

    /// Override the sign-in endpoint path (default: `/sessions`).
    #[must_use]
    pub fn with_sign_in_path(mut self, path: impl Into<String>) -> Self {
        self.sign_in_path = path.into();
        self
    }

    /// Override the refresh endpoint path (default: `/refresh`).
    #[must_use]
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Upper bound for one refresh call (default: 10s).
    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_sign_in_page(mut self, path: impl Into<String>) -> Self {
        self.sign_in_page = path.into();
        self
    }

    #[must_use]
    pub fn with_landing_page(mut self, path: impl Into<String>) -> Self {
        self.landing_page = path.into();
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn refresh_timeout(&self) -> Duration {
        self.refresh_timeout
    }

    #[must_use]
    pub fn sign_in_page(&self) -> &str {
        &self.sign_in_page
    }

    #[must_use]
    pub fn landing_page(&self) -> &str {
        &self.landing_page
    }

    /// Resolve an API path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, Error> {
        if self.base_url.cannot_be_a_base() {
            return Err(Error::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path, None),
        };
        let mut url = self.base_url.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}/{}", path.trim_start_matches('/')));
        url.set_query(query);
        Ok(url)
    }
}
