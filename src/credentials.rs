use std::sync::Arc;

use crate::cookies::{self, CookieStore, REFRESH_COOKIE_NAME, TOKEN_COOKIE_NAME};
use crate::types::{AccessToken, RefreshToken, TokenPair};

const DEFAULT_TTL_DAYS: i64 = 30;

/// Reads and writes the access/refresh token cookies.
///
/// Cheap to clone; clones share the same [`CookieStore`].
#[derive(Clone)]
pub struct CredentialProvider {
    store: Arc<dyn CookieStore>,
    ttl_days: i64,
    secure: bool,
}

impl CredentialProvider {
    #[must_use]
    pub fn new(store: Arc<dyn CookieStore>) -> Self {
        Self {
            store,
            ttl_days: DEFAULT_TTL_DAYS,
            secure: false,
        }
    }

    /// Cookie lifetime in days (default: 30).
    #[must_use]
    pub fn with_ttl_days(mut self, days: i64) -> Self {
        self.ttl_days = days;
        self
    }

    /// Mark token cookies `Secure` (default: false).
    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Current tokens. Missing cookies read as empty strings.
    #[must_use]
    pub fn load(&self) -> TokenPair {
        TokenPair {
            access_token: AccessToken(self.store.get(TOKEN_COOKIE_NAME).unwrap_or_default()),
            refresh_token: RefreshToken(self.store.get(REFRESH_COOKIE_NAME).unwrap_or_default()),
        }
    }

    pub fn store(&self, tokens: &TokenPair) {
        self.store.set(cookies::token_cookie(
            TOKEN_COOKIE_NAME,
            tokens.access_token.as_str(),
            self.ttl_days,
            self.secure,
        ));
        self.store.set(cookies::token_cookie(
            REFRESH_COOKIE_NAME,
            tokens.refresh_token.as_str(),
            self.ttl_days,
            self.secure,
        ));
    }

    pub fn clear(&self) {
        self.store.remove(TOKEN_COOKIE_NAME);
        self.store.remove(REFRESH_COOKIE_NAME);
    }

    /// `Bearer <token>` when an access token is present.
    #[must_use]
    pub fn authorization(&self) -> Option<String> {
        let tokens = self.load();
        (!tokens.access_token.is_empty()).then(|| tokens.access_token.bearer())
    }

    #[must_use]
    pub fn has_session(&self) -> bool {
        self.store
            .get(TOKEN_COOKIE_NAME)
            .is_some_and(|token| !token.is_empty())
    }
}

impl std::fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("ttl_days", &self.ttl_days)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::MemoryCookieStore;

    fn provider() -> (Arc<MemoryCookieStore>, CredentialProvider) {
        let store = Arc::new(MemoryCookieStore::new());
        let provider = CredentialProvider::new(store.clone());
        (store, provider)
    }

    #[test]
    fn load_without_cookies_returns_empty_tokens() {
        let (_, provider) = provider();
        let tokens = provider.load();
        assert!(tokens.access_token.is_empty());
        assert!(tokens.refresh_token.is_empty());
        assert_eq!(provider.authorization(), None);
        assert!(!provider.has_session());
    }

    #[test]
    fn store_then_load_roundtrip() {
        let (store, provider) = provider();
        provider.store(&TokenPair::new("access-1", "refresh-1"));

        assert_eq!(provider.load(), TokenPair::new("access-1", "refresh-1"));
        assert_eq!(provider.authorization().as_deref(), Some("Bearer access-1"));
        assert!(provider.has_session());

        let cookie = store.cookie(TOKEN_COOKIE_NAME).unwrap();
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(30)));
    }

    #[test]
    fn clear_removes_both_cookies() {
        let (store, provider) = provider();
        provider.store(&TokenPair::new("a", "r"));
        provider.clear();

        assert!(store.is_empty());
        assert_eq!(provider.load(), TokenPair::default());
    }

    #[test]
    fn clones_observe_the_same_store() {
        let (_, provider) = provider();
        let other = provider.clone().with_ttl_days(1);
        other.store(&TokenPair::new("a2", "r2"));
        assert_eq!(provider.load().access_token.as_str(), "a2");
    }
}
