use std::collections::HashMap;

use cookie::{Cookie, SameSite};
use parking_lot::Mutex;
use time::Duration;

pub const TOKEN_COOKIE_NAME: &str = "auth.token";
pub const REFRESH_COOKIE_NAME: &str = "auth.refreshToken";

/// Named string values with expiry and path scope.
///
/// Implemented by whatever owns the cookies: a browser bridge, the request
/// jar of a server-rendered page ([`JarCookieStore`](crate::middleware::JarCookieStore)),
/// or [`MemoryCookieStore`].
pub trait CookieStore: Send + Sync {
    /// Current value of the named cookie.
    fn get(&self, name: &str) -> Option<String>;

    /// Add or replace a cookie. A zero max age removes it.
    fn set(&self, cookie: Cookie<'static>);

    /// Delete the named cookie at the root path.
    fn remove(&self, name: &str);
}

/// Create a root-scoped token cookie.
pub(crate) fn token_cookie(
    name: &str,
    value: &str,
    ttl_days: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), value.to_string()))
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::days(ttl_days))
        .build()
}

/// Create removal cookie for a token.
pub(crate) fn removal_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Process-local cookie store.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    cookies: Mutex<HashMap<String, Cookie<'static>>>,
}

impl MemoryCookieStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Full cookie including attributes.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.cookies.lock().get(name).cloned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.lock().is_empty()
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies
            .lock()
            .get(name)
            .map(|c| c.value().to_string())
    }

    fn set(&self, cookie: Cookie<'static>) {
        let mut cookies = self.cookies.lock();
        if cookie.max_age() == Some(Duration::ZERO) {
            cookies.remove(cookie.name());
        } else {
            cookies.insert(cookie.name().to_string(), cookie);
        }
    }

    fn remove(&self, name: &str) {
        self.cookies.lock().remove(name);
    }
}
