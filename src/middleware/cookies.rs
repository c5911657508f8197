use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use parking_lot::Mutex;

use crate::cookies::CookieStore;

/// [`CookieStore`] over the cookie jar of one incoming request.
///
/// Writes are recorded as jar deltas, so returning [`jar`](Self::jar) with
/// the response emits the matching `Set-Cookie` headers.
#[derive(Debug)]
pub struct JarCookieStore {
    jar: Mutex<CookieJar>,
}

impl JarCookieStore {
    #[must_use]
    pub fn new(jar: CookieJar) -> Self {
        Self {
            jar: Mutex::new(jar),
        }
    }

    /// Snapshot of the jar including pending changes.
    #[must_use]
    pub fn jar(&self) -> CookieJar {
        self.jar.lock().clone()
    }
}

impl CookieStore for JarCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        self.jar.lock().get(name).map(|c| c.value().to_string())
    }

    fn set(&self, cookie: Cookie<'static>) {
        let mut jar = self.jar.lock();
        *jar = jar.clone().add(cookie);
    }

    fn remove(&self, name: &str) {
        let mut jar = self.jar.lock();
        *jar = jar.clone().remove(Cookie::build(name.to_string()).path("/"));
    }
}
