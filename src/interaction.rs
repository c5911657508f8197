use std::sync::Arc;

/// Sends an interactive user to another page.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate(&self, path: &str) {
        self(path);
    }
}

/// How a non-refreshable auth failure is handled.
///
/// With an interactive user the session is cleared and the user is sent to the
/// sign-in page. A server-rendered page cannot navigate the browser, so it gets
/// [`Error::AuthTokenInvalid`](crate::Error::AuthTokenInvalid) back and decides
/// on its own redirect.
#[derive(Clone)]
pub enum Interaction {
    Interactive(Arc<dyn Navigator>),
    ServerRendered,
}

impl Interaction {
    #[must_use]
    pub fn interactive(navigator: impl Navigator + 'static) -> Self {
        Self::Interactive(Arc::new(navigator))
    }

    #[must_use]
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive(_))
    }

    /// Navigate when interactive; no-op otherwise.
    pub(crate) fn navigate(&self, path: &str) {
        if let Self::Interactive(navigator) = self {
            navigator.navigate(path);
        }
    }
}

impl std::fmt::Debug for Interaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interactive(_) => f.write_str("Interactive"),
            Self::ServerRendered => f.write_str("ServerRendered"),
        }
    }
}
