#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub mod cookies;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod interaction;
#[cfg(feature = "middleware")]
pub mod middleware;
pub mod refresh;
pub mod session;
pub mod types;

// Re-exports for convenient access
pub use client::{ApiClient, ApiRequest, TOKEN_EXPIRED_CODE};
pub use config::ClientConfig;
pub use cookies::{CookieStore, MemoryCookieStore, REFRESH_COOKIE_NAME, TOKEN_COOKIE_NAME};
pub use credentials::CredentialProvider;
pub use error::{Error, RefreshError};
pub use guard::{Requirement, authorized};
pub use interaction::{Interaction, Navigator};
pub use refresh::{RefreshCoordinator, Settlement, TokenRefresher};
pub use session::SessionContext;
pub use types::{AccessToken, RefreshToken, Session, SignInCredentials, TokenPair, User};
