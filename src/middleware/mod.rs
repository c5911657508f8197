//! Session gating for server-rendered Axum pages.
//!
//! Pages are rendered without an interactive user, so auth failures cannot
//! navigate the browser. Instead [`require_access`] turns them into redirects
//! and sends rotated token cookies back with the page.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use auth_session::middleware::{CurrentUser, PageGuard, require_access};
//!
//! // 1. Configure from environment
//! let guard = PageGuard::from_env()?
//!     .with_requirement(Requirement::new().with_permissions(["metrics.list"]));
//!
//! // 2. Wrap the pages that need it
//! let app = axum::Router::new()
//!     .route("/metrics", get(metrics))
//!     .layer(axum::middleware::from_fn_with_state(guard, require_access));
//!
//! // 3. Read the user in handlers
//! async fn metrics(CurrentUser(user): CurrentUser) -> String { user.email.clone() }
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod layer;

pub use config::PageGuard;
pub use cookies::JarCookieStore;
pub use error::AuthError;
pub use extractor::CurrentUser;
pub use layer::require_access;
