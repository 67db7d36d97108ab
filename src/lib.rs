#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the tourdesk client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod api;
pub mod auth;
pub mod models;
pub mod notify;
pub mod resource;
pub mod session;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use api::{ApiClient, ApiError, HttpApiClient};
pub use auth::{AuthClient, AuthError};
pub use models::{AuthData, Tour, TourDraft, TourStatus, UserRecord};
pub use notify::{LogNotifier, Notifier, Severity};
pub use resource::{FetchOutcome, ListFilters, LoadStatus, Resource, ResourceController};
pub use session::{Role, SessionStore};
pub use settings::TourdeskSettings;
