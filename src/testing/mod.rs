//! Unified testing utilities for tourdesk
//!
//! Compiled for unit tests and, behind the `testing` feature, for the
//! integration tests under `tests/`.
//!
//! ## Organization
//!
//! - [`fixtures`] - Pre-built test data (tours, users, sessions)
//! - [`builders`] - Fluent builders for tokens and tours
//! - [`mock`] - Scripted API client and recording notifier
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tourdesk::testing::{builders::TestTokenBuilder, mock::MockApiClient};
//!
//! let token = TestTokenBuilder::new().role("Traveler").expires_in(3600).build();
//! let api = MockApiClient::new();
//! ```

pub mod builders;
pub mod fixtures;
pub mod mock;

// Re-export commonly used items for convenience
pub use builders::{TestTokenBuilder, TourBuilder};
pub use fixtures::TestFixtures;
pub use mock::{MockApiClient, MockMethod, RecordedCall, RecordingNotifier};

/// Common test constants
pub mod constants {
    /// Default provider scope id
    pub const TEST_PROVIDER_ID: &str = "prov-001";

    /// Default test user id
    pub const TEST_USER_ID: &str = "user-001";

    /// Default test user name
    pub const TEST_USER_NAME: &str = "Nguyen Van An";

    /// Default test email address
    pub const TEST_EMAIL: &str = "an@example.com";
}
