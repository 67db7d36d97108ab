//! Pre-built test data

use serde_json::{json, Value};

use super::builders::TestTokenBuilder;
use super::constants::{TEST_EMAIL, TEST_PROVIDER_ID, TEST_USER_ID, TEST_USER_NAME};
use crate::models::{AuthData, Tour, UserRecord};

pub struct TestFixtures;

impl TestFixtures {
    /// Server-shaped tour JSON
    #[must_use]
    pub fn tour_json(id: &str, status: &str) -> Value {
        json!({
            "id": id,
            "title": format!("Tour {id}"),
            "location": "Da Nang",
            "price": 89.5,
            "currency": "USD",
            "durationDays": 1,
            "status": status,
            "images": [],
            "providerId": TEST_PROVIDER_ID
        })
    }

    /// Decoded tour
    ///
    /// # Panics
    ///
    /// Panics if `status` is not a known tour status.
    #[must_use]
    pub fn tour(id: &str, status: &str) -> Tour {
        serde_json::from_value(Self::tour_json(id, status)).expect("fixture tour should decode")
    }

    #[must_use]
    pub fn provider_user() -> UserRecord {
        UserRecord {
            email: Some(TEST_EMAIL.to_string()),
            ..UserRecord::new(TEST_USER_ID, TEST_USER_NAME)
                .with_role("ServiceProvider")
                .with_provider_id(TEST_PROVIDER_ID)
        }
    }

    /// Access token for the provider user, valid for an hour
    #[must_use]
    pub fn provider_token() -> String {
        TestTokenBuilder::new()
            .subject(TEST_USER_ID)
            .role("ServiceProvider")
            .provider_id(TEST_PROVIDER_ID)
            .expires_in(3600)
            .build()
    }

    /// A full session record for the provider user
    #[must_use]
    pub fn provider_session() -> AuthData {
        AuthData::new(
            Some(Self::provider_token()),
            Some("refresh-token-001".to_string()),
            Some(Self::provider_user()),
        )
    }

    /// Login response body as the backend sends it
    #[must_use]
    pub fn login_response() -> Value {
        json!({
            "data": {
                "accessToken": Self::provider_token(),
                "refreshToken": "refresh-token-001",
                "user": Self::provider_user()
            }
        })
    }
}
