//! Login, registration and profile refresh against the backend
//!
//! Successful responses are written into the [`SessionStore`] as one batch so
//! readers never observe a token without its user record.

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{unwrap_envelope, ApiClient, ApiError};
use crate::models::{AuthData, UserRecord};
use crate::session::{SessionStore, StorageError};

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const PROFILE_PATH: &str = "/auth/profile";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Session storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The server accepted the request but sent no access token
    #[error("Response did not contain an access token")]
    MissingToken,

    #[error("Malformed auth response: {0}")]
    Malformed(String),
}

impl AuthError {
    /// Message suitable for showing to the user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e
                .server_message()
                .map_or_else(|| e.to_string(), ToString::to_string),
            other => other.to_string(),
        }
    }
}

/// Sign-up payload
#[derive(Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

pub struct AuthClient {
    api: Arc<dyn ApiClient>,
    session: SessionStore,
}

impl AuthClient {
    #[must_use]
    pub fn new(api: Arc<dyn ApiClient>, session: SessionStore) -> Self {
        Self { api, session }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Sign in with email and password and store the returned session
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the response has no access
    /// token, or the session cannot be written.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthData, AuthError> {
        debug!("Signing in {email}");
        let body = self
            .api
            .post(LOGIN_PATH, json!({ "email": email, "password": password }))
            .await?;
        self.store_session(body)
    }

    /// Create an account and store the returned session
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the response has no access
    /// token, or the session cannot be written.
    pub async fn register(&self, registration: &Registration) -> Result<AuthData, AuthError> {
        debug!("Registering {}", registration.email);
        let payload =
            serde_json::to_value(registration).map_err(|e| AuthError::Malformed(e.to_string()))?;
        let body = self.api.post(REGISTER_PATH, payload).await?;
        self.store_session(body)
    }

    /// Drop the local session
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend rejects the removal.
    pub fn logout(&self) -> Result<(), AuthError> {
        info!("Signing out");
        self.session.clear_auth_data()?;
        Ok(())
    }

    /// Reload the user record from the backend
    ///
    /// A 401 means the stored token is no longer accepted; the local session
    /// is cleared before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a user record.
    pub async fn fetch_profile(&self) -> Result<UserRecord, AuthError> {
        let body = match self.api.get(PROFILE_PATH, &[]).await {
            Ok(body) => body,
            Err(e) if e.is_unauthorized() => {
                warn!("Profile request rejected, clearing session");
                self.session.clear_auth_data()?;
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let body = unwrap_envelope(body);
        let body = match body {
            Value::Object(mut map) if map.contains_key("user") => {
                map.remove("user").unwrap_or(Value::Null)
            }
            other => other,
        };
        let user: UserRecord =
            serde_json::from_value(body).map_err(|e| AuthError::Malformed(e.to_string()))?;
        self.session.set_user(Some(&user))?;
        Ok(user)
    }

    fn store_session(&self, body: Value) -> Result<AuthData, AuthError> {
        let data: AuthData = serde_json::from_value(unwrap_envelope(body))
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        if data.access_token.as_deref().map_or(true, str::is_empty) {
            return Err(AuthError::MissingToken);
        }
        self.session.set_auth_data(&data)?;
        info!(
            "Session stored for {}",
            data.user
                .as_ref()
                .and_then(|u| u.email.as_deref())
                .unwrap_or("unknown user")
        );
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use crate::testing::constants::TEST_PROVIDER_ID;
    use crate::testing::fixtures::TestFixtures;
    use crate::testing::mock::{MockApiClient, MockMethod};

    fn client() -> (AuthClient, Arc<MockApiClient>) {
        let api = Arc::new(MockApiClient::new());
        (AuthClient::new(api.clone(), SessionStore::in_memory()), api)
    }

    #[tokio::test]
    async fn test_login_stores_enveloped_session() {
        let (auth, api) = client();
        api.respond(MockMethod::Post, LOGIN_PATH, TestFixtures::login_response());

        let data = auth.login("an@example.com", "secret").await.unwrap();

        assert!(data.access_token.is_some());
        let session = auth.session();
        assert!(session.is_authenticated());
        assert_eq!(session.refresh_token().as_deref(), Some("refresh-token-001"));
        assert_eq!(session.current_role(), Some(Role::Provider));
        assert_eq!(session.current_provider_id().as_deref(), Some(TEST_PROVIDER_ID));
        assert_eq!(
            api.calls()[0].body,
            Some(json!({ "email": "an@example.com", "password": "secret" }))
        );
    }

    #[tokio::test]
    async fn test_login_accepts_legacy_token_field() {
        let (auth, api) = client();
        api.respond(
            MockMethod::Post,
            LOGIN_PATH,
            json!({ "token": "a.b.c", "user": { "id": 7, "name": "Binh" } }),
        );

        auth.login("b@example.com", "pw").await.unwrap();
        assert_eq!(auth.session().access_token().as_deref(), Some("a.b.c"));
        assert_eq!(
            auth.session().user().and_then(|u| u.id).as_deref(),
            Some("7")
        );
    }

    #[tokio::test]
    async fn test_login_with_both_token_fields_uses_access_token() {
        let (auth, api) = client();
        api.respond(
            MockMethod::Post,
            LOGIN_PATH,
            json!({ "accessToken": "a.b.c", "token": "x.y.z", "user": { "id": 1 } }),
        );

        let data = auth.login("e@example.com", "pw").await.unwrap();
        assert_eq!(data.access_token.as_deref(), Some("a.b.c"));
        assert_eq!(auth.session().access_token().as_deref(), Some("a.b.c"));
    }

    #[tokio::test]
    async fn test_login_without_token_leaves_session_untouched() {
        let (auth, api) = client();
        api.respond(MockMethod::Post, LOGIN_PATH, json!({ "user": { "id": 1 } }));

        let err = auth.login("c@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
        assert!(auth.session().user().is_none());
    }

    #[tokio::test]
    async fn test_login_rejected_surfaces_server_message() {
        let (auth, api) = client();
        api.fail(MockMethod::Post, LOGIN_PATH, 401, Some("Invalid credentials"));

        let err = auth.login("d@example.com", "bad").await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid credentials");
        assert!(!auth.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_register_omits_unset_optional_fields() {
        let (auth, api) = client();
        api.respond(MockMethod::Post, REGISTER_PATH, TestFixtures::login_response());

        let registration = Registration {
            name: "An".to_string(),
            email: "an@example.com".to_string(),
            password: "pw".to_string(),
            ..Registration::default()
        };
        auth.register(&registration).await.unwrap();

        assert_eq!(
            api.calls()[0].body,
            Some(json!({ "name": "An", "email": "an@example.com", "password": "pw" }))
        );
        assert!(auth.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_fetch_profile_updates_user_only() {
        let (auth, api) = client();
        auth.session()
            .set_auth_data(&TestFixtures::provider_session())
            .unwrap();
        api.respond(
            MockMethod::Get,
            PROFILE_PATH,
            json!({ "data": { "user": { "id": "user-001", "name": "An Nguyen" } } }),
        );

        let user = auth.fetch_profile().await.unwrap();

        assert_eq!(user.name.as_deref(), Some("An Nguyen"));
        assert_eq!(auth.session().user(), Some(user));
        assert_eq!(
            auth.session().refresh_token().as_deref(),
            Some("refresh-token-001")
        );
    }

    #[tokio::test]
    async fn test_fetch_profile_unauthorized_clears_session() {
        let (auth, api) = client();
        auth.session()
            .set_auth_data(&TestFixtures::provider_session())
            .unwrap();
        api.fail(MockMethod::Get, PROFILE_PATH, 401, None);

        assert!(auth.fetch_profile().await.is_err());
        assert!(!auth.session().is_authenticated());
        assert!(auth.session().user().is_none());
    }

    #[test]
    fn test_logout_is_idempotent() {
        let (auth, _) = client();
        auth.logout().unwrap();
        auth.session()
            .set_auth_data(&TestFixtures::provider_session())
            .unwrap();
        auth.logout().unwrap();
        assert!(auth.session().auth_data().is_empty());
    }
}
