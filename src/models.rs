use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub mod tour;

pub use tour::{Tour, TourDraft, TourStatus};

/// Identity snapshot persisted under the `user` storage key
///
/// Mirrors the latest server-issued profile. Unknown fields are carried in
/// `extra` so older clients do not drop data a newer backend adds.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, alias = "fullName")]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    #[must_use]
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }
}

/// Accept ids sent either as JSON strings or numbers
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// The session triple returned by login/registration and held by the session store
///
/// Every field is independently optional; a batch write only touches the
/// fields that are present.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", from = "AuthDataWire")]
pub struct AuthData {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserRecord>,
}

/// Incoming shape; older backends send the access token as `token`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthDataWire {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default, rename = "token")]
    legacy_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<UserRecord>,
}

impl From<AuthDataWire> for AuthData {
    fn from(wire: AuthDataWire) -> Self {
        let non_empty = |t: Option<String>| t.filter(|t| !t.is_empty());
        Self {
            access_token: non_empty(wire.access_token).or(non_empty(wire.legacy_token)),
            refresh_token: wire.refresh_token,
            user: wire.user,
        }
    }
}

impl AuthData {
    #[must_use]
    pub fn new(
        access_token: Option<String>,
        refresh_token: Option<String>,
        user: Option<UserRecord>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            user,
        }
    }

    /// True when no field is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }
}
