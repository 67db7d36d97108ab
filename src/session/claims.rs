//! Unverified bearer token inspection
//!
//! Tokens are read only to drive optimistic client state (who am I, when does
//! my session run out). Signatures are never checked here; the backend is the
//! authority on every request.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;

/// Claims decoded from the middle segment of a bearer token
#[derive(Debug, Clone, PartialEq)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Raw claim lookup
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Expiry claim in UNIX seconds. Fractional values are truncated.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn exp(&self) -> Option<i64> {
        let exp = self.0.get("exp")?;
        exp.as_i64()
            .or_else(|| exp.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
    }

    /// Expiry claim as an absolute point in time
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp()?, 0)
    }

    /// Subject claim
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.0.get("sub").and_then(scalar_to_string)
    }

    /// Raw role, either flat (`role`) or nested (`user.role`)
    #[must_use]
    pub fn raw_role(&self) -> Option<&str> {
        self.0
            .get("role")
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
            .or_else(|| {
                self.nested_user()?
                    .get("role")?
                    .as_str()
                    .filter(|r| !r.is_empty())
            })
    }

    /// Normalized role
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.raw_role().map(Role::from_claim)
    }

    /// Provider id: `providerId`, falling back to nested `user.id`
    #[must_use]
    pub fn provider_id(&self) -> Option<String> {
        self.0
            .get("providerId")
            .and_then(scalar_to_string)
            .or_else(|| self.nested_user()?.get("id").and_then(scalar_to_string))
    }

    fn nested_user(&self) -> Option<&Map<String, Value>> {
        self.0.get("user")?.as_object()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Canonical marketplace role
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Provider,
    Traveler,
    Admin,
    /// A role outside the mapping table, kept verbatim
    Other(String),
}

impl Role {
    /// Normalize a raw role claim through the fixed mapping table
    #[must_use]
    pub fn from_claim(raw: &str) -> Self {
        match raw {
            "ServiceProvider" | "PROVIDER" => Self::Provider,
            "Traveler" | "TRAVELER" => Self::Traveler,
            "Admin" | "ADMIN" => Self::Admin,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Provider => "PROVIDER",
            Self::Traveler => "TRAVELER",
            Self::Admin => "ADMIN",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode the claims of a three-segment token
///
/// Returns `None` for anything that is not exactly three dot-delimited
/// segments whose middle segment is base64url-encoded JSON object text.
#[must_use]
pub fn decode_token(token: &str) -> Option<Claims> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let payload_b64 = parts[1].trim_end_matches('=');
    if payload_b64.is_empty() {
        return None;
    }
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(payload_b64))
        .ok()?;

    match serde_json::from_slice::<Value>(&payload_bytes).ok()? {
        Value::Object(map) => Some(Claims(map)),
        _ => None,
    }
}

/// Whether the token is unusable at `now`
///
/// Absent, undecodable and expiry-less tokens all count as expired.
#[must_use]
pub fn is_token_expired_at(token: Option<&str>, now: DateTime<Utc>) -> bool {
    match token.and_then(decode_token).and_then(|c| c.exp()) {
        Some(exp) => exp < now.timestamp(),
        None => true,
    }
}

/// Seconds left before the token expires at `now`, never negative
#[must_use]
pub fn time_until_expiration_at(token: Option<&str>, now: DateTime<Utc>) -> u64 {
    token
        .and_then(decode_token)
        .and_then(|c| c.exp())
        .map_or(0, |exp| {
            u64::try_from(exp.saturating_sub(now.timestamp())).unwrap_or(0)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::builders::TestTokenBuilder;
    use serde_json::json;

    #[test]
    fn test_decode_token_reads_claims() {
        let token = TestTokenBuilder::new()
            .claim("sub", json!("42"))
            .claim("exp", json!(1_900_000_000))
            .build();

        let claims = decode_token(&token).expect("claims should decode");
        assert_eq!(claims.subject().as_deref(), Some("42"));
        assert_eq!(claims.exp(), Some(1_900_000_000));
    }

    #[test]
    fn test_decode_token_rejects_malformed_input() {
        let not_object = format!(
            "h.{}.s",
            general_purpose::URL_SAFE_NO_PAD.encode(b"[1,2,3]")
        );
        let bad_json = format!("h.{}.s", general_purpose::URL_SAFE_NO_PAD.encode(b"{nope"));

        for malformed in [
            "",
            "abc",
            "a.b",
            "a.b.c.d",
            "a.!!!.c",
            "a..c",
            not_object.as_str(),
            bad_json.as_str(),
        ] {
            assert!(decode_token(malformed).is_none(), "{malformed:?} decoded");
            assert!(is_token_expired_at(Some(malformed), Utc::now()));
        }
    }

    #[test]
    fn test_decode_token_tolerates_padding() {
        let payload = general_purpose::URL_SAFE.encode(br#"{"role":"Admin"}"#);
        let token = format!("header.{payload}.sig");
        assert_eq!(decode_token(&token).unwrap().role(), Some(Role::Admin));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let at = |exp: i64| TestTokenBuilder::new().claim("exp", json!(exp)).build();

        assert!(is_token_expired_at(Some(&at(1_699_999_999)), now));
        assert!(!is_token_expired_at(Some(&at(1_700_000_000)), now));
        assert!(!is_token_expired_at(Some(&at(1_700_000_001)), now));
        assert!(is_token_expired_at(None, now));

        let no_exp = TestTokenBuilder::new().claim("sub", json!("1")).build();
        assert!(is_token_expired_at(Some(&no_exp), now));
    }

    #[test]
    fn test_time_until_expiration_is_floored() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let future = TestTokenBuilder::new().claim("exp", json!(1_700_000_090)).build();
        let past = TestTokenBuilder::new().claim("exp", json!(1_600_000_000)).build();

        assert_eq!(time_until_expiration_at(Some(&future), now), 90);
        assert_eq!(time_until_expiration_at(Some(&past), now), 0);
        assert_eq!(time_until_expiration_at(Some("garbage"), now), 0);
    }

    #[test]
    fn test_extreme_expiry_claims_floor_to_zero() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        for exp in [json!(i64::MIN), json!(-1e300)] {
            let token = TestTokenBuilder::new().claim("exp", exp).build();
            assert_eq!(time_until_expiration_at(Some(&token), now), 0);
            assert!(is_token_expired_at(Some(&token), now));
        }

        let far_future = TestTokenBuilder::new().claim("exp", json!(i64::MAX)).build();
        assert!(time_until_expiration_at(Some(&far_future), now) > 0);
    }

    #[test]
    fn test_role_normalization_table() {
        assert_eq!(Role::from_claim("ServiceProvider").as_str(), "PROVIDER");
        assert_eq!(Role::from_claim("Traveler").as_str(), "TRAVELER");
        assert_eq!(Role::from_claim("Admin").as_str(), "ADMIN");
        assert_eq!(Role::from_claim("Courier").as_str(), "Courier");
    }

    #[test]
    fn test_nested_user_claims() {
        let token = TestTokenBuilder::new()
            .claim("user", json!({ "id": 77, "role": "ServiceProvider" }))
            .build();
        let claims = decode_token(&token).unwrap();

        assert_eq!(claims.role(), Some(Role::Provider));
        assert_eq!(claims.provider_id().as_deref(), Some("77"));
    }

    #[test]
    fn test_empty_role_claims_read_as_absent() {
        let falls_through = TestTokenBuilder::new()
            .claim("role", json!(""))
            .claim("user", json!({ "role": "Traveler" }))
            .build();
        assert_eq!(decode_token(&falls_through).unwrap().role(), Some(Role::Traveler));

        let both_empty = TestTokenBuilder::new()
            .claim("role", json!(""))
            .claim("user", json!({ "role": "" }))
            .build();
        assert_eq!(decode_token(&both_empty).unwrap().role(), None);
    }

    #[test]
    fn test_flat_provider_id_wins_over_nested_user() {
        let token = TestTokenBuilder::new()
            .claim("providerId", json!("prov-1"))
            .claim("user", json!({ "id": "user-9" }))
            .build();
        assert_eq!(
            decode_token(&token).unwrap().provider_id().as_deref(),
            Some("prov-1")
        );
    }
}
