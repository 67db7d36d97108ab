//! Fluent builders for creating customizable test objects

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::models::{Tour, TourStatus};

/// Builder for unsigned, well-formed bearer tokens
///
/// The signature segment is a fixed placeholder; nothing in the client
/// verifies it.
#[derive(Debug, Clone, Default)]
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary claim
    #[must_use]
    pub fn claim(mut self, key: &str, value: Value) -> Self {
        self.claims.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn role(self, role: &str) -> Self {
        self.claim("role", json!(role))
    }

    #[must_use]
    pub fn provider_id(self, provider_id: &str) -> Self {
        self.claim("providerId", json!(provider_id))
    }

    #[must_use]
    pub fn subject(self, sub: &str) -> Self {
        self.claim("sub", json!(sub))
    }

    /// Set `exp` relative to now; negative values produce an expired token
    #[must_use]
    pub fn expires_in(self, seconds: i64) -> Self {
        self.claim("exp", json!(Utc::now().timestamp() + seconds))
    }

    #[must_use]
    pub fn expired(self) -> Self {
        self.expires_in(-3600)
    }

    #[must_use]
    pub fn build(self) -> String {
        let header = json!({ "alg": "HS256", "typ": "JWT" });
        let header_b64 = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_b64 =
            general_purpose::URL_SAFE_NO_PAD.encode(Value::Object(self.claims).to_string());
        let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(b"test-signature");
        format!("{header_b64}.{payload_b64}.{signature_b64}")
    }
}

/// Builder for [`Tour`] records shaped like server responses
#[derive(Debug, Clone)]
pub struct TourBuilder {
    fields: Map<String, Value>,
}

impl TourBuilder {
    #[must_use]
    pub fn new(id: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_string(), json!(id));
        fields.insert("title".to_string(), json!(format!("Tour {id}")));
        Self { fields }
    }

    #[must_use]
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn title(self, title: &str) -> Self {
        self.field("title", json!(title))
    }

    #[must_use]
    pub fn status(self, status: TourStatus) -> Self {
        self.field("status", json!(status.as_str()))
    }

    #[must_use]
    pub fn price(self, price: f64) -> Self {
        self.field("price", json!(price))
    }

    #[must_use]
    pub fn image(mut self, url: &str) -> Self {
        let images = self
            .fields
            .entry("images")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = images {
            list.push(json!(url));
        }
        self
    }

    /// Server-side JSON form
    #[must_use]
    pub fn json(self) -> Value {
        Value::Object(self.fields)
    }

    /// # Panics
    ///
    /// Panics if the accumulated fields do not form a valid tour.
    #[must_use]
    pub fn build(self) -> Tour {
        serde_json::from_value(self.json()).expect("builder fields should form a tour")
    }
}
