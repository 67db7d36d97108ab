use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::{extract_error_message, ApiClient, ApiError};
use crate::session::SessionStore;
use crate::settings::ApiSettings;

/// reqwest-backed [`ApiClient`] that authenticates with the session's access token
#[derive(Clone, Debug)]
pub struct HttpApiClient {
    base_url: Url,
    http_client: reqwest::Client,
    session: SessionStore,
}

impl HttpApiClient {
    /// Build a client for the configured backend
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be constructed.
    pub fn new(settings: &ApiSettings, session: SessionStore) -> Result<Self, ApiError> {
        let mut base = settings.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid base URL '{base}': {e}")))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .user_agent(concat!("tourdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            base_url,
            http_client,
            session,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Resolve an API path against the base URL, keeping any base path prefix
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("invalid path '{path}': {e}")))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(path)?;
        debug!("{method} {url}");
        let builder = self.http_client.request(method, url);
        Ok(match self.session.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(builder: RequestBuilder) -> Result<Value, ApiError> {
        let response = builder.send().await?;
        Self::read_body(response).await
    }

    async fn read_body(response: Response) -> Result<Value, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .as_ref()
                .and_then(extract_error_message);
            warn!("Backend returned {status}: {}", message.as_deref().unwrap_or("<no message>"));
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
        let mut builder = self.request(Method::GET, path)?;
        if !query.is_empty() {
            builder = builder.query(query);
        }
        Self::send(builder).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        Self::send(self.request(Method::POST, path)?.json(&body)).await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        Self::send(self.request(Method::PUT, path)?.json(&body)).await
    }

    async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        Self::send(self.request(Method::DELETE, path)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> HttpApiClient {
        let settings = ApiSettings {
            base_url: base_url.to_string(),
            timeout_seconds: 5,
        };
        HttpApiClient::new(&settings, SessionStore::in_memory()).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let api = client("https://api.example.com/v1");
        assert_eq!(
            api.endpoint("/providers/p1/tours").unwrap().as_str(),
            "https://api.example.com/v1/providers/p1/tours"
        );
    }

    #[test]
    fn test_endpoint_with_root_base() {
        let api = client("http://localhost:4000/");
        assert_eq!(
            api.endpoint("auth/login").unwrap().as_str(),
            "http://localhost:4000/auth/login"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let settings = ApiSettings {
            base_url: "not a url".to_string(),
            timeout_seconds: 5,
        };
        let err = HttpApiClient::new(&settings, SessionStore::in_memory()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[test]
    fn test_bearer_token_is_attached_when_present() {
        let session = SessionStore::in_memory();
        session.set_access_token(Some("tok-123")).unwrap();
        let settings = ApiSettings {
            base_url: "https://api.example.com".to_string(),
            timeout_seconds: 5,
        };
        let api = HttpApiClient::new(&settings, session).unwrap();

        let request = api
            .request(Method::GET, "/auth/profile")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get(reqwest::header::AUTHORIZATION).unwrap(),
            "Bearer tok-123"
        );
    }
}
