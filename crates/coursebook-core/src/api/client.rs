//! The authenticated gateway every backend call goes through.
//!
//! `ApiClient` reads the current access token from the shared
//! `SessionStore` right before each request and attaches it as a bearer
//! credential. Failures come back as `ApiError`; a 401 is surfaced as
//! `ApiError::Unauthorized` and never retried.

use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::SessionStore;
use crate::config::{Config, DEFAULT_REQUEST_TIMEOUT_SECS};

use super::ApiError;

pub type ApiResult<T> = Result<T, ApiError>;

/// API client for the learning-management backend.
/// Clone is cheap - reqwest::Client and SessionStore are both shared handles.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    /// Create a client with the default request timeout
    pub fn new(base_url: &str, session: SessionStore) -> ApiResult<Self> {
        Self::with_timeout(
            base_url,
            session,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(base_url: &str, session: SessionStore, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn from_config(config: &Config, session: SessionStore) -> ApiResult<Self> {
        Self::with_timeout(
            config.api_base(),
            session,
            Duration::from_secs(config.request_timeout_secs.max(1)),
        )
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Attach the current access token, if any. Without one the request
    /// goes out anonymous and the backend decides.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request with the session's credentials, turning non-success
    /// statuses into `ApiError`.
    async fn send(&self, request: RequestBuilder, method: &str, url: &str) -> ApiResult<Response> {
        self.dispatch(self.authorize(request), method, url).await
    }

    async fn dispatch(&self, request: RequestBuilder, method: &str, url: &str) -> ApiResult<Response> {
        let response = request
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!(method, url, error = %e, "Request failed to reach backend");
                ApiError::NetworkError(e)
            })?;

        let status = response.status();
        debug!(method, url, status = status.as_u16(), "Response received");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status, &body);
        if err.is_unauthorized() {
            warn!(method, url, "Backend rejected credentials");
        } else {
            debug!(method, url, error = %err, "Backend reported an error");
        }
        Err(err)
    }

    async fn parse<T: DeserializeOwned>(response: Response, url: &str) -> ApiResult<T> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    /// Like `parse`, but an empty body yields `T::default()`.
    async fn parse_or_default<T: DeserializeOwned + Default>(response: Response, url: &str) -> ApiResult<T> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.url(path);
        let response = self.send(self.client.get(&url), "GET", &url).await?;
        Self::parse(response, &url).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        let url = self.url(path);
        let response = self.send(self.client.post(&url).json(body), "POST", &url).await?;
        Self::parse(response, &url).await
    }

    /// POST to a public endpoint (login, registration, password reset).
    /// No token is attached: a stale one would get the request rejected
    /// before the backend looks at the credentials in the body.
    pub(crate) async fn post_anonymous<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        let url = self.url(path);
        let response = self.dispatch(self.client.post(&url).json(body), "POST", &url).await?;
        Self::parse(response, &url).await
    }

    /// Like `post_anonymous`, for endpoints that may answer with an empty body.
    pub(crate) async fn post_anonymous_ack<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned + Default,
        B: Serialize,
    {
        let url = self.url(path);
        let response = self.dispatch(self.client.post(&url).json(body), "POST", &url).await?;
        Self::parse_or_default(response, &url).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        let url = self.url(path);
        let response = self.send(self.client.put(&url).json(body), "PUT", &url).await?;
        Self::parse(response, &url).await
    }

    pub(crate) async fn delete(&self, path: &str) -> ApiResult<()> {
        let url = self.url(path);
        self.send(self.client.delete(&url), "DELETE", &url).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish()
    }
}
