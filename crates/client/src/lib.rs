//! SignalFx REST API client for signalform.
//!
//! A deliberately thin layer: one request wrapper that attaches the
//! `X-SF-Token` header and hands back the raw status and body, plus URL
//! builders for API endpoints and web-app links. Interpreting statuses
//! (for example treating 404 as "resource gone") is left to the caller.

mod error;
mod urls;

pub use error::{Error, Result};
pub use reqwest::{Method, StatusCode};
pub use urls::{build_app_url, build_url};

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

/// Header carrying the organization access token.
pub const TOKEN_HEADER: &str = "X-SF-Token";

/// Raw response from the API.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Request URL, kept for error messages
    pub url: String,
    /// HTTP status code
    pub status: StatusCode,
    /// Response body
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the server reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }

    /// Body as lossy UTF-8, for error reporting.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|source| Error::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

/// Sends one request and returns whatever the server answered.
///
/// # Errors
///
/// Returns [`Error::Http`] on transport failure. HTTP error statuses are
/// returned as a normal [`ApiResponse`].
#[instrument(name = "sfx_request", skip_all, fields(%method, %url))]
pub async fn send_request(
    client: &reqwest::Client,
    method: Method,
    url: &Url,
    token: &str,
    payload: Option<Vec<u8>>,
) -> Result<ApiResponse> {
    let http_error = |source: reqwest::Error| Error::Http {
        url: url.to_string(),
        source,
    };

    let mut request = client
        .request(method, url.clone())
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .header(TOKEN_HEADER, token);
    if let Some(body) = payload {
        request = request.body(body);
    }

    let response = request.send().await.map_err(http_error)?;
    let status = response.status();
    let body = response.bytes().await.map_err(http_error)?.to_vec();

    debug!(status = status.as_u16(), bytes = body.len(), "SignalFx API responded");

    Ok(ApiResponse {
        url: url.to_string(),
        status,
        body,
    })
}

/// Connection settings plus a pooled HTTP client.
#[derive(Clone)]
pub struct SignalFxClient {
    http: reqwest::Client,
    api_url: String,
    app_url: String,
    token: String,
}

impl std::fmt::Debug for SignalFxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalFxClient")
            .field("api_url", &self.api_url)
            .field("app_url", &self.app_url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl SignalFxClient {
    /// Creates a client for the given API and web-app base URLs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if either base URL is not absolute, or
    /// [`Error::Build`] if the TLS backend fails to initialize.
    pub fn new(
        api_url: impl Into<String>,
        app_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_url = api_url.into();
        let app_url = app_url.into();
        build_url(&api_url, "", &[])?;
        build_app_url(&app_url, "")?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("signalform/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(Error::Build)?;

        Ok(Self {
            http,
            api_url,
            app_url,
            token: token.into(),
        })
    }

    /// Base API URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Base web-app URL.
    #[must_use]
    pub fn app_url(&self) -> &str {
        &self.app_url
    }

    /// Absolute API URL for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the base URL is malformed.
    pub fn url(&self, path: &str) -> Result<Url> {
        build_url(&self.api_url, path, &[])
    }

    /// Web-app link for `fragment`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the base URL is malformed.
    pub fn app_link(&self, fragment: &str) -> Result<Url> {
        build_app_url(&self.app_url, fragment)
    }

    /// Sends a request to `path`, serializing `payload` as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error on URL, encoding or transport failure.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<ApiResponse> {
        let url = self.url(path)?;
        let body = payload
            .map(serde_json::to_vec)
            .transpose()
            .map_err(Error::Encode)?;
        send_request(&self.http, method, &url, &self.token, body).await
    }

    /// `GET path`.
    ///
    /// # Errors
    ///
    /// See [`SignalFxClient::send`].
    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.send(Method::GET, path, None).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`SignalFxClient::send`].
    pub async fn post(&self, path: &str, payload: &serde_json::Value) -> Result<ApiResponse> {
        self.send(Method::POST, path, Some(payload)).await
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`SignalFxClient::send`].
    pub async fn put(&self, path: &str, payload: &serde_json::Value) -> Result<ApiResponse> {
        self.send(Method::PUT, path, Some(payload)).await
    }

    /// `DELETE path`.
    ///
    /// # Errors
    ///
    /// See [`SignalFxClient::send`].
    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.send(Method::DELETE, path, None).await
    }
}
