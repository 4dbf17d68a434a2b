//! Authenticated HTTP client for the Capella control-plane API.
//!
//! [`CapellaClient`] signs each request (see [`crate::auth`]), sends it with a
//! shared `reqwest` connection pool and maps non-success status codes onto
//! [`ProviderError`] variants. It is cheap to clone.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, LOCATION};
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::{Signer, TIMESTAMP_HEADER};
use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the Capella control-plane API.
#[derive(Clone)]
pub struct CapellaClient {
    http: reqwest::Client,
    base_url: String,
    signer: Signer,
}

impl std::fmt::Debug for CapellaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapellaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CapellaClient {
    /// Build a client from a resolved configuration.
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.clone(),
            signer: Signer::new(&config.access_key, &config.secret_key),
        })
    }

    /// The API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET` a JSON document.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, operation: &str) -> ProviderResult<T> {
        let response = self.send(Method::GET, path, None, operation).await?;
        Ok(response.json().await?)
    }

    /// `GET` a JSON document, mapping 404 to `None`.
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        operation: &str,
    ) -> ProviderResult<Option<T>> {
        match self.get(path, operation).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// `POST` a JSON body and decode the JSON response.
    pub async fn post<B, T>(&self, path: &str, body: &B, operation: &str) -> ProviderResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::POST, path, Some(body), operation).await?;
        Ok(response.json().await?)
    }

    /// `POST` a JSON body, ignoring the response body.
    pub async fn post_empty<B>(&self, path: &str, body: &B, operation: &str) -> ProviderResult<()>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.send(Method::POST, path, Some(body), operation).await?;
        Ok(())
    }

    /// `POST` a JSON body and return the ID named by the `Location` header.
    pub async fn post_for_location<B>(
        &self,
        path: &str,
        body: &B,
        operation: &str,
    ) -> ProviderResult<String>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::POST, path, Some(body), operation).await?;
        let status = response.status();

        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(id_from_location)
            .ok_or_else(|| ProviderError::Api {
                status: status.as_u16(),
                body: format!("{}: response carries no usable Location header", operation),
            })
    }

    /// `PUT` a JSON body, ignoring the response body.
    pub async fn put<B>(&self, path: &str, body: &B, operation: &str) -> ProviderResult<()>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.send(Method::PUT, path, Some(body), operation).await?;
        Ok(())
    }

    /// `DELETE` a resource.
    pub async fn delete(&self, path: &str, operation: &str) -> ProviderResult<()> {
        self.send(Method::DELETE, path, None, operation).await?;
        Ok(())
    }

    /// `DELETE` with a JSON body (the bucket endpoint names its target in the body).
    pub async fn delete_with_body<B>(
        &self,
        path: &str,
        body: &B,
        operation: &str,
    ) -> ProviderResult<()>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.send(Method::DELETE, path, Some(body), operation).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        operation: &str,
    ) -> ProviderResult<Response> {
        let url = Url::parse(&format!("{}{}", self.base_url, path)).map_err(|e| {
            ProviderError::Configuration(format!("invalid request URL for {}: {}", path, e))
        })?;

        let signed_path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        let headers = self.signer.sign(method.as_str(), &signed_path)?;

        debug!(method = %method, path = %signed_path, operation, "sending request");

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(AUTHORIZATION, headers.authorization)
            .header(TIMESTAMP_HEADER, headers.timestamp);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(method = %method, path = %signed_path, status = status.as_u16(), "received response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status != StatusCode::NOT_FOUND {
            warn!(operation, status = status.as_u16(), "request failed");
        }
        Err(error_for_status(status, body, operation))
    }
}

/// Map a non-success status code to a [`ProviderError`].
pub fn error_for_status(status: StatusCode, body: String, operation: &str) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED => ProviderError::Unauthenticated(append_body(
            format!(
                "{}: verify the validity of your access key and secret key",
                operation
            ),
            &body,
        )),
        StatusCode::FORBIDDEN => ProviderError::PermissionDenied(append_body(
            format!("you don't have the required access to {}", operation),
            &body,
        )),
        StatusCode::NOT_FOUND => ProviderError::NotFound(if body.is_empty() {
            operation.to_string()
        } else {
            format!("{}: {}", operation, body)
        }),
        StatusCode::CONFLICT => ProviderError::AlreadyExists(format!("{}: {}", operation, body)),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ProviderError::Validation(
            format!("{} rejected by the API: {}", operation, body),
        ),
        StatusCode::TOO_MANY_REQUESTS => {
            ProviderError::ResourceExhausted(format!("{}: {}", operation, body))
        },
        s if s.is_server_error() => {
            ProviderError::Unavailable(format!("{} ({}): {}", operation, s.as_u16(), body))
        },
        s => ProviderError::Api {
            status: s.as_u16(),
            body,
        },
    }
}

fn append_body(message: String, body: &str) -> String {
    if body.is_empty() {
        message
    } else {
        format!("{}: {}", message, body)
    }
}

/// Extract the resource ID from a `Location` header: its last path segment.
pub fn id_from_location(location: &str) -> Option<String> {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
