//! HTTP seam.
//!
//! The registry, the auth client and the fetch entry point talk HTTP only
//! through [`Transport`]. A response with any status is `Ok`; `Err` means the
//! request never produced a response. Interpreting the status is the caller's
//! job, which keeps the parsing of each endpoint pure and testable.
//!
//! With the `http` feature, [`HttpTransport`] implements the trait on
//! `reqwest`, resolving relative paths against a base URL.

use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;

/// HTTP method subset the gate needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Outgoing request. `url` may be a path relative to the transport's origin.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// Response status and raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `2xx`, the same test as `Response.ok`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Something that can perform an HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(feature = "http")]
pub use self::reqwest_transport::HttpTransport;

#[cfg(feature = "http")]
mod reqwest_transport {
    use super::{HttpRequest, HttpResponse, Method, Transport};
    use crate::error::TransportError;
    use async_trait::async_trait;
    use url::Url;

    /// [`Transport`] over `reqwest`.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        http: reqwest::Client,
        base: Url,
    }

    impl HttpTransport {
        /// Transport that resolves relative request paths against `base`
        /// (the page origin, e.g. `https://app.example.com/`).
        pub fn new(base: &str) -> Result<Self, TransportError> {
            let base = Url::parse(base).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
            Ok(Self {
                http: reqwest::Client::new(),
                base,
            })
        }

        /// Use a preconfigured client (timeouts, cookies, ...).
        pub fn with_client(mut self, http: reqwest::Client) -> Self {
            self.http = http;
            self
        }

        fn resolve(&self, url: &str) -> Result<Url, TransportError> {
            self.base
                .join(url)
                .map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))
        }
    }

    #[async_trait]
    impl Transport for HttpTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let url = self.resolve(&request.url)?;
            let builder = match request.method {
                Method::Get => self.http.get(url),
                Method::Post => self.http.post(url),
            };
            let builder = match &request.body {
                Some(body) => builder.json(body),
                None => builder,
            };

            let response = builder
                .send()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;

            Ok(HttpResponse { status, body })
        }
    }

}
