//! HTTP execution abstraction.
//!
//! The cluster layer talks to endpoints only through [`HttpExecutor`], so tests
//! can swap the network for canned or simulated responses.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use crate::types::{HttpRequest, HttpResponse};

/// Failure to get any HTTP response out of an endpoint.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request's own timeout elapsed.
    #[error("timed out")]
    Timeout,

    /// Connection refused, DNS failure, reset, and the like.
    #[error("{0}")]
    Unreachable(String),
}

/// Trait for executing HTTP requests against one endpoint.
pub trait HttpExecutor: Send + Sync {
    /// Execute an HTTP request and return the response, whatever its status.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production HTTP executor using reqwest's blocking client.
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    /// Create a new executor that gives up connecting after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap an already configured client (custom TLS roots, proxies).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl HttpExecutor for ReqwestExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let method: http::Method = request.method.into();
        let mut req_builder = self.client.request(method, &request.url);

        if !request.query.is_empty() {
            req_builder = req_builder.query(&request.query);
        }

        if !request.form.is_empty() {
            req_builder = req_builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(request.encoded_form());
        }

        if let Some(timeout) = request.timeout {
            req_builder = req_builder.timeout(timeout);
        }

        let response = req_builder.send().map_err(classify)?;

        let status = response.status().as_u16();
        let body_text = response.text().map_err(classify)?;

        Ok(HttpResponse { status, body_text })
    }
}

/// A connect failure is an unreachable endpoint even when it was the connect
/// timeout that fired; only a timeout after connecting ends the call.
fn classify(error: reqwest::Error) -> TransportError {
    if error.is_connect() {
        TransportError::Unreachable(error.to_string())
    } else if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Unreachable(error.to_string())
    }
}
