//! Blocking `reqwest` implementation of [`HttpClient`].

use crate::error::{RemoteError, RemoteResult};
use crate::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use std::time::Duration;

/// HTTP client backed by `reqwest::blocking`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Builds a client with a request timeout.
    pub fn new(timeout: Duration) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::http_fatal(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn execute(&self, base_url: &str, request: HttpRequest) -> RemoteResult<HttpResponse> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), request.path);
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut builder = self.client.request(method, &url).query(&request.query);
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }
        let response = builder.send().map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                RemoteError::http_retryable(e.to_string())
            } else {
                RemoteError::http_fatal(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| RemoteError::http_retryable(e.to_string()))?
            .to_vec();
        Ok(HttpResponse::new(status, body))
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
