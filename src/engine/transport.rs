//! HTTP transport
//!
//! The executor talks to the network through the [`Transport`] trait so the
//! retry state machine can be driven by scripted responses in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

use crate::common::config::HttpConfig;
use crate::common::{Error, Result};
use crate::dsl::Method;

/// A fully built request for one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub body: Option<String>,
}

/// A buffered response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Sends one request and buffers the whole response
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`Transport`] backed by a shared reqwest client
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Build the header map; an explicit content type replaces any header of the same name
fn header_map(request: &HttpRequest) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::RequestBuild(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::RequestBuild(format!("invalid value for header '{}': {}", name, e)))?;
        headers.insert(name, value);
    }
    if let Some(content_type) = &request.content_type {
        let value = HeaderValue::from_str(content_type)
            .map_err(|e| Error::RequestBuild(format!("invalid content type '{}': {}", content_type, e)))?;
        headers.insert(CONTENT_TYPE, value);
    }
    Ok(headers)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| Error::Request(format!("invalid URL '{}': {}", request.url, e)))?;
        let headers = header_map(&request)?;

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), url)
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::ResponseRead(e.to_string()))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
