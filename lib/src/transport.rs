//! The HTTP round trip. Requests leave through the [`Transport`] trait so the
//! orchestration layer can run against any client; [`HttpTransport`] is the
//! `reqwest` implementation used by default.

use crate::request::{HttpMethod, PendingRequest};
use anyhow::Result;
use log::debug;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use std::time::Duration;

/// Status, declared content type and body of a store response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Continuation invoked once with the outcome of an asynchronous send.
pub type ResponseCallback = Box<dyn FnOnce(Result<HttpResponse>) + Send + 'static>;

pub trait Transport: Send + Sync {
    /// Sends `request` and blocks until the response body has been read.
    /// An `Err` means no HTTP response was obtained; non-2xx answers are `Ok`.
    fn send(&self, request: PendingRequest) -> Result<HttpResponse>;

    /// Sends `request` without blocking the caller; `done` runs exactly once, on
    /// whichever thread completes the exchange.
    fn send_async(&self, request: PendingRequest, done: ResponseCallback);
}

/// [`Transport`] over a blocking `reqwest` client. Callback sends run on a
/// dedicated thread per request.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpTransport { client })
    }

    pub fn from_client(client: Client) -> Self {
        HttpTransport { client }
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn execute(client: &Client, request: PendingRequest) -> Result<HttpResponse> {
    debug!("{} {}", request.method, request.url);
    let mut builder = client.request(to_method(request.method), request.url.as_str());
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = request.body {
        builder = builder.body(body);
    }
    let resp = builder.send()?;
    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let body = resp.bytes()?.to_vec();
    debug!(
        "{} {} -> {} ({}, {} bytes)",
        request.method,
        request.url,
        status,
        content_type.as_deref().unwrap_or("no content type"),
        body.len()
    );
    Ok(HttpResponse {
        status,
        content_type,
        body,
    })
}

impl Transport for HttpTransport {
    fn send(&self, request: PendingRequest) -> Result<HttpResponse> {
        execute(&self.client, request)
    }

    fn send_async(&self, request: PendingRequest, done: ResponseCallback) {
        let client = self.client.clone();
        std::thread::spawn(move || done(execute(&client, request)));
    }
}
