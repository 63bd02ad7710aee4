//! Construction of HTTP requests against a Blazegraph server: namespace scoping,
//! transaction-id propagation, query timeouts and the caller's customization hook.

use crate::config::ConnectionConfig;
use crate::consts::{
    BEGIN_TX_PATH, FORM_URL_ENCODED, QUERY_TIMEOUT_HEADER, TIMESTAMP_PARAM, TX_PATH,
    XML_MEDIA_TYPE,
};
use crate::model::TransactionId;
use crate::options::QueryTimeout;
use std::fmt;
use std::sync::Arc;
use url::form_urlencoded::byte_serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built request, handed to the transport exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl PendingRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replaces any existing header with the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    /// Path and query of the URL, relative to `base`.
    pub fn relative_to<'a>(&'a self, base: &str) -> &'a str {
        self.url.strip_prefix(base).unwrap_or(&self.url)
    }
}

/// Applied to every request after the default headers are set.
pub type RequestHook = Arc<dyn Fn(&mut PendingRequest) + Send + Sync>;

/// What a single call needs from the store, before URL and header rules are applied.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub path: String,
    pub accept: String,
    pub params: Vec<(String, String)>,
    /// Scope the path under `/namespace/<ns>`; transaction endpoints are not scoped.
    pub namespaced: bool,
    pub timeout: QueryTimeout,
    pub content_type: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, path: impl Into<String>, accept: impl Into<String>) -> Self {
        RequestSpec {
            method,
            path: path.into(),
            accept: accept.into(),
            params: Vec::new(),
            namespaced: true,
            timeout: QueryTimeout::Unspecified,
            content_type: None,
            body: None,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn without_namespace(mut self) -> Self {
        self.namespaced = false;
        self
    }

    pub fn timeout(mut self, timeout: QueryTimeout) -> Self {
        self.timeout = timeout;
        self
    }

    /// `Content-Type` for a request that carries no body.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn body(mut self, content_type: impl Into<String>, body: Vec<u8>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = Some(body);
        self
    }

    fn has_explicit_timestamp(&self) -> bool {
        self.params.iter().any(|(k, _)| k == TIMESTAMP_PARAM)
            || self.path.contains(&format!("{TIMESTAMP_PARAM}="))
    }
}

/// Builds [`PendingRequest`]s for one connection. Immutable once created.
#[derive(Clone)]
pub struct RequestBuilder {
    config: Arc<ConnectionConfig>,
    hook: Option<RequestHook>,
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("config", &self.config)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl RequestBuilder {
    pub fn new(config: Arc<ConnectionConfig>, hook: Option<RequestHook>) -> Self {
        RequestBuilder { config, hook }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Resolves `spec` into a request. `transaction` is the active transaction, if any;
    /// its id is sent as `timestamp` unless the spec already carries one.
    pub fn build(&self, spec: RequestSpec, transaction: Option<&TransactionId>) -> PendingRequest {
        let mut url = if spec.namespaced {
            format!("{}{}", self.config.namespace_root(), spec.path)
        } else {
            format!("{}{}", self.config.base_uri(), spec.path)
        };

        let mut params = spec.params.clone();
        if let Some(tx) = transaction {
            if !spec.has_explicit_timestamp() {
                params.push((TIMESTAMP_PARAM.to_string(), tx.as_str().to_string()));
            }
        }
        if !params.is_empty() {
            url.push(if spec.path.contains('?') { '&' } else { '?' });
            url.push_str(&encode_params(&params));
        }

        let mut request = PendingRequest {
            method: spec.method,
            url,
            headers: vec![("Accept".to_string(), spec.accept)],
            body: None,
        };
        if let Some(value) = spec.timeout.header_value() {
            request.set_header(QUERY_TIMEOUT_HEADER, value);
        }
        if let Some(content_type) = spec.content_type {
            request.set_header("Content-Type", content_type);
        }
        request.body = spec.body;

        if let Some(hook) = &self.hook {
            hook(&mut request);
        }
        request
    }

    pub fn begin_transaction(&self) -> PendingRequest {
        let spec = RequestSpec::new(HttpMethod::Post, BEGIN_TX_PATH, XML_MEDIA_TYPE)
            .without_namespace()
            .body(FORM_URL_ENCODED, Vec::new());
        self.build(spec, None)
    }

    pub fn commit_transaction(&self, id: &TransactionId) -> PendingRequest {
        self.end_transaction(id, "COMMIT")
    }

    pub fn rollback_transaction(&self, id: &TransactionId) -> PendingRequest {
        self.end_transaction(id, "ABORT")
    }

    fn end_transaction(&self, id: &TransactionId, verb: &str) -> PendingRequest {
        let path = format!("{TX_PATH}{}?{verb}", encode_component(id.as_str()));
        let spec = RequestSpec::new(HttpMethod::Post, path, XML_MEDIA_TYPE)
            .without_namespace()
            .body(FORM_URL_ENCODED, Vec::new());
        // the id is already part of the path
        self.build(spec, None)
    }
}

pub(crate) fn encode_component(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

/// `k1=v1&k2=v2`, values form-encoded.
pub(crate) fn encode_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={}", encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Builds a weighted `Accept` header honoring the provided priority order.
pub fn build_accept(accept_order: &[&str]) -> String {
    if accept_order.is_empty() {
        return "*/*".to_string();
    }
    let mut parts = Vec::new();
    let mut q = 1.0f32;
    for t in accept_order {
        parts.push(format!("{t}; q={:.2}", q));
        q = (q - 0.1f32).max(0.1f32);
    }
    parts.push("*/*; q=0.05".to_string());
    parts.join(", ")
}
