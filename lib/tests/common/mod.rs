#![allow(dead_code)]

use anyhow::{anyhow, Result};
use blazegraph::{
    BlazegraphConnector, ConnectionConfig, HttpMethod, HttpResponse, PendingRequest, Transport,
};
use blazegraph::transport::ResponseCallback;
use oxigraph::model::{Graph, Literal, NamedNode, Triple};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub const BASE: &str = "http://localhost:9999/bigdata";

pub type Responder = Box<dyn Fn(&PendingRequest) -> Result<HttpResponse> + Send + Sync>;

/// What a request is, from the store's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Begin,
    Commit,
    Abort,
    Data(HttpMethod),
}

pub fn kind(request: &PendingRequest) -> Kind {
    let path = request.relative_to(BASE);
    if path.starts_with("/tx?timestamp=-1") {
        Kind::Begin
    } else if path.starts_with("/tx/") && path.ends_with("?COMMIT") {
        Kind::Commit
    } else if path.starts_with("/tx/") && path.ends_with("?ABORT") {
        Kind::Abort
    } else {
        Kind::Data(request.method)
    }
}

pub fn ok(content_type: &str, body: &str) -> Result<HttpResponse> {
    Ok(HttpResponse {
        status: 200,
        content_type: Some(content_type.to_string()),
        body: body.as_bytes().to_vec(),
    })
}

pub fn status(code: u16, body: &str) -> Result<HttpResponse> {
    Ok(HttpResponse {
        status: code,
        content_type: Some("text/plain".to_string()),
        body: body.as_bytes().to_vec(),
    })
}

pub fn begin_response(id: &str) -> Result<HttpResponse> {
    ok(
        "application/xml",
        &format!(
            r#"<?xml version="1.0"?><response><tx txId="{id}" readsOnCommitTime="1" readOnly="false"/></response>"#
        ),
    )
}

/// In-memory store that hands out transaction ids `1`, `2`, ... and accepts
/// everything else. `data` answers non-transaction requests.
pub fn store_with(
    data: impl Fn(&PendingRequest) -> Result<HttpResponse> + Send + Sync + 'static,
) -> Responder {
    let next = AtomicU64::new(1);
    Box::new(move |request| match kind(request) {
        Kind::Begin => begin_response(&next.fetch_add(1, Ordering::SeqCst).to_string()),
        Kind::Commit | Kind::Abort => ok("application/xml", "<response/>"),
        Kind::Data(_) => data(request),
    })
}

pub fn accepting_store() -> Responder {
    store_with(|_| ok("text/plain", ""))
}

/// Records every request and answers through a [`Responder`]. Callback sends
/// complete on a fresh thread.
pub struct MockTransport {
    responder: Responder,
    requests: Mutex<Vec<PendingRequest>>,
}

impl MockTransport {
    pub fn new(responder: Responder) -> Arc<Self> {
        Arc::new(MockTransport {
            responder,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn accepting() -> Arc<Self> {
        Self::new(accepting_store())
    }

    pub fn unreachable() -> Arc<Self> {
        Self::new(Box::new(|_| Err(anyhow!("connection refused"))))
    }

    fn handle(&self, request: PendingRequest) -> Result<HttpResponse> {
        let response = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }

    pub fn requests(&self) -> Vec<PendingRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<Kind> {
        self.requests().iter().map(kind).collect()
    }

    pub fn data_requests(&self) -> Vec<PendingRequest> {
        self.requests()
            .into_iter()
            .filter(|r| matches!(kind(r), Kind::Data(_)))
            .collect()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: PendingRequest) -> Result<HttpResponse> {
        self.handle(request)
    }

    fn send_async(&self, request: PendingRequest, done: ResponseCallback) {
        let response = self.handle(request);
        std::thread::spawn(move || done(response));
    }
}

pub fn connector(transport: &Arc<MockTransport>) -> BlazegraphConnector {
    let config = ConnectionConfig::new(BASE, "kb").unwrap();
    BlazegraphConnector::with_transport(config, transport.clone())
}

pub fn triple(subject: &str, predicate: &str, object: &str) -> Triple {
    Triple::new(
        NamedNode::new(subject).unwrap(),
        NamedNode::new(predicate).unwrap(),
        Literal::new_simple_literal(object),
    )
}

pub fn book_graph() -> Graph {
    let mut graph = Graph::new();
    graph.insert(&triple(
        "http://example/book1",
        "http://purl.org/dc/elements/1.1/title",
        "SPARQL Tutorial",
    ));
    graph
}

pub fn body_text(request: &PendingRequest) -> String {
    String::from_utf8(request.body.clone().unwrap_or_default()).unwrap()
}
