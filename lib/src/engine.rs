//! Every connector operation is a [`Stage`]: build one request, complete from its
//! response. The same stages run under two drivers, [`execute`] on the calling thread
//! and [`execute_async`] through transport callbacks. Mutating stages are bracketed
//! by the coordinator's auto-commit wrapper.

use crate::codec::RdfCodec;
use crate::consts::{
    ANY_MEDIA_TYPE, CONSTRUCT_ALL, CONTEXT_PARAM, FORM_URL_ENCODED, FORM_URL_ENCODED_UTF8,
    LIST_GRAPHS_QUERY, MAX_GET_QUERY_LENGTH, QUERY_PARAM, RDF_ACCEPT, SPARQL_PATH,
    SPARQL_RESULTS_ACCEPT, UPDATE_POST_PATH,
};
use crate::dispatch::ResponseDispatcher;
use crate::errors::{translate, Result};
use crate::model::{GraphUpdate, QueryResult, StoredGraph, TabularResult, TransactionId};
use crate::options::{Participation, QueryTimeout, TransactionMode};
use crate::payload::PayloadEncoder;
use crate::request::{
    build_accept, encode_params, HttpMethod, PendingRequest, RequestBuilder, RequestSpec,
};
use crate::transaction::{Done, TransactionCoordinator};
use crate::transport::HttpResponse;
use log::debug;
use oxigraph::model::{NamedNode, NamedNodeRef, Term};
use std::sync::Arc;

/// Where a mutating operation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Idle,
    TransactionAcquired,
    RequestSent,
    Committed,
    RolledBack,
    FailedNoCommit,
}

pub(crate) fn trace(operation: &str, state: OperationState) {
    debug!("{operation}: {state:?}");
}

pub trait Stage: Send + 'static {
    type Output: Send + 'static;

    /// Gerund used in logs and error messages, e.g. "saving a graph".
    fn operation(&self) -> &'static str;

    fn participation(&self) -> Participation;

    fn build(
        &self,
        builder: &RequestBuilder,
        transaction: Option<&TransactionId>,
    ) -> Result<PendingRequest>;

    /// Turns a 2xx response into the operation's output.
    fn complete(self, response: HttpResponse) -> Result<Self::Output>;
}

fn trace_sent(operation: &str, mode: TransactionMode) {
    debug!("{operation}: {:?} ({mode:?})", OperationState::RequestSent);
}

/// `mode` is `None` for reads, which sit outside the transaction lifecycle.
fn round_trip<S: Stage>(
    coordinator: &TransactionCoordinator,
    stage: S,
    transaction: Option<&TransactionId>,
    mode: Option<TransactionMode>,
) -> Result<S::Output> {
    let operation = stage.operation();
    let request = stage.build(coordinator.builder(), transaction)?;
    if let Some(mode) = mode {
        trace_sent(operation, mode);
    }
    let response = translate(operation, coordinator.transport().send(request))?;
    stage.complete(response)
}

/// Blocking driver.
pub fn execute<S: Stage>(coordinator: &TransactionCoordinator, stage: S) -> Result<S::Output> {
    match stage.participation() {
        Participation::ReadOnly => {
            let active = coordinator.active();
            round_trip(coordinator, stage, active.as_ref(), None)
        }
        Participation::Mutating => {
            let operation = stage.operation();
            coordinator.run_auto_committed(operation, move |id, mode| {
                round_trip(coordinator, stage, Some(id), Some(mode))
            })
        }
    }
}

fn round_trip_async<S: Stage>(
    coordinator: &Arc<TransactionCoordinator>,
    stage: S,
    transaction: Option<TransactionId>,
    mode: Option<TransactionMode>,
    done: Done<S::Output>,
) {
    let operation = stage.operation();
    let request = match stage.build(coordinator.builder(), transaction.as_ref()) {
        Ok(request) => request,
        Err(e) => return done(Err(e)),
    };
    if let Some(mode) = mode {
        trace_sent(operation, mode);
    }
    coordinator.transport().send_async(
        request,
        Box::new(move |outcome| done(translate(operation, outcome).and_then(|r| stage.complete(r)))),
    );
}

/// Callback driver. `done` runs exactly once, on whichever thread finishes last.
pub fn execute_async<S: Stage>(
    coordinator: &Arc<TransactionCoordinator>,
    stage: S,
    done: Done<S::Output>,
) {
    match stage.participation() {
        Participation::ReadOnly => {
            let active = coordinator.active();
            round_trip_async(coordinator, stage, active, None, done)
        }
        Participation::Mutating => {
            let operation = stage.operation();
            let driver = Arc::clone(coordinator);
            coordinator.run_auto_committed_async(
                operation,
                Box::new(move |id, mode, done| {
                    round_trip_async(&driver, stage, Some(id), Some(mode), done)
                }),
                done,
            )
        }
    }
}

/// `CONSTRUCT` selecting one graph, or the default graph when `name` is `None`.
pub fn graph_construct(name: Option<NamedNodeRef<'_>>) -> String {
    match name {
        Some(name) => format!("CONSTRUCT {{ ?s ?p ?o }} WHERE {{ GRAPH {name} {{ ?s ?p ?o }} }}"),
        None => CONSTRUCT_ALL.to_string(),
    }
}

fn query_accept() -> String {
    let types: Vec<&str> = SPARQL_RESULTS_ACCEPT
        .iter()
        .chain(RDF_ACCEPT.iter())
        .copied()
        .collect();
    build_accept(&types)
}

/// SPARQL query; GET for short queries, form-encoded POST otherwise.
pub struct QueryStage {
    pub query: String,
    pub timeout: QueryTimeout,
    pub codec: Arc<dyn RdfCodec>,
}

impl Stage for QueryStage {
    type Output = QueryResult;

    fn operation(&self) -> &'static str {
        "querying"
    }

    fn participation(&self) -> Participation {
        Participation::ReadOnly
    }

    fn build(
        &self,
        builder: &RequestBuilder,
        transaction: Option<&TransactionId>,
    ) -> Result<PendingRequest> {
        let spec = if self.query.chars().count() < MAX_GET_QUERY_LENGTH {
            RequestSpec::new(HttpMethod::Get, SPARQL_PATH, query_accept())
                .param(QUERY_PARAM, self.query.as_str())
        } else {
            let form = encode_params(&[(QUERY_PARAM.to_string(), self.query.clone())]);
            RequestSpec::new(HttpMethod::Post, SPARQL_PATH, query_accept())
                .body(FORM_URL_ENCODED_UTF8, form.into_bytes())
        };
        Ok(builder.build(spec.timeout(self.timeout), transaction))
    }

    fn complete(self, response: HttpResponse) -> Result<QueryResult> {
        ResponseDispatcher::new(self.codec.as_ref()).dispatch(&response, &self.query)
    }
}

/// Replaces a whole graph. Named graphs are PUT under a CONSTRUCT selecting them;
/// the default graph goes through `updatePost`.
pub struct SaveStage {
    pub graph: StoredGraph,
    pub codec: Arc<dyn RdfCodec>,
}

impl Stage for SaveStage {
    type Output = StoredGraph;

    fn operation(&self) -> &'static str {
        "saving a graph"
    }

    fn participation(&self) -> Participation {
        Participation::Mutating
    }

    fn build(
        &self,
        builder: &RequestBuilder,
        transaction: Option<&TransactionId>,
    ) -> Result<PendingRequest> {
        let payload = PayloadEncoder::new(self.codec.as_ref()).whole_graph(&self.graph)?;
        let spec = match self.graph.name() {
            Some(name) => RequestSpec::new(HttpMethod::Put, SPARQL_PATH, ANY_MEDIA_TYPE)
                .param(QUERY_PARAM, graph_construct(Some(name))),
            None => RequestSpec::new(HttpMethod::Post, UPDATE_POST_PATH, ANY_MEDIA_TYPE),
        };
        Ok(builder.build(spec.body(payload.content_type, payload.body), transaction))
    }

    fn complete(self, _response: HttpResponse) -> Result<StoredGraph> {
        Ok(self.graph)
    }
}

/// Drops a graph; `None` targets the default graph. Deleting an absent graph is not
/// an error on the store side.
pub struct DeleteStage {
    pub graph: Option<NamedNode>,
}

impl Stage for DeleteStage {
    type Output = ();

    fn operation(&self) -> &'static str {
        "deleting a graph"
    }

    fn participation(&self) -> Participation {
        Participation::Mutating
    }

    fn build(
        &self,
        builder: &RequestBuilder,
        transaction: Option<&TransactionId>,
    ) -> Result<PendingRequest> {
        let mut spec = RequestSpec::new(HttpMethod::Delete, SPARQL_PATH, ANY_MEDIA_TYPE)
            .content_type(FORM_URL_ENCODED);
        if let Some(graph) = &self.graph {
            spec = spec.param(CONTEXT_PARAM, graph.to_string());
        }
        Ok(builder.build(spec, transaction))
    }

    fn complete(self, _response: HttpResponse) -> Result<()> {
        Ok(())
    }
}

/// Incremental add/remove against one graph.
pub struct UpdateStage {
    pub update: GraphUpdate,
    pub codec: Arc<dyn RdfCodec>,
}

impl Stage for UpdateStage {
    type Output = ();

    fn operation(&self) -> &'static str {
        "updating a graph"
    }

    fn participation(&self) -> Participation {
        Participation::Mutating
    }

    fn build(
        &self,
        builder: &RequestBuilder,
        transaction: Option<&TransactionId>,
    ) -> Result<PendingRequest> {
        let payload = PayloadEncoder::new(self.codec.as_ref()).update(&self.update)?;
        let spec = RequestSpec::new(HttpMethod::Post, UPDATE_POST_PATH, ANY_MEDIA_TYPE)
            .body(payload.content_type, payload.body);
        Ok(builder.build(spec, transaction))
    }

    fn complete(self, _response: HttpResponse) -> Result<()> {
        Ok(())
    }
}

/// Fetches one graph with a CONSTRUCT.
pub struct LoadStage {
    pub graph: Option<NamedNode>,
    pub codec: Arc<dyn RdfCodec>,
}

impl Stage for LoadStage {
    type Output = StoredGraph;

    fn operation(&self) -> &'static str {
        "loading a graph"
    }

    fn participation(&self) -> Participation {
        Participation::ReadOnly
    }

    fn build(
        &self,
        builder: &RequestBuilder,
        transaction: Option<&TransactionId>,
    ) -> Result<PendingRequest> {
        let query = graph_construct(self.graph.as_ref().map(|g| g.as_ref()));
        let spec = RequestSpec::new(HttpMethod::Get, SPARQL_PATH, build_accept(RDF_ACCEPT))
            .param(QUERY_PARAM, query);
        Ok(builder.build(spec, transaction))
    }

    fn complete(self, response: HttpResponse) -> Result<StoredGraph> {
        let graph = ResponseDispatcher::new(self.codec.as_ref())
            .expect_graph(&response, self.operation())?;
        Ok(StoredGraph {
            name: self.graph,
            graph,
        })
    }
}

/// Names of all graphs holding at least one triple.
pub struct ListGraphsStage {
    pub codec: Arc<dyn RdfCodec>,
}

impl Stage for ListGraphsStage {
    type Output = Vec<NamedNode>;

    fn operation(&self) -> &'static str {
        "listing graphs"
    }

    fn participation(&self) -> Participation {
        Participation::ReadOnly
    }

    fn build(
        &self,
        builder: &RequestBuilder,
        transaction: Option<&TransactionId>,
    ) -> Result<PendingRequest> {
        let spec = RequestSpec::new(HttpMethod::Get, SPARQL_PATH, build_accept(SPARQL_RESULTS_ACCEPT))
            .param(QUERY_PARAM, LIST_GRAPHS_QUERY);
        Ok(builder.build(spec, transaction))
    }

    fn complete(self, response: HttpResponse) -> Result<Vec<NamedNode>> {
        let result = ResponseDispatcher::new(self.codec.as_ref()).dispatch(&response, LIST_GRAPHS_QUERY)?;
        let Some(TabularResult::Solutions { rows, .. }) = result.as_tabular() else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .filter_map(|row| match row.get("g") {
                Some(Term::NamedNode(name)) => Some(name.clone()),
                _ => None,
            })
            .collect())
    }
}
