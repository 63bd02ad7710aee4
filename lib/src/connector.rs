//! [`BlazegraphConnector`], the caller-facing handle. Every operation exists in a
//! blocking form and a callback form (`*_async`) with the same semantics.

use crate::codec::{OxigraphCodec, RdfCodec};
use crate::config::ConnectionConfig;
use crate::engine::{
    execute, execute_async, DeleteStage, ListGraphsStage, LoadStage, QueryStage, SaveStage,
    UpdateStage,
};
use crate::errors::{ConnectorError, Result};
use crate::model::{GraphUpdate, QueryResult, StoreCapabilities, StoredGraph, TransactionId};
use crate::options::QueryTimeout;
use crate::request::{RequestBuilder, RequestHook};
use crate::transaction::TransactionCoordinator;
use crate::transport::{HttpTransport, Transport};
use log::debug;
use oxigraph::model::NamedNode;
use std::fmt;
use std::sync::Arc;

struct Inner {
    config: Arc<ConnectionConfig>,
    coordinator: Arc<TransactionCoordinator>,
    codec: Arc<dyn RdfCodec>,
}

/// Transactional connection to one namespace of a Blazegraph server.
///
/// Clones share the same active transaction. When no transaction is active, each
/// mutating call (`save_graph`, `delete_graph`, `update_graph`) runs in its own
/// transaction that is committed on success and rolled back on failure. After an
/// explicit [`begin`](Self::begin), mutating calls join that transaction and only
/// [`commit`](Self::commit) or [`rollback`](Self::rollback) end it.
#[derive(Clone)]
pub struct BlazegraphConnector {
    inner: Arc<Inner>,
}

impl BlazegraphConnector {
    /// Connects to the `kb` namespace of the server at `base_uri`.
    pub fn new(base_uri: &str) -> Result<Self> {
        Self::from_config(ConnectionConfig::with_default_namespace(base_uri)?)
    }

    pub fn with_namespace(base_uri: &str, namespace: &str) -> Result<Self> {
        Self::from_config(ConnectionConfig::new(base_uri, namespace)?)
    }

    pub fn from_config(config: ConnectionConfig) -> Result<Self> {
        Self::from_config_with_hook(config, None)
    }

    /// `hook` runs on every request after the default headers are set.
    pub fn from_config_with_hook(
        config: ConnectionConfig,
        hook: Option<RequestHook>,
    ) -> Result<Self> {
        let transport = HttpTransport::new(config.request_timeout())
            .map_err(|e| ConnectorError::transport("building the HTTP client", e))?;
        Ok(Self::with_parts(
            config,
            Arc::new(transport),
            Arc::new(OxigraphCodec),
            hook,
        ))
    }

    pub fn with_transport(config: ConnectionConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_parts(config, transport, Arc::new(OxigraphCodec), None)
    }

    pub fn with_parts(
        config: ConnectionConfig,
        transport: Arc<dyn Transport>,
        codec: Arc<dyn RdfCodec>,
        hook: Option<RequestHook>,
    ) -> Self {
        let config = Arc::new(config);
        let builder = RequestBuilder::new(Arc::clone(&config), hook);
        BlazegraphConnector {
            inner: Arc::new(Inner {
                config,
                coordinator: Arc::new(TransactionCoordinator::new(builder, transport)),
                codec,
            }),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    pub fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::default()
    }

    /// The transaction mutating calls currently join, if any.
    pub fn active_transaction(&self) -> Option<TransactionId> {
        self.inner.coordinator.active()
    }

    fn coordinator(&self) -> &Arc<TransactionCoordinator> {
        &self.inner.coordinator
    }

    fn codec(&self) -> Arc<dyn RdfCodec> {
        Arc::clone(&self.inner.codec)
    }

    fn query_stage(&self, query: &str, timeout: QueryTimeout) -> QueryStage {
        QueryStage {
            query: query.to_string(),
            timeout,
            codec: self.codec(),
        }
    }

    pub fn query(&self, query: &str) -> Result<QueryResult> {
        self.query_with_timeout(query, QueryTimeout::Unspecified)
    }

    /// Runs `query` with a store-side evaluation limit.
    pub fn query_with_timeout(
        &self,
        query: &str,
        timeout: impl Into<QueryTimeout>,
    ) -> Result<QueryResult> {
        execute(self.coordinator(), self.query_stage(query, timeout.into()))
    }

    pub fn query_async<F>(&self, query: &str, done: F)
    where
        F: FnOnce(Result<QueryResult>) + Send + 'static,
    {
        self.query_with_timeout_async(query, QueryTimeout::Unspecified, done)
    }

    pub fn query_with_timeout_async<F>(&self, query: &str, timeout: impl Into<QueryTimeout>, done: F)
    where
        F: FnOnce(Result<QueryResult>) + Send + 'static,
    {
        execute_async(
            self.coordinator(),
            self.query_stage(query, timeout.into()),
            Box::new(done),
        )
    }

    /// Replaces the stored graph with `graph` and hands it back on success.
    pub fn save_graph(&self, graph: StoredGraph) -> Result<StoredGraph> {
        execute(
            self.coordinator(),
            SaveStage {
                graph,
                codec: self.codec(),
            },
        )
    }

    pub fn save_graph_async<F>(&self, graph: StoredGraph, done: F)
    where
        F: FnOnce(Result<StoredGraph>) + Send + 'static,
    {
        execute_async(
            self.coordinator(),
            SaveStage {
                graph,
                codec: self.codec(),
            },
            Box::new(done),
        )
    }

    /// Deletes `graph`, or the default graph when `None`.
    pub fn delete_graph(&self, graph: Option<NamedNode>) -> Result<()> {
        execute(self.coordinator(), DeleteStage { graph })
    }

    pub fn delete_graph_async<F>(&self, graph: Option<NamedNode>, done: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        execute_async(self.coordinator(), DeleteStage { graph }, Box::new(done))
    }

    /// Applies additions then removals. An empty update returns immediately without
    /// contacting the store.
    pub fn update_graph(&self, update: GraphUpdate) -> Result<()> {
        if update.is_empty() {
            debug!("skipping empty update");
            return Ok(());
        }
        execute(
            self.coordinator(),
            UpdateStage {
                update,
                codec: self.codec(),
            },
        )
    }

    pub fn update_graph_async<F>(&self, update: GraphUpdate, done: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        if update.is_empty() {
            debug!("skipping empty update");
            return done(Ok(()));
        }
        execute_async(
            self.coordinator(),
            UpdateStage {
                update,
                codec: self.codec(),
            },
            Box::new(done),
        )
    }

    /// Fetches `graph`, or the default graph when `None`.
    pub fn load_graph(&self, graph: Option<NamedNode>) -> Result<StoredGraph> {
        execute(
            self.coordinator(),
            LoadStage {
                graph,
                codec: self.codec(),
            },
        )
    }

    pub fn load_graph_async<F>(&self, graph: Option<NamedNode>, done: F)
    where
        F: FnOnce(Result<StoredGraph>) + Send + 'static,
    {
        execute_async(
            self.coordinator(),
            LoadStage {
                graph,
                codec: self.codec(),
            },
            Box::new(done),
        )
    }

    pub fn list_graphs(&self) -> Result<Vec<NamedNode>> {
        execute(
            self.coordinator(),
            ListGraphsStage {
                codec: self.codec(),
            },
        )
    }

    pub fn list_graphs_async<F>(&self, done: F)
    where
        F: FnOnce(Result<Vec<NamedNode>>) + Send + 'static,
    {
        execute_async(
            self.coordinator(),
            ListGraphsStage {
                codec: self.codec(),
            },
            Box::new(done),
        )
    }

    /// Opens a transaction that subsequent mutating calls join. Fails with
    /// [`ConnectorError::TransactionState`] if one is already active.
    pub fn begin(&self) -> Result<TransactionId> {
        self.coordinator().begin()
    }

    pub fn begin_async<F>(&self, done: F)
    where
        F: FnOnce(Result<TransactionId>) + Send + 'static,
    {
        self.coordinator().begin_async(Box::new(done))
    }

    pub fn commit(&self) -> Result<()> {
        self.coordinator().commit()
    }

    pub fn commit_async<F>(&self, done: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        self.coordinator().commit_async(Box::new(done))
    }

    pub fn rollback(&self) -> Result<()> {
        self.coordinator().rollback()
    }

    pub fn rollback_async<F>(&self, done: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        self.coordinator().rollback_async(Box::new(done))
    }
}

impl fmt::Display for BlazegraphConnector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.inner.config, f)
    }
}

impl fmt::Debug for BlazegraphConnector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BlazegraphConnector")
            .field("config", &self.inner.config)
            .field("active_transaction", &self.active_transaction())
            .finish()
    }
}
