//! Values exchanged with callers: graphs to save, triple deltas, transaction ids and
//! query answers.

use oxigraph::model::{Graph, NamedNode, NamedNodeRef, Term, Triple};
use std::collections::BTreeMap;
use std::fmt;

/// Server-side transaction identifier, opaque to the connector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        TransactionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A graph together with the name it is stored under; `None` is the default graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredGraph {
    pub name: Option<NamedNode>,
    pub graph: Graph,
}

impl StoredGraph {
    pub fn named(name: NamedNode, graph: Graph) -> Self {
        StoredGraph {
            name: Some(name),
            graph,
        }
    }

    pub fn default_graph(graph: Graph) -> Self {
        StoredGraph { name: None, graph }
    }

    pub fn name(&self) -> Option<NamedNodeRef<'_>> {
        self.name.as_ref().map(|n| n.as_ref())
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }
}

/// Triples to add to and remove from one graph. Additions are applied before removals
/// are sent, in the order given.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GraphUpdate {
    pub graph: Option<NamedNode>,
    pub additions: Vec<Triple>,
    pub removals: Vec<Triple>,
}

impl GraphUpdate {
    pub fn new(graph: Option<NamedNode>) -> Self {
        GraphUpdate {
            graph,
            additions: Vec::new(),
            removals: Vec::new(),
        }
    }

    pub fn add(mut self, triple: Triple) -> Self {
        self.additions.push(triple);
        self
    }

    pub fn remove(mut self, triple: Triple) -> Self {
        self.removals.push(triple);
        self
    }

    /// An update with nothing to add or remove never reaches the store.
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

/// One row of variable bindings; unbound variables are absent.
pub type SolutionRow = BTreeMap<String, Term>;

/// Answer of an ASK or SELECT query.
#[derive(Debug, Clone, PartialEq)]
pub enum TabularResult {
    Boolean(bool),
    Solutions {
        variables: Vec<String>,
        rows: Vec<SolutionRow>,
    },
}

impl TabularResult {
    pub fn len(&self) -> usize {
        match self {
            TabularResult::Boolean(_) => 1,
            TabularResult::Solutions { rows, .. } => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a query endpoint answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Tabular(TabularResult),
    Graph(Graph),
}

impl QueryResult {
    pub fn as_tabular(&self) -> Option<&TabularResult> {
        match self {
            QueryResult::Tabular(t) => Some(t),
            QueryResult::Graph(_) => None,
        }
    }

    pub fn as_graph(&self) -> Option<&Graph> {
        match self {
            QueryResult::Graph(g) => Some(g),
            QueryResult::Tabular(_) => None,
        }
    }

    pub fn into_graph(self) -> Option<Graph> {
        match self {
            QueryResult::Graph(g) => Some(g),
            QueryResult::Tabular(_) => None,
        }
    }
}

/// What the connector can do against this store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapabilities {
    pub delete_supported: bool,
    pub update_supported: bool,
    pub list_graphs_supported: bool,
    pub read_only: bool,
    pub ready: bool,
}

impl Default for StoreCapabilities {
    fn default() -> Self {
        StoreCapabilities {
            delete_supported: true,
            update_supported: true,
            list_graphs_supported: true,
            read_only: false,
            ready: true,
        }
    }
}
