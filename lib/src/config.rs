//! Connection settings shared by every operation of a connector: where the store
//! lives, which namespace to address, and how long the transport may wait.

use crate::consts::{
    CONNECTOR_TYPE_NAME, DEFAULT_NAMESPACE, DNR_SERVER, DNR_STORAGE_PROVIDER, DNR_STORE,
    DNR_TYPE, NAMESPACE_PATH, RDFS_LABEL, RDF_TYPE,
};
use crate::errors::{ConnectorError, Result};
use derive_builder::Builder;
use oxigraph::model::{Graph, LiteralRef, NamedOrBlankNodeRef, TripleRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufReader, Write};
use std::path::Path;
use std::time::Duration;

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Builder, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ConnectionConfig {
    /// Server root, e.g. `http://localhost:9999/blazegraph`.
    base_uri: String,
    #[builder(default = "default_namespace()")]
    #[serde(default = "default_namespace")]
    namespace: String,
    /// Transport-level timeout for a whole request/response exchange.
    #[builder(default = "default_timeout_secs()")]
    #[serde(default = "default_timeout_secs")]
    request_timeout_secs: u64,
}

impl ConnectionConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(base) = &self.base_uri {
            check_base_uri(base)?;
        }
        if let Some(ns) = &self.namespace {
            check_namespace(ns)?;
        }
        Ok(())
    }
}

fn check_base_uri(base: &str) -> std::result::Result<(), String> {
    let base = base.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(format!("base URI must be an http(s) URL, got '{base}'"));
    }
    Ok(())
}

fn check_namespace(ns: &str) -> std::result::Result<(), String> {
    let reserved = |c: char| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace();
    if ns.is_empty() || ns.contains(reserved) {
        return Err(format!("namespace must be a non-empty path segment, got '{ns}'"));
    }
    Ok(())
}

impl ConnectionConfig {
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    pub fn new(base_uri: impl Into<String>, namespace: impl Into<String>) -> Result<Self> {
        Self::builder()
            .base_uri(base_uri)
            .namespace(namespace)
            .build()
            .map_err(|e| ConnectorError::Config(e.to_string()))
    }

    /// Connects to the store's default `kb` namespace.
    pub fn with_default_namespace(base_uri: impl Into<String>) -> Result<Self> {
        Self::new(base_uri, DEFAULT_NAMESPACE)
    }

    /// Server root without trailing slashes.
    pub fn base_uri(&self) -> &str {
        self.base_uri.trim().trim_end_matches('/')
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `<base>/namespace/<ns>`, the root of every data endpoint.
    pub fn namespace_root(&self) -> String {
        format!("{}{}{}", self.base_uri(), NAMESPACE_PATH, self.namespace)
    }

    pub fn save_to_file(&self, file: &Path) -> Result<()> {
        let config_str = serde_json::to_string_pretty(&self)
            .map_err(|e| ConnectorError::Config(e.to_string()))?;
        let mut file =
            std::fs::File::create(file).map_err(|e| ConnectorError::Config(e.to_string()))?;
        file.write_all(config_str.as_bytes())
            .map_err(|e| ConnectorError::Config(e.to_string()))?;
        Ok(())
    }

    pub fn from_file(file: &Path) -> Result<Self> {
        let file = std::fs::File::open(file).map_err(|e| ConnectorError::Config(e.to_string()))?;
        let reader = BufReader::new(file);
        let config: ConnectionConfig =
            serde_json::from_reader(reader).map_err(|e| ConnectorError::Config(e.to_string()))?;
        check_base_uri(&config.base_uri).map_err(ConnectorError::Config)?;
        check_namespace(&config.namespace).map_err(ConnectorError::Config)?;
        Ok(config)
    }

    /// Describes this connection as a storage provider in the dotNetRDF configuration vocabulary.
    pub fn to_graph(&self, subject: NamedOrBlankNodeRef<'_>) -> Graph {
        let label = self.to_string();
        let mut graph = Graph::new();
        graph.insert(TripleRef::new(subject, RDF_TYPE, DNR_STORAGE_PROVIDER));
        graph.insert(TripleRef::new(
            subject,
            RDFS_LABEL,
            LiteralRef::new_simple_literal(&label),
        ));
        graph.insert(TripleRef::new(
            subject,
            DNR_TYPE,
            LiteralRef::new_simple_literal(CONNECTOR_TYPE_NAME),
        ));
        graph.insert(TripleRef::new(
            subject,
            DNR_SERVER,
            LiteralRef::new_simple_literal(self.base_uri()),
        ));
        graph.insert(TripleRef::new(
            subject,
            DNR_STORE,
            LiteralRef::new_simple_literal(&self.namespace),
        ));
        graph
    }

    /// Prints the configuration for command line output.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  Server: {}", self.base_uri());
        println!("  Namespace: {}", self.namespace);
        println!("  Request timeout: {}s", self.request_timeout_secs);
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[Blazegraph] Namespace '{}' on Server '{}'",
            self.namespace,
            self.base_uri()
        )
    }
}
