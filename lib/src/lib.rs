//! Transactional client for the Blazegraph graph store over its HTTP API.
//!
//! [`BlazegraphConnector`] is the entry point. Queries round-trip directly;
//! mutating operations run in an automatically committed transaction unless the
//! caller opened one with [`BlazegraphConnector::begin`].

pub mod codec;
pub mod config;
pub mod connector;
pub mod consts;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod model;
pub mod options;
pub mod payload;
pub mod request;
pub mod transaction;
pub mod transport;
pub mod util;

pub use crate::config::{ConnectionConfig, ConnectionConfigBuilder};
pub use crate::connector::BlazegraphConnector;
pub use crate::errors::{ConnectorError, Result};
pub use crate::model::{
    GraphUpdate, QueryResult, SolutionRow, StoreCapabilities, StoredGraph, TabularResult,
    TransactionId,
};
pub use crate::options::QueryTimeout;
pub use crate::request::{HttpMethod, PendingRequest, RequestHook};
pub use crate::transport::{HttpResponse, HttpTransport, Transport};

/// Initializes logging configuration from the environment.
///
/// If `BLAZEGRAPH_LOG` is set, `RUST_LOG` is set to its value. A logger such as
/// `env_logger` must be initialized afterwards for the level to take effect.
pub fn init_logging() {
    if let Ok(log_level) = std::env::var("BLAZEGRAPH_LOG") {
        std::env::set_var("RUST_LOG", log_level);
    }
}
