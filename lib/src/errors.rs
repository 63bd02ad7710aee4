//! Error taxonomy for connector operations and the translation of raw transport
//! outcomes into it.

use crate::transport::HttpResponse;
use std::fmt;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, ConnectorError>;

#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The request never produced an HTTP response (connect, DNS, I/O, client timeout).
    #[error("failed to reach Blazegraph while {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: BoxError,
    },
    /// The store answered with a non-2xx status.
    #[error("Blazegraph rejected the request while {context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StatusError,
    },
    /// A response body arrived but could not be decoded.
    #[error("failed to decode the Blazegraph response while {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: BoxError,
    },
    /// Begin while a transaction is active, or commit/rollback while none is.
    #[error("{0}")]
    TransactionState(String),
    /// The begin request succeeded but carried no transaction id.
    #[error("Blazegraph failed to begin a transaction: no transaction id in the response")]
    BeginFailed,
    /// An auto-committed operation succeeded but its commit did not.
    #[error("Blazegraph failed to commit a transaction: {source}")]
    CommitFailed {
        #[source]
        source: Box<ConnectorError>,
    },
    /// A payload could not be serialized before sending.
    #[error("failed to encode the request body while {context}: {source}")]
    Encode {
        context: String,
        #[source]
        source: BoxError,
    },
    #[error("invalid connector configuration: {0}")]
    Config(String),
}

impl ConnectorError {
    pub(crate) fn transport(context: &str, source: impl Into<BoxError>) -> Self {
        ConnectorError::Transport {
            context: context.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn parse(context: &str, source: impl Into<BoxError>) -> Self {
        ConnectorError::Parse {
            context: context.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn encode(context: &str, source: impl Into<BoxError>) -> Self {
        ConnectorError::Encode {
            context: context.to_string(),
            source: source.into(),
        }
    }

    /// HTTP status of a store rejection, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ConnectorError::Store { source, .. } => Some(source.status),
            ConnectorError::CommitFailed { source } => source.status(),
            _ => None,
        }
    }
}

/// Non-2xx answer from the store, kept as the cause of [`ConnectorError::Store`].
#[derive(Debug, Clone)]
pub struct StatusError {
    pub status: u16,
    pub body: String,
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.body.is_empty() {
            write!(f, "HTTP {}", self.status)
        } else {
            write!(f, "HTTP {}: {}", self.status, self.body)
        }
    }
}

impl std::error::Error for StatusError {}

/// Classifies what the transport handed back. Never retries.
pub(crate) fn translate(
    context: &str,
    outcome: anyhow::Result<HttpResponse>,
) -> Result<HttpResponse> {
    let response = outcome.map_err(|e| ConnectorError::transport(context, e))?;
    if response.is_success() {
        return Ok(response);
    }
    Err(ConnectorError::Store {
        context: context.to_string(),
        source: StatusError {
            status: response.status,
            body: String::from_utf8_lossy(&response.body).trim().to_string(),
        },
    })
}
