//! Option types that replace boolean and sentinel parameters in the public API.

use std::time::Duration;

/// Store-side limit on query evaluation time.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum QueryTimeout {
    /// Let the store apply its own default; no header is sent.
    #[default]
    Unspecified,
    /// Abort evaluation after this many milliseconds.
    Millis(u64),
}

impl QueryTimeout {
    /// Header value to send, if any.
    pub fn header_value(self) -> Option<String> {
        match self {
            QueryTimeout::Unspecified => None,
            QueryTimeout::Millis(ms) => Some(ms.to_string()),
        }
    }
}

impl From<Duration> for QueryTimeout {
    fn from(value: Duration) -> Self {
        QueryTimeout::Millis(value.as_millis() as u64)
    }
}

/// Negative values mean "unspecified", matching the `-1` convention of the store's HTTP API.
impl From<i64> for QueryTimeout {
    fn from(value: i64) -> Self {
        if value < 0 {
            QueryTimeout::Unspecified
        } else {
            QueryTimeout::Millis(value as u64)
        }
    }
}

impl From<Option<u64>> for QueryTimeout {
    fn from(value: Option<u64>) -> Self {
        value.map_or(QueryTimeout::Unspecified, QueryTimeout::Millis)
    }
}

/// Who owns commit/rollback for a mutating operation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TransactionMode {
    /// The connector opened the transaction and must commit or roll it back.
    AutoManaged,
    /// The caller opened the transaction; the connector never ends it.
    CallerManaged,
}

/// Whether an operation takes part in the transaction state machine.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Participation {
    /// Reads reuse an active transaction id but never open or end one.
    ReadOnly,
    /// Writes are wrapped in auto-commit when no transaction is active.
    Mutating,
}
