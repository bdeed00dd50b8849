//! Main Crate Error

use std::time::Duration;

#[derive(thiserror::Error, Debug)]
/// Kad-dht crate error enum.
pub enum Error {
    /// Catch-all for errors with a fixed message, mostly raised by
    /// [crate::network::Network] implementations.
    #[error("Static error: {0}")]
    Static(&'static str),

    /// A component was used before `start()` or after `stop()`.
    #[error("{0} is not started")]
    NotStarted(&'static str),

    /// The run was cancelled by its caller or its overall timeout fired.
    #[error("Query aborted")]
    QueryAborted,

    /// A single call to the query function took longer than the configured
    /// `query_func_timeout`.
    #[error("Query function timed out after {0:?}")]
    QueryFuncTimeout(Duration),

    /// A routing table liveness check did not complete in time.
    #[error("Ping timed out after {0:?}")]
    PingTimeout(Duration),

    /// The peer or value we were looking for was not found.
    #[error("Not found")]
    NotFound,

    /// Bytes that should have been a kad-id had the wrong length.
    #[error("Invalid Id size, expected 32, got {0}")]
    InvalidIdSize(usize),

    /// Failed to parse a peer id.
    #[error("Invalid peer id: {0}")]
    InvalidPeerId(String),
}

impl Error {
    /// Returns `true` if this error was caused by an abort signal firing.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::QueryAborted)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            Error::NotStarted("RoutingTable").to_string(),
            "RoutingTable is not started"
        );
        assert_eq!(Error::QueryAborted.to_string(), "Query aborted");
        assert!(Error::QueryAborted.is_abort());
        assert!(!Error::NotFound.is_abort());
    }
}
