use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum IndexerError {
    #[error("cannot reach indexer at {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("indexer at {endpoint} did not finish syncing within {budget:?}")]
    Timeout { endpoint: String, budget: Duration },

    #[error("indexer reported an error: {0}")]
    Server(String),

    #[error("malformed frame from indexer: {0}")]
    Protocol(String),
}

impl IndexerError {
    pub(crate) fn connection(endpoint: &str, reason: impl ToString) -> Self {
        Self::Connection {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}
