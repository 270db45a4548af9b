use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The log file could not be opened, written or flushed.
#[derive(Debug, Error)]
#[error("Error writing to {}: {source}", .path.display())]
pub struct IoFailure {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// The remote list store could not accept a push.
#[derive(Debug, Error)]
pub enum RemoteFailure {
    /// No live connection, and none could be established.
    #[error("Remote store not connected")]
    NotConnected,
    #[error("Remote store did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Remote store error: {0}")]
    Store(#[from] redis::RedisError),
}

impl RemoteFailure {
    /// True when the failure means the connection itself is no longer usable.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            RemoteFailure::NotConnected | RemoteFailure::Timeout(_) => true,
            RemoteFailure::Encode(_) => false,
            RemoteFailure::Store(e) => {
                e.is_connection_dropped() || e.is_connection_refusal() || e.is_io_error()
            }
        }
    }
}

/// The status source failed; fatal to the daemon loop.
#[derive(Debug, Error)]
pub enum SourceFailure {
    /// Every producer of status updates has gone away.
    #[error("Status source closed")]
    Closed,
    #[error("Player process '{0}' is not running")]
    PlayerGone(String),
    #[error("Failed to run status command '{program}': {source}")]
    Command {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A per-sink failure as recorded in a delivery report.
#[derive(Debug, Error)]
pub enum SinkFailure {
    #[error(transparent)]
    Io(#[from] IoFailure),
    #[error(transparent)]
    Remote(#[from] RemoteFailure),
}
