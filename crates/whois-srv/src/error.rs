//! Error types for the WHOIS registry server.
//!
//! None of these are fatal to the process: a failed rebuild keeps the
//! previous snapshot, a failed pull is retried on its next turn and a failed
//! connection only affects that client.

use thiserror::Error;

/// Errors that can occur in whois-srv operations.
#[derive(Error, Debug)]
pub enum SrvError {
    /// Configuration is invalid or could not be read.
    #[error("config error: {0}")]
    Config(String),

    /// Upstream WHOIS server could not be reached or failed mid-transfer.
    #[error("upstream {host}:{port} failed: {reason}")]
    Upstream {
        host: String,
        port: u16,
        reason: String,
    },

    /// Upstream transfer ran past its hard timeout.
    #[error("upstream {host}:{port} timed out after {secs}s")]
    UpstreamTimeout { host: String, port: u16, secs: u64 },

    /// Writing a record to storage failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The external address feed is unavailable or returned garbage.
    #[error("address feed unavailable: {0}")]
    Feed(String),

    /// Listener failed to bind or accept.
    #[error("server error: {0}")]
    Server(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SrvError {
    /// Returns true if the failed operation is retried on its next turn.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::UpstreamTimeout { .. } | Self::Feed(_) | Self::Io(_)
        )
    }
}
