//! Per-connection query session.
//!
//! Each connection answers exactly one query:
//!
//! 1. read one line (`\n` or `\r\n`; end of stream also ends the line)
//! 2. classify it and answer from the current snapshot
//! 3. write the response and close
//!
//! The whole exchange runs under a fixed ceiling that data activity does
//! not extend. A connection that has not completed by then is dropped
//! without a response.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};
use whois_core::{response, Query};

use crate::config::ServerConfig;
use crate::store::{RegistryStore, Snapshot};

/// Limits applied to every session.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    /// Ceiling on the whole session.
    pub idle_timeout: Duration,
    /// Longest query line accepted, in bytes.
    pub max_query_len: usize,
}

impl From<&ServerConfig> for SessionLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            idle_timeout: config.idle_timeout(),
            max_query_len: config.max_query_len,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A query was classified and answered.
    Answered,
    /// The line was not a valid query; an error text was written.
    Rejected,
    /// The client closed before sending anything.
    Disconnected,
    /// The ceiling expired; nothing was written.
    TimedOut,
}

/// Answer one raw query line from `snapshot`.
#[must_use]
pub fn respond(snapshot: &Snapshot, line: &str) -> (String, Outcome) {
    match Query::classify(line) {
        Ok(query) => (snapshot.answer(&query), Outcome::Answered),
        Err(e) => (
            e.client_message()
                .unwrap_or(response::INVALID_QUERY)
                .to_string(),
            Outcome::Rejected,
        ),
    }
}

/// Serve one connection to completion, then close it.
pub async fn handle<S>(
    stream: S,
    peer: SocketAddr,
    store: &RegistryStore,
    limits: SessionLimits,
) -> Outcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);

    let session = serve(&mut stream, peer, store, limits);
    let outcome = tokio::time::timeout(limits.idle_timeout, session)
        .await
        .unwrap_or_else(|_| {
            debug!(%peer, "session ceiling reached, closing without response");
            Outcome::TimedOut
        });

    if let Err(e) = stream.shutdown().await {
        debug!(%peer, error = %e, "shutdown failed");
    }
    outcome
}

async fn serve<S>(
    stream: &mut BufReader<S>,
    peer: SocketAddr,
    store: &RegistryStore,
    limits: SessionLimits,
) -> Outcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let limit = u64::try_from(limits.max_query_len).unwrap_or(u64::MAX);
    let read = (&mut *stream).take(limit).read_until(b'\n', &mut buf).await;

    let line = match read {
        Ok(0) => {
            debug!(%peer, "client closed before sending a query");
            return Outcome::Disconnected;
        }
        Ok(n) if n >= limits.max_query_len && buf.last() != Some(&b'\n') => None,
        Ok(_) => Some(String::from_utf8_lossy(&buf).into_owned()),
        Err(e) => {
            debug!(%peer, error = %e, "read failed");
            return Outcome::Disconnected;
        }
    };

    let (text, outcome) = match line {
        Some(line) => {
            info!(%peer, query = %line.trim(), "query");
            respond(&store.snapshot(), &line)
        }
        None => {
            info!(%peer, bytes = buf.len(), "query line too long");
            (response::INVALID_QUERY.to_string(), Outcome::Rejected)
        }
    };

    // An unwritable client gets nothing further; the session still ends.
    if let Err(e) = stream.write_all(text.as_bytes()).await {
        debug!(%peer, error = %e, "client went away before the response was written");
    } else if let Err(e) = stream.flush().await {
        debug!(%peer, error = %e, "flush failed");
    }

    outcome
}
