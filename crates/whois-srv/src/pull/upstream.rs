//! Minimal RFC 3912 client: send one line, read until the server closes.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::SrvError;

/// Query `host:port` for `query` and return the full response text.
///
/// `total_timeout` bounds the whole exchange, connect included. When it
/// fires the connection is dropped mid-transfer and nothing is returned.
pub async fn fetch(
    host: &str,
    port: u16,
    query: &str,
    connect_timeout: Duration,
    total_timeout: Duration,
) -> crate::Result<String> {
    let upstream = |reason: String| SrvError::Upstream {
        host: host.to_string(),
        port,
        reason,
    };

    let exchange = async {
        let mut stream = timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| upstream("connect timed out".into()))?
            .map_err(|e| upstream(format!("connect: {e}")))?;

        stream
            .write_all(format!("{query}\r\n").as_bytes())
            .await
            .map_err(|e| upstream(format!("write: {e}")))?;

        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .await
            .map_err(|e| upstream(format!("read: {e}")))?;

        debug!(host, port, query, bytes = buf.len(), "upstream response received");
        Ok::<_, SrvError>(String::from_utf8_lossy(&buf).into_owned())
    };

    timeout(total_timeout, exchange)
        .await
        .map_err(|_| SrvError::UpstreamTimeout {
            host: host.to_string(),
            port,
            secs: total_timeout.as_secs(),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_fetch_reads_until_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            reader.get_mut().write_all(b"part one\n").await.unwrap();
            reader.get_mut().write_all(b"part two").await.unwrap();
            line
        });

        let text = fetch(
            "127.0.0.1",
            port,
            "as64500",
            Duration::from_secs(2),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(text, "part one\npart two");
        assert_eq!(server.await.unwrap(), "as64500\r\n");
    }

    #[tokio::test]
    async fn test_fetch_times_out_on_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let _server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let err = fetch(
            "127.0.0.1",
            port,
            "example.com",
            Duration::from_secs(2),
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SrvError::UpstreamTimeout { .. }));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = fetch(
            "127.0.0.1",
            port,
            "example.com",
            Duration::from_secs(2),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SrvError::Upstream { .. }));
        assert!(err.is_transient());
    }
}
