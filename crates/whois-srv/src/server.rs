//! Server runner: builds the registry, starts background tasks, accepts
//! connections.

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::feed::{AddressFeed, IpamFeed};
use crate::pull::PullScheduler;
use crate::session::{self, SessionLimits};
use crate::store::{loader, RegistryStore};

/// Pause after a failed accept (e.g. file descriptor exhaustion).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Build the registry store described by `config`, with its feed if enabled.
pub fn build_store(config: &ServerConfig) -> crate::Result<RegistryStore> {
    let feed: Option<Arc<dyn AddressFeed>> = if config.ipam.enabled {
        Some(Arc::new(IpamFeed::new(&config.ipam)?))
    } else {
        None
    };

    Ok(RegistryStore::new(config.data_dir.clone(), feed))
}

/// Start the WHOIS server with the given configuration.
///
/// Creates the storage directories, builds the first snapshot, spawns the
/// rebuild loop and the pull scheduler, then serves until the listener
/// fails to bind.
pub async fn run(config: &ServerConfig) -> crate::Result<()> {
    loader::create_data_dirs(&config.data_dir)?;

    let store = Arc::new(build_store(config)?);
    store.rebuild().await?;

    if let Some(period) = config.rebuild_interval() {
        tokio::spawn(Arc::clone(&store).run(period));
        info!(every_secs = period.as_secs(), "registry rebuild loop started");
    }

    if let Some(scheduler) = PullScheduler::new(Arc::clone(&store), &config.pull) {
        tokio::spawn(scheduler.run());
        info!("dynamic pull scheduler started");
    }

    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(|e| crate::SrvError::Server(format!("TCP bind {}: {e}", config.listen)))?;
    info!(addr = %config.listen, "whoisd listening");

    serve(listener, store, SessionLimits::from(config)).await
}

/// Accept connections forever, one task per connection.
pub async fn serve(
    listener: TcpListener,
    store: Arc<RegistryStore>,
    limits: SessionLimits,
) -> crate::Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        info!(%peer, "connection");
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let outcome = session::handle(stream, peer, &store, limits).await;
            debug!(%peer, ?outcome, "session closed");
        });
    }
}
