//! Registry store: builds snapshots and swaps them in atomically.
//!
//! - **Loader**: reads the flat-file storage tree into records.
//! - **Snapshot**: the immutable registry readers answer from.
//!
//! The store is the single writer. Readers take an `Arc<Snapshot>` and keep
//! it for the life of their query; a rebuild replaces the pointer and the
//! old snapshot is dropped once its last reader finishes.

pub mod loader;
pub mod snapshot;

use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::feed::AddressFeed;
pub use snapshot::Snapshot;

/// Counts from one rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildStats {
    /// Address records, static and feed.
    pub addresses: usize,
    /// Address records supplied by the feed.
    pub feed_addresses: usize,
    /// Domain table entries.
    pub domains: usize,
    /// ASN table entries.
    pub asns: usize,
    /// Files skipped as unreadable or malformed.
    pub skipped: usize,
    /// False when the feed failed and previous feed records were reused.
    pub feed_ok: bool,
    /// Wall time spent.
    pub elapsed: Duration,
}

/// Owner of the live registry snapshot.
pub struct RegistryStore {
    data_dir: PathBuf,
    feed: Option<Arc<dyn AddressFeed>>,
    current: ArcSwap<Snapshot>,
}

impl RegistryStore {
    /// Create a store over `data_dir` holding an empty snapshot.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>, feed: Option<Arc<dyn AddressFeed>>) -> Self {
        Self {
            data_dir: data_dir.into(),
            feed,
            current: ArcSwap::from_pointee(Snapshot::default()),
        }
    }

    /// Storage root.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The current snapshot. Never partially built.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Rebuild from storage and the feed, then swap the new snapshot in.
    ///
    /// If the feed fails, the previous snapshot's feed records are carried
    /// over so the address table is never truncated.
    pub async fn rebuild(&self) -> crate::Result<RebuildStats> {
        let started = Instant::now();

        let root = self.data_dir.clone();
        let loaded = tokio::task::spawn_blocking(move || loader::load_all(&root))
            .await
            .map_err(|e| crate::SrvError::Server(format!("storage loader panicked: {e}")))?;
        let skipped = loaded.skipped;

        let (feed_records, feed_ok) = match &self.feed {
            None => (Vec::new(), true),
            Some(feed) => match feed.fetch().await {
                Ok(records) => (records, true),
                Err(e) => {
                    let previous = self.snapshot().feed_addresses().to_vec();
                    warn!(
                        error = %e,
                        kept = previous.len(),
                        "address feed failed, keeping previous feed records"
                    );
                    (previous, false)
                }
            },
        };

        let snapshot = Snapshot::new(loaded, feed_records);
        let stats = RebuildStats {
            addresses: snapshot.address_count(),
            feed_addresses: snapshot.feed_addresses().len(),
            domains: snapshot.domain_count(),
            asns: snapshot.asn_count(),
            skipped,
            feed_ok,
            elapsed: started.elapsed(),
        };

        self.current.store(Arc::new(snapshot));

        info!(
            addresses = stats.addresses,
            feed = stats.feed_addresses,
            domains = stats.domains,
            asns = stats.asns,
            skipped = stats.skipped,
            elapsed_ms = u64::try_from(stats.elapsed.as_millis()).unwrap_or(u64::MAX),
            "registry snapshot rebuilt"
        );

        Ok(stats)
    }

    /// Rebuild every `period` forever. Failures keep the current snapshot.
    pub async fn run(self: Arc<Self>, period: Duration) {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.rebuild().await {
                error!(error = %e, "registry rebuild failed, keeping previous snapshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use whois_core::Record;

    /// Feed that succeeds until told to fail.
    struct FlakyFeed {
        failing: AtomicBool,
    }

    #[async_trait]
    impl AddressFeed for FlakyFeed {
        async fn fetch(&self) -> crate::Result<Vec<Record>> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(crate::SrvError::Feed("connection refused".into()));
            }
            Ok(vec![Record::synthesized_address(
                "198.51.100.0/24".parse().unwrap(),
                vec!["Network: 198.51.100.0/24".into()],
            )])
        }
    }

    fn write(root: &Path, category: &str, name: &str, data: &str) {
        let dir = root.join(category);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), data).unwrap();
    }

    #[tokio::test]
    async fn test_rebuild_swaps_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RegistryStore::new(tmp.path(), None);
        assert_eq!(store.snapshot().address_count(), 0);

        let before = store.snapshot();
        write(tmp.path(), "ipv4", "10.0.0.0_8", "netname: TEN");
        write(tmp.path(), "domain", "example.com", "domain: example.com");
        let stats = store.rebuild().await.unwrap();

        assert_eq!(stats.addresses, 1);
        assert_eq!(stats.domains, 1);
        assert!(stats.feed_ok);
        // A reader holding the old snapshot still sees the old contents.
        assert_eq!(before.address_count(), 0);
        assert_eq!(store.snapshot().address_count(), 1);
    }

    #[tokio::test]
    async fn test_feed_failure_keeps_previous_feed_records() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "ipv4", "10.0.0.0_8", "netname: TEN");
        let feed = Arc::new(FlakyFeed {
            failing: AtomicBool::new(false),
        });
        let store = RegistryStore::new(tmp.path(), Some(feed.clone() as Arc<dyn AddressFeed>));

        let stats = store.rebuild().await.unwrap();
        assert_eq!(stats.addresses, 2);
        assert_eq!(stats.feed_addresses, 1);

        feed.failing.store(true, Ordering::SeqCst);
        write(tmp.path(), "ipv4", "172.16.0.0_12", "netname: PRIVATE");
        let stats = store.rebuild().await.unwrap();
        assert!(!stats.feed_ok);
        assert_eq!(stats.feed_addresses, 1);
        assert_eq!(stats.addresses, 3);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.feed_addresses()[0].name(), "198.51.100.0/24");
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "asn", "AS64500", "aut-num: AS64500");
        write(tmp.path(), "ipv6", "bogus", "skipped");
        let store = RegistryStore::new(tmp.path(), None);

        let first = store.rebuild().await.unwrap();
        let second = store.rebuild().await.unwrap();
        assert_eq!(first.asns, second.asns);
        assert_eq!(first.skipped, 1);
        assert_eq!(second.skipped, 1);
    }
}
