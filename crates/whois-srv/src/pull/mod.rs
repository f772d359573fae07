//! Dynamic pull scheduler.
//!
//! Records carrying `_PULL: host [port]` are mirrored from their upstream
//! server. One round visits every target once, spread evenly over the
//! configured budget: the per-target interval is `budget / targets`. Pulls
//! run one at a time. A pulled response is stored as the record's dynamic
//! companion (`d_<key>`), prefixed with its retrieval time, and becomes
//! visible to queries on the next registry rebuild.
//!
//! The worklist is captured from the live snapshot at the start of each
//! round. Dynamic records are never pulled.

pub mod upstream;

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use whois_core::{PullTarget, RecordKind};

use crate::config::PullConfig;
use crate::store::{loader, RegistryStore, Snapshot};

/// Lower bound on the per-target interval.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// One pull target captured from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullJob {
    /// Kind of the record being mirrored
    pub kind: RecordKind,
    /// Record key, sent upstream as the query
    pub name: String,
    /// Upstream server
    pub target: PullTarget,
}

/// Round-robin mirror of pull-flagged records.
pub struct PullScheduler {
    store: Arc<RegistryStore>,
    data_dir: PathBuf,
    budget: Duration,
    connect_timeout: Duration,
    timeout: Duration,
}

impl PullScheduler {
    /// Create a scheduler, or `None` when no pull budget is configured.
    #[must_use]
    pub fn new(store: Arc<RegistryStore>, config: &PullConfig) -> Option<Self> {
        let budget = config.budget()?;
        let data_dir = store.data_dir().to_path_buf();

        Some(Self {
            store,
            data_dir,
            budget,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Override the upstream timeouts.
    #[must_use]
    pub fn timeouts(mut self, connect: Duration, total: Duration) -> Self {
        self.connect_timeout = connect;
        self.timeout = total;
        self
    }

    /// Pull targets in `snapshot`, in scan order.
    #[must_use]
    pub fn worklist(snapshot: &Snapshot) -> Vec<PullJob> {
        snapshot
            .pull_records()
            .into_iter()
            .filter_map(|record| {
                record.pull().map(|target| PullJob {
                    kind: *record.kind(),
                    name: record.name().to_string(),
                    target: target.clone(),
                })
            })
            .collect()
    }

    /// Spacing between pulls so `targets` pulls fill `budget`.
    #[must_use]
    pub fn interval_for(budget: Duration, targets: usize) -> Duration {
        let targets = u32::try_from(targets.max(1)).unwrap_or(u32::MAX);
        (budget / targets).max(MIN_INTERVAL)
    }

    /// Fetch one target and store it as the dynamic companion.
    ///
    /// The companion file is replaced whole; on any error the previous
    /// companion is left untouched.
    pub async fn pull_once(&self, job: &PullJob) -> crate::Result<PathBuf> {
        let text = upstream::fetch(
            &job.target.host,
            job.target.port,
            &job.name,
            self.connect_timeout,
            self.timeout,
        )
        .await?;

        let contents = format!("Data retrieved at {}\n\n{text}", Utc::now().to_rfc2822());
        let root = self.data_dir.clone();
        let kind = job.kind;
        let name = job.name.clone();

        tokio::task::spawn_blocking(move || loader::write_dynamic(&root, &kind, &name, &contents))
            .await
            .map_err(|e| crate::SrvError::Persistence(format!("writer task failed: {e}")))?
    }

    /// Run rounds forever. Individual failures are logged and retried on
    /// the target's next turn.
    pub async fn run(self) {
        loop {
            let jobs = Self::worklist(&self.store.snapshot());
            if jobs.is_empty() {
                debug!("no pull targets, waiting one budget period");
                tokio::time::sleep(self.budget).await;
                continue;
            }

            let every = Self::interval_for(self.budget, jobs.len());
            info!(
                targets = jobs.len(),
                interval_ms = u64::try_from(every.as_millis()).unwrap_or(u64::MAX),
                "starting pull round"
            );
            for job in &jobs {
                debug!(
                    kind = job.kind.label(),
                    record = %job.name,
                    host = %job.target.host,
                    "pull target"
                );
            }

            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            for job in &jobs {
                ticker.tick().await;
                match self.pull_once(job).await {
                    Ok(path) => info!(
                        kind = job.kind.label(),
                        record = %job.name,
                        host = %job.target.host,
                        file = %path.display(),
                        "pulled dynamic record"
                    ),
                    // Unreachable upstreams are routine; storage failures are not.
                    Err(e) if e.is_transient() => warn!(
                        kind = job.kind.label(),
                        record = %job.name,
                        host = %job.target.host,
                        port = job.target.port,
                        error = %e,
                        "pull failed, retrying next round"
                    ),
                    Err(e) => error!(
                        kind = job.kind.label(),
                        record = %job.name,
                        error = %e,
                        "could not store pulled record, retrying next round"
                    ),
                }
            }
        }
    }
}
