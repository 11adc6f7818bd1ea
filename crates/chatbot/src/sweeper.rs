use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, warn};

use ai_kit_attachments::AttachmentStore;

use crate::config::AttachmentsConfig;
use crate::history::{ChatHistory, referenced_ids};

/// Shortest period the sweeper will run at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Supplies the attachment ids that are still referenced right now.
#[async_trait]
pub trait ValidIdSource: Send + Sync {
    async fn valid_ids(&self) -> HashSet<String>;
}

#[async_trait]
impl ValidIdSource for RwLock<Vec<ChatHistory>> {
    async fn valid_ids(&self) -> HashSet<String> {
        referenced_ids(self.read().await.iter())
    }
}

/// Spawn a background task that periodically reconciles `store` against the
/// ids reported by `source`.
///
/// Works with an `Arc<AttachmentStore>` or the `&'static` process-wide store.
/// Intervals shorter than [`MIN_SWEEP_INTERVAL`] are raised to it.
/// Returns a `JoinHandle` that can be used to abort the task on shutdown.
pub fn spawn_reconcile_task<S>(
    store: S,
    source: Arc<dyn ValidIdSource>,
    interval: Duration,
) -> tokio::task::JoinHandle<()>
where
    S: Deref<Target = AttachmentStore> + Send + Sync + 'static,
{
    if interval < MIN_SWEEP_INTERVAL {
        warn!(
            ?interval,
            minimum = ?MIN_SWEEP_INTERVAL,
            "attachment sweep interval too short, raising it"
        );
    }
    let interval = interval.max(MIN_SWEEP_INTERVAL);

    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        // The first tick completes immediately; skip it so we don't sweep
        // at startup.
        timer.tick().await;

        loop {
            timer.tick().await;
            let valid = source.valid_ids().await;
            let removed = store.reconcile(&valid).await;
            if removed > 0 {
                info!(removed, kept = valid.len(), "attachment sweep removed dangling attachments");
            }
        }
    })
}

/// Start the periodic sweep if `config` enables one.
///
/// Returns `None` when `reconcile_interval_seconds` is `0`.
pub fn start_sweeper<S>(
    config: &AttachmentsConfig,
    store: S,
    source: Arc<dyn ValidIdSource>,
) -> Option<tokio::task::JoinHandle<()>>
where
    S: Deref<Target = AttachmentStore> + Send + Sync + 'static,
{
    let interval = config.reconcile_interval()?;
    info!(?interval, "starting attachment sweeper");
    Some(spawn_reconcile_task(store, source, interval))
}
