use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::backend::{AttachmentBackend, BackendOpener};
use crate::record::{AttachmentMeta, AttachmentRecord};

pub(crate) const LOG_TARGET: &str = "ai_kit::attachments";

/// Outcome of the one-time backend initialization.
enum Availability {
    Available(Arc<dyn AttachmentBackend>),
    Unavailable,
}

/// The attachment blob store used by the chatbot.
///
/// The backend is opened on first use, exactly once: concurrent first
/// callers all wait on the same in-flight open. If the environment has no
/// persistent storage, or the open fails, the store stays unavailable for
/// the rest of its lifetime and every operation answers with its empty
/// result.
///
/// No operation returns an error. Backend failures are logged and
/// surface as `None`, `0`, or nothing at all, so callers must treat every
/// attachment as possibly ephemeral.
pub struct AttachmentStore {
    opener: Option<Box<dyn BackendOpener>>,
    state: OnceCell<Availability>,
}

impl AttachmentStore {
    /// Create a store that opens its backend through `opener` on first use.
    pub fn new(opener: impl BackendOpener + 'static) -> Self {
        Self {
            opener: Some(Box::new(opener)),
            state: OnceCell::new(),
        }
    }

    /// Create a store around a backend that is already open.
    pub fn with_backend(backend: Arc<dyn AttachmentBackend>) -> Self {
        Self {
            opener: None,
            state: OnceCell::new_with(Some(Availability::Available(backend))),
        }
    }

    /// Create a store that has no persistent storage.
    pub fn unavailable() -> Self {
        Self {
            opener: None,
            state: OnceCell::new_with(Some(Availability::Unavailable)),
        }
    }

    /// Whether the backend opened successfully. Triggers initialization.
    pub async fn is_available(&self) -> bool {
        self.backend().await.is_some()
    }

    /// Persist `blob` under `id`, replacing any existing record.
    ///
    /// `created_at` is stamped with the current time. Returns the id once the
    /// write has committed, or `None` if nothing was persisted. A `None` is
    /// final; the write is not retried.
    pub async fn put(
        &self,
        id: impl Into<String>,
        blob: Bytes,
        meta: AttachmentMeta,
    ) -> Option<String> {
        let backend = self.backend().await?;
        let record = AttachmentRecord::new(id, blob, meta, Utc::now().timestamp_millis());
        let id = record.id.clone();

        match backend.put(record).await {
            Ok(()) => Some(id),
            Err(e) => {
                warn!(target: LOG_TARGET, id = %id, error = %e, "failed to persist attachment");
                None
            }
        }
    }

    /// Load the full record for `id`, or `None` if it is absent or cannot be read.
    pub async fn get(&self, id: &str) -> Option<AttachmentRecord> {
        let backend = self.backend().await?;

        match backend.get(id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(target: LOG_TARGET, id = %id, error = %e, "failed to load attachment");
                None
            }
        }
    }

    /// Remove the record for `id`. Removing an absent id is not an error.
    pub async fn delete(&self, id: &str) {
        let Some(backend) = self.backend().await else {
            return;
        };

        if let Err(e) = backend.delete(id).await {
            warn!(target: LOG_TARGET, id = %id, error = %e, "failed to delete attachment");
        }
    }

    /// Remove every record.
    pub async fn clear(&self) {
        let Some(backend) = self.backend().await else {
            return;
        };

        match backend.clear().await {
            Ok(removed) => debug!(target: LOG_TARGET, removed, "cleared attachment store"),
            Err(e) => warn!(target: LOG_TARGET, error = %e, "failed to clear attachments"),
        }
    }

    /// Remove every record whose id is not in `valid_ids`.
    ///
    /// Working out which ids are still referenced is up to the caller; the
    /// store does no reachability analysis. Returns the number of records
    /// removed, which is `0` when the store is unavailable or the sweep failed.
    pub async fn reconcile(&self, valid_ids: &HashSet<String>) -> u64 {
        let Some(backend) = self.backend().await else {
            return 0;
        };

        match backend.retain(valid_ids).await {
            Ok(removed) => {
                if removed > 0 {
                    debug!(target: LOG_TARGET, removed, kept = valid_ids.len(), "removed dangling attachments");
                }
                removed
            }
            Err(e) => {
                warn!(target: LOG_TARGET, error = %e, "failed to clean up attachments");
                0
            }
        }
    }

    /// Ids of every stored record, in no particular order.
    pub async fn ids(&self) -> Vec<String> {
        let Some(backend) = self.backend().await else {
            return Vec::new();
        };

        backend.ids().await.unwrap_or_else(|e| {
            warn!(target: LOG_TARGET, error = %e, "failed to list attachments");
            Vec::new()
        })
    }

    async fn backend(&self) -> Option<&Arc<dyn AttachmentBackend>> {
        match self.state.get_or_init(|| self.initialize()).await {
            Availability::Available(backend) => Some(backend),
            Availability::Unavailable => None,
        }
    }

    async fn initialize(&self) -> Availability {
        let Some(opener) = &self.opener else {
            return Availability::Unavailable;
        };

        match opener.open().await {
            Ok(backend) => {
                debug!(target: LOG_TARGET, backend = %opener.describe(), "attachment store opened");
                Availability::Available(backend)
            }
            Err(e) if e.is_unsupported() => {
                debug!(
                    target: LOG_TARGET,
                    backend = %opener.describe(),
                    reason = %e,
                    "persistent storage unavailable, attachments will not be persisted"
                );
                Availability::Unavailable
            }
            Err(e) => {
                warn!(
                    target: LOG_TARGET,
                    backend = %opener.describe(),
                    error = %e,
                    "failed to open attachment store"
                );
                Availability::Unavailable
            }
        }
    }
}

impl fmt::Debug for AttachmentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state.get() {
            None => "uninitialized",
            Some(Availability::Available(_)) => "available",
            Some(Availability::Unavailable) => "unavailable",
        };
        f.debug_struct("AttachmentStore")
            .field("opener", &self.opener.as_ref().map(|o| o.describe()))
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::AttachmentError;
    use crate::testing::run_store_conformance_tests;

    /// Backend over a plain map. `fail_next` makes the next call fail once.
    #[derive(Default)]
    struct MapBackend {
        records: Mutex<HashMap<String, AttachmentRecord>>,
        fail_next: AtomicBool,
    }

    impl MapBackend {
        fn check(&self) -> Result<(), AttachmentError> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(AttachmentError::Transaction("aborted".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl AttachmentBackend for MapBackend {
        async fn put(&self, record: AttachmentRecord) -> Result<(), AttachmentError> {
            self.check()?;
            self.records
                .lock()
                .unwrap()
                .insert(record.id.clone(), record);
            Ok(())
        }

        async fn get(&self, id: &str) -> Result<Option<AttachmentRecord>, AttachmentError> {
            self.check()?;
            Ok(self.records.lock().unwrap().get(id).cloned())
        }

        async fn delete(&self, id: &str) -> Result<bool, AttachmentError> {
            self.check()?;
            Ok(self.records.lock().unwrap().remove(id).is_some())
        }

        async fn clear(&self) -> Result<u64, AttachmentError> {
            self.check()?;
            let mut records = self.records.lock().unwrap();
            let removed = records.len() as u64;
            records.clear();
            Ok(removed)
        }

        async fn retain(&self, valid_ids: &HashSet<String>) -> Result<u64, AttachmentError> {
            self.check()?;
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|id, _| valid_ids.contains(id));
            Ok((before - records.len()) as u64)
        }

        async fn ids(&self) -> Result<Vec<String>, AttachmentError> {
            self.check()?;
            Ok(self.records.lock().unwrap().keys().cloned().collect())
        }
    }

    enum OpenBehavior {
        Succeed,
        Unsupported,
        Fail,
    }

    struct CountingOpener {
        opens: Arc<AtomicUsize>,
        behavior: OpenBehavior,
    }

    impl CountingOpener {
        fn new(behavior: OpenBehavior) -> (Self, Arc<AtomicUsize>) {
            let opens = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    opens: Arc::clone(&opens),
                    behavior,
                },
                opens,
            )
        }
    }

    #[async_trait]
    impl BackendOpener for CountingOpener {
        async fn open(&self) -> Result<Arc<dyn AttachmentBackend>, AttachmentError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            match self.behavior {
                OpenBehavior::Succeed => Ok(Arc::new(MapBackend::default())),
                OpenBehavior::Unsupported => Err(AttachmentError::Unsupported("no data dir".into())),
                OpenBehavior::Fail => Err(AttachmentError::Open("disk on fire".into())),
            }
        }

        fn describe(&self) -> String {
            "counting".to_owned()
        }
    }

    fn png_meta(size: u64) -> AttachmentMeta {
        AttachmentMeta::new("a.png", "image/png", size)
    }

    async fn assert_degraded(store: &AttachmentStore) {
        assert!(!store.is_available().await);
        assert!(
            store
                .put("att-1", Bytes::from_static(b"hello"), png_meta(5))
                .await
                .is_none()
        );
        assert!(store.get("att-1").await.is_none());
        store.delete("att-1").await;
        store.clear().await;
        assert_eq!(store.reconcile(&HashSet::new()).await, 0);
        assert!(store.ids().await.is_empty());
    }

    #[tokio::test]
    async fn conformance() {
        let store = AttachmentStore::with_backend(Arc::new(MapBackend::default()));
        run_store_conformance_tests(&store).await;
    }

    #[tokio::test]
    async fn unavailable_store_is_a_no_op() {
        assert_degraded(&AttachmentStore::unavailable()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn unsupported_environment_degrades_without_reprobing() {
        let (opener, opens) = CountingOpener::new(OpenBehavior::Unsupported);
        let store = AttachmentStore::new(opener);

        assert_degraded(&store).await;
        assert_degraded(&store).await;
        assert_eq!(opens.load(Ordering::SeqCst), 1, "capability is probed once");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_open_degrades_and_is_not_retried() {
        let (opener, opens) = CountingOpener::new(OpenBehavior::Fail);
        let store = AttachmentStore::new(opener);

        assert_degraded(&store).await;
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_first_use_opens_once() {
        let (opener, opens) = CountingOpener::new(OpenBehavior::Succeed);
        let store = AttachmentStore::new(opener);

        let puts = (0..16).map(|i| {
            let store = &store;
            async move {
                store
                    .put(format!("att-{i}"), Bytes::from_static(b"x"), png_meta(1))
                    .await
            }
        });
        let results = futures::future::join_all(puts).await;

        assert!(results.iter().all(Option::is_some));
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(store.ids().await.len(), 16);
    }

    #[tokio::test]
    async fn transaction_failure_is_benign_and_handle_stays_usable() {
        let backend = Arc::new(MapBackend::default());
        let store = AttachmentStore::with_backend(Arc::clone(&backend) as Arc<dyn AttachmentBackend>);

        backend.fail_next.store(true, Ordering::SeqCst);
        assert!(
            store
                .put("att-1", Bytes::from_static(b"hello"), png_meta(5))
                .await
                .is_none()
        );
        assert!(store.get("att-1").await.is_none());

        assert_eq!(
            store
                .put("att-1", Bytes::from_static(b"hello"), png_meta(5))
                .await
                .as_deref(),
            Some("att-1")
        );

        backend.fail_next.store(true, Ordering::SeqCst);
        assert!(store.get("att-1").await.is_none(), "failed read looks like a miss");
        assert!(store.get("att-1").await.is_some());

        backend.fail_next.store(true, Ordering::SeqCst);
        assert_eq!(store.reconcile(&HashSet::new()).await, 0);
        assert!(store.get("att-1").await.is_some(), "failed sweep removed nothing");
    }

    #[tokio::test]
    async fn debug_reports_state() {
        let store = AttachmentStore::unavailable();
        assert!(format!("{store:?}").contains("unavailable"));
    }
}
