//! Whole-document last-write-wins synchronization.
//!
//! The engine owns the in-memory document. Every mutation is applied to a
//! draft, stamped, written to the local store and then, when a session is
//! active, pushed to the remote store after a debounce window. Remote
//! documents replace local state only when their `updatedAt` is newer.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::error::SyncError;
use super::remote::{RemoteEvent, RemoteStore, Subscription};
use super::status::{PushReport, SyncStatus};
use crate::catalog::migrate_catalog;
use crate::db::{LocalStore, StorageError};
use crate::models::Document;

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Quiet period after the last mutation before a push starts.
    pub debounce: Duration,
    /// Pushes above this encoded size raise an oversize advisory.
    pub soft_limit_bytes: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(600),
            soft_limit_bytes: 950_000,
        }
    }
}

struct Session {
    user_id: String,
    listener: JoinHandle<()>,
}

struct EngineState {
    doc: Document,
    /// Set until the first session-changed event.
    booting: bool,
    /// Set while a remote document is being written locally.
    applying_remote: bool,
    session: Option<Session>,
    pending_push: Option<JoinHandle<()>>,
    push_generation: u64,
    last_push: Option<PushReport>,
}

impl EngineState {
    fn cancel_pending_push(&mut self) {
        if let Some(task) = self.pending_push.take() {
            task.abort();
            self.push_generation += 1;
        }
    }

    fn stop_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.listener.abort();
            debug!(user_id = %session.user_id, "Stopped remote subscription");
        }
        self.cancel_pending_push();
    }

    fn user_id(&self) -> Option<String> {
        self.session.as_ref().map(|s| s.user_id.clone())
    }
}

struct Shared<L, R> {
    local: L,
    remote: R,
    settings: SyncSettings,
    state: Mutex<EngineState>,
    /// Serializes remote writes. Always taken before `state`.
    push_lock: Mutex<()>,
    status: watch::Sender<SyncStatus>,
    revision: watch::Sender<u64>,
}

/// Owner of the planner document and its local and remote copies.
pub struct SyncEngine<L: LocalStore, R: RemoteStore> {
    shared: Arc<Shared<L, R>>,
}

impl<L: LocalStore, R: RemoteStore> SyncEngine<L, R> {
    /// Loads the document from `local`, seeding a fresh one when nothing
    /// usable is stored.
    ///
    /// Repairs and the catalog migration are written back without advancing
    /// `updatedAt`. The engine starts in boot mode: no push happens until
    /// [`on_session_changed`](Self::on_session_changed) is called.
    pub async fn open(local: L, remote: R, settings: SyncSettings) -> Result<Self, SyncError> {
        let stored = local.read().await?;
        let missing = stored.is_none();
        let mut doc = stored.unwrap_or_else(Document::seed);
        let before = doc.clone();
        doc.repair();
        migrate_catalog(&mut doc);
        if missing || doc != before {
            debug!(seeded = missing, "Writing repaired document locally");
            local.write(&doc).await?;
        }

        let (status, _) = watch::channel(SyncStatus::Disabled);
        let (revision, _) = watch::channel(0);
        let state = EngineState {
            doc,
            booting: true,
            applying_remote: false,
            session: None,
            pending_push: None,
            push_generation: 0,
            last_push: None,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                local,
                remote,
                settings,
                state: Mutex::new(state),
                push_lock: Mutex::new(()),
                status,
                revision,
            }),
        })
    }

    /// A copy of the current document.
    pub async fn snapshot(&self) -> Document {
        self.shared.state.lock().await.doc.clone()
    }

    /// Runs `f` against the current document without changing it.
    pub async fn read<T>(&self, f: impl FnOnce(&Document) -> T) -> T {
        f(&self.shared.state.lock().await.doc)
    }

    /// Applies a mutation.
    ///
    /// `f` runs on a draft; if it fails nothing changes. On success the
    /// draft is stamped, persisted locally and becomes the current document.
    pub async fn mutate<T, E, F>(&self, f: F) -> Result<T, SyncError>
    where
        F: FnOnce(&mut Document) -> Result<T, E>,
        SyncError: From<E>,
    {
        let mut state = self.shared.state.lock().await;
        let mut draft = state.doc.clone();
        let value = f(&mut draft)?;
        draft.stamp();
        self.shared.save(&mut state, draft).await?;
        Ok(value)
    }

    /// Identity provider hook. Ends boot mode, then starts a session for
    /// `user_id` or tears the current one down.
    pub async fn on_session_changed(&self, user_id: Option<String>) -> Result<(), SyncError> {
        self.shared.state.lock().await.booting = false;
        match user_id {
            Some(user_id) => self.start_session(user_id).await,
            None => {
                self.end_session().await;
                Ok(())
            }
        }
    }

    async fn start_session(&self, user_id: String) -> Result<(), SyncError> {
        let shared = &self.shared;
        let _push = shared.push_lock.lock().await;
        let mut state = shared.state.lock().await;
        state.stop_session();
        shared.status.send_replace(SyncStatus::Connecting);
        info!(user_id = %user_id, "Establishing sync session");

        match shared.establish(&mut state, &user_id).await {
            Ok(subscription) => {
                let listener = tokio::spawn(listen(Arc::downgrade(shared), subscription));
                state.session = Some(Session { user_id, listener });
                Ok(())
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to establish sync session");
                shared.status.send_replace(SyncStatus::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Cancels the subscription and any pending push. Local persistence keeps
    /// working on its own.
    pub async fn end_session(&self) {
        let mut state = self.shared.state.lock().await;
        if let Some(user_id) = state.user_id() {
            info!(user_id = %user_id, "Ending sync session");
        }
        state.stop_session();
        self.shared.status.send_replace(SyncStatus::Disabled);
    }

    /// Pushes a pending debounced change right away.
    ///
    /// Returns `None` when nothing was pending; in that case it still waits
    /// for an in-flight push to finish.
    pub async fn flush(&self) -> Result<Option<PushReport>, SyncError> {
        let pending = {
            let mut state = self.shared.state.lock().await;
            let pending = state.pending_push.take();
            if pending.is_some() {
                state.push_generation += 1;
            }
            pending
        };
        match pending {
            Some(task) => {
                task.abort();
                push_current(&self.shared).await.map(Some)
            }
            None => {
                let _push = self.shared.push_lock.lock().await;
                Ok(None)
            }
        }
    }

    /// Replaces local state with the remote document regardless of timestamps.
    pub async fn force_pull(&self) -> Result<(), SyncError> {
        let shared = &self.shared;
        let _push = shared.push_lock.lock().await;
        let mut state = shared.state.lock().await;
        let user_id = state.user_id().ok_or(SyncError::NoSession)?;
        let doc = shared
            .remote
            .fetch(&user_id)
            .await?
            .ok_or(SyncError::RemoteDocumentMissing)?;

        let at = doc.updated_at();
        shared.adopt(&mut state, doc).await?;
        info!(user_id = %user_id, updated_at = at, "Force-pulled remote document");
        shared.status.send_replace(SyncStatus::ForcePulled { at });
        Ok(())
    }

    /// Wipes local storage and starts over from a seeded document. With an
    /// active session the remote copy is reconciled again.
    pub async fn reset_local(&self) -> Result<(), SyncError> {
        let shared = &self.shared;
        let _push = shared.push_lock.lock().await;
        let mut state = shared.state.lock().await;
        state.cancel_pending_push();
        shared.local.clear().await?;

        let mut doc = Document::seed();
        migrate_catalog(&mut doc);
        shared.local.write(&doc).await?;
        state.doc = doc;
        shared.revision.send_modify(|r| *r += 1);
        warn!("Local document reset");

        if let Some(user_id) = state.user_id() {
            shared.reconcile(&mut state, &user_id).await?;
        }
        Ok(())
    }

    /// User-visible status feed.
    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.shared.status.subscribe()
    }

    pub fn current_status(&self) -> SyncStatus {
        self.shared.status.borrow().clone()
    }

    /// Bumped every time a remote document replaces local state.
    pub fn revisions(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    pub async fn last_push(&self) -> Option<PushReport> {
        self.shared.state.lock().await.last_push.clone()
    }

    pub async fn user_id(&self) -> Option<String> {
        self.shared.state.lock().await.user_id()
    }

    pub fn local(&self) -> &L {
        &self.shared.local
    }

    pub fn remote(&self) -> &R {
        &self.shared.remote
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.shared.settings
    }
}

impl<L: LocalStore, R: RemoteStore> Drop for SyncEngine<L, R> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.try_lock() {
            state.stop_session();
        }
    }
}

impl<L: LocalStore, R: RemoteStore> Shared<L, R> {
    /// The single save routine: local write, then (outside boot and remote
    /// apply, with a session) a debounced push.
    async fn save(
        self: &Arc<Self>,
        state: &mut EngineState,
        doc: Document,
    ) -> Result<(), StorageError> {
        self.local.write(&doc).await?;
        state.doc = doc;
        if !state.booting && !state.applying_remote && state.session.is_some() {
            self.schedule_push(state);
        }
        Ok(())
    }

    fn schedule_push(self: &Arc<Self>, state: &mut EngineState) {
        state.cancel_pending_push();
        state.push_generation += 1;
        let generation = state.push_generation;
        let shared = Arc::clone(self);

        state.pending_push = Some(tokio::spawn(async move {
            tokio::time::sleep(shared.settings.debounce).await;
            {
                let mut state = shared.state.lock().await;
                if state.push_generation != generation {
                    return;
                }
                state.pending_push = None;
            }
            if let Err(e) = push_current(&shared).await {
                debug!(error = %e, "Debounced push skipped");
            }
        }));
    }

    /// Writes `doc` to the remote store and reports the outcome on the
    /// status feed. Never fails; the error is carried in the report.
    async fn push_doc(&self, user_id: &str, doc: &Document) -> PushReport {
        let bytes = serde_json::to_vec(doc).map(|v| v.len()).unwrap_or(0);
        let oversize = bytes > self.settings.soft_limit_bytes;
        if oversize {
            warn!(
                bytes,
                limit = self.settings.soft_limit_bytes,
                "Document is close to the remote size limit"
            );
            self.status.send_replace(SyncStatus::Oversize { bytes });
        }

        let updated_at = doc.updated_at();
        match self.remote.write(user_id, doc).await {
            Ok(()) => {
                info!(user_id = %user_id, updated_at, bytes, "Pushed document");
                if !oversize {
                    self.status.send_replace(SyncStatus::Saved { at: updated_at });
                }
                PushReport {
                    updated_at,
                    bytes,
                    oversize,
                    error: None,
                }
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Push failed");
                self.status.send_replace(SyncStatus::Error(e.to_string()));
                PushReport {
                    updated_at,
                    bytes,
                    oversize,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Compares the remote document with local state and moves the newer
    /// one across.
    async fn reconcile(
        self: &Arc<Self>,
        state: &mut EngineState,
        user_id: &str,
    ) -> Result<(), SyncError> {
        let remote = self.remote.fetch(user_id).await?;
        let local_at = state.doc.updated_at();
        match remote {
            Some(doc) if doc.updated_at() > local_at => {
                info!(
                    user_id = %user_id,
                    local = local_at,
                    remote = doc.updated_at(),
                    "Remote document is newer, adopting it"
                );
                self.adopt(state, doc).await?;
                self.status.send_replace(SyncStatus::Restored);
            }
            Some(doc) if doc.updated_at() == local_at => {
                debug!(user_id = %user_id, updated_at = local_at, "Already in sync");
                self.status.send_replace(SyncStatus::InSync);
            }
            _ => {
                debug!(user_id = %user_id, updated_at = local_at, "Local document is newer, pushing it");
                let report = self.push_doc(user_id, &state.doc).await;
                state.last_push = Some(report);
            }
        }
        Ok(())
    }

    async fn establish(
        self: &Arc<Self>,
        state: &mut EngineState,
        user_id: &str,
    ) -> Result<Subscription, SyncError> {
        self.reconcile(state, user_id).await?;
        Ok(self.remote.subscribe(user_id).await?)
    }

    /// Replaces local state with `doc`. No push is scheduled and any pending
    /// push of the superseded state is dropped.
    async fn adopt(self: &Arc<Self>, state: &mut EngineState, mut doc: Document) -> Result<(), SyncError> {
        doc.repair();
        migrate_catalog(&mut doc);

        state.applying_remote = true;
        let saved = self.save(state, doc).await;
        state.applying_remote = false;
        saved?;

        state.cancel_pending_push();
        self.revision.send_modify(|r| *r += 1);
        Ok(())
    }

    /// Handles a change notification; stale documents and our own echoes are
    /// ignored.
    async fn apply_remote(self: &Arc<Self>, doc: Document) {
        let mut state = self.state.lock().await;
        let at = doc.updated_at();
        if at <= state.doc.updated_at() {
            debug!(remote = at, local = state.doc.updated_at(), "Ignoring remote echo");
            return;
        }
        match self.adopt(&mut state, doc).await {
            Ok(()) => {
                info!(updated_at = at, "Applied document from another device");
                self.status.send_replace(SyncStatus::UpdatedFromRemote { at });
            }
            Err(e) => {
                error!(error = %e, "Failed to apply remote document");
                self.status.send_replace(SyncStatus::Error(e.to_string()));
            }
        }
    }
}

async fn push_current<L: LocalStore, R: RemoteStore>(
    shared: &Arc<Shared<L, R>>,
) -> Result<PushReport, SyncError> {
    let _push = shared.push_lock.lock().await;
    let (user_id, doc) = {
        let state = shared.state.lock().await;
        let user_id = state.user_id().ok_or(SyncError::NoSession)?;
        (user_id, state.doc.clone())
    };
    let report = shared.push_doc(&user_id, &doc).await;
    shared.state.lock().await.last_push = Some(report.clone());
    Ok(report)
}

async fn listen<L: LocalStore, R: RemoteStore>(
    shared: Weak<Shared<L, R>>,
    mut subscription: Subscription,
) {
    while let Some(event) = subscription.next().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        match event {
            RemoteEvent::Changed(doc) => shared.apply_remote(doc).await,
            RemoteEvent::Error(e) => {
                warn!(error = %e, "Remote subscription error");
                shared.status.send_replace(SyncStatus::Error(e.to_string()));
            }
        }
    }
    debug!("Remote subscription closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CATALOG_VERSION;
    use crate::db::MemoryStore;
    use crate::planner::{profiles, PlanError};
    use crate::sync::error::RemoteError;
    use crate::sync::remote::MemoryRemote;

    const USER: &str = "user-1";

    fn doc_named(name: &str, updated_at: i64) -> Document {
        let mut doc = Document::seed();
        doc.profiles[0].name = name.to_string();
        doc.meta.updated_at = updated_at;
        migrate_catalog(&mut doc);
        doc
    }

    async fn open(local: MemoryStore, remote: MemoryRemote) -> SyncEngine<MemoryStore, MemoryRemote> {
        SyncEngine::open(local, remote, SyncSettings::default())
            .await
            .unwrap()
    }

    async fn rename(engine: &SyncEngine<MemoryStore, MemoryRemote>, name: &str) {
        let name = name.to_string();
        engine
            .mutate(move |doc| profiles::rename_profile(doc, &name))
            .await
            .unwrap();
    }

    async fn profile_name(engine: &SyncEngine<MemoryStore, MemoryRemote>) -> String {
        engine
            .read(|doc| doc.current_profile().unwrap().name.clone())
            .await
    }

    /// Lets spawned tasks run until they block.
    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_open_seeds_and_migrates() {
        let engine = open(MemoryStore::new(), MemoryRemote::new()).await;
        let doc = engine.snapshot().await;
        assert_eq!(doc.updated_at(), 0);
        assert_eq!(doc.foods_version.as_deref(), Some(CATALOG_VERSION));
        assert!(!doc.foods.is_empty());
        assert_eq!(engine.local().writes(), 1);
        assert_eq!(engine.current_status(), SyncStatus::Disabled);
    }

    #[tokio::test]
    async fn test_open_treats_corrupt_store_as_empty() {
        let engine = open(MemoryStore::with_raw("{not json"), MemoryRemote::new()).await;
        assert_eq!(profile_name(&engine).await, "Profile 1");
        assert!(engine.local().read().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_open_does_not_rewrite_clean_document() {
        let local = MemoryStore::with_document(&doc_named("Stored", 42)).unwrap();
        let engine = open(local, MemoryRemote::new()).await;
        assert_eq!(engine.local().writes(), 0);
        assert_eq!(engine.snapshot().await.updated_at(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_push_while_booting() {
        let remote = MemoryRemote::new();
        let engine = open(MemoryStore::new(), remote.clone()).await;
        rename(&engine, "Offline edit").await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(remote.writes(), 0);
        assert_eq!(engine.flush().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remote_newer_is_adopted() {
        let remote = MemoryRemote::new();
        remote.write(USER, &doc_named("Remote", 200)).await.unwrap();
        let local = MemoryStore::with_document(&doc_named("Local", 100)).unwrap();
        let engine = open(local, remote.clone()).await;
        let revisions = engine.revisions();

        engine.on_session_changed(Some(USER.into())).await.unwrap();

        assert_eq!(profile_name(&engine).await, "Remote");
        let stored = engine.local().read().await.unwrap().unwrap();
        assert_eq!(stored.updated_at(), 200);
        assert_eq!(stored.current_profile().unwrap().name, "Remote");
        assert_eq!(engine.current_status(), SyncStatus::Restored);
        assert_eq!(*revisions.borrow(), 1);
        assert_eq!(remote.writes(), 1);
    }

    #[tokio::test]
    async fn test_local_newer_is_pushed() {
        let remote = MemoryRemote::new();
        remote.write(USER, &doc_named("Remote", 200)).await.unwrap();
        let local = MemoryStore::with_document(&doc_named("Local", 300)).unwrap();
        let engine = open(local, remote.clone()).await;

        engine.on_session_changed(Some(USER.into())).await.unwrap();

        let stored = remote.peek(USER).await.unwrap();
        assert_eq!(stored, engine.snapshot().await);
        assert_eq!(stored.current_profile().unwrap().name, "Local");
        assert_eq!(engine.current_status(), SyncStatus::Saved { at: 300 });
        assert!(engine.last_push().await.unwrap().ok());
    }

    #[tokio::test]
    async fn test_equal_timestamps_are_in_sync() {
        let remote = MemoryRemote::new();
        remote.write(USER, &doc_named("Same", 200)).await.unwrap();
        let local = MemoryStore::with_document(&doc_named("Same", 200)).unwrap();
        let engine = open(local, remote.clone()).await;

        engine.on_session_changed(Some(USER.into())).await.unwrap();

        assert_eq!(engine.current_status(), SyncStatus::InSync);
        assert_eq!(remote.writes(), 1);
    }

    #[tokio::test]
    async fn test_missing_remote_receives_local() {
        let remote = MemoryRemote::new();
        let engine = open(MemoryStore::new(), remote.clone()).await;
        engine.on_session_changed(Some(USER.into())).await.unwrap();
        assert_eq!(remote.peek(USER).await.unwrap(), engine.snapshot().await);
        assert_eq!(engine.user_id().await.as_deref(), Some(USER));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_mutations() {
        let remote = MemoryRemote::new();
        let engine = open(MemoryStore::new(), remote.clone()).await;
        engine.on_session_changed(Some(USER.into())).await.unwrap();
        assert_eq!(remote.writes(), 1);

        for name in ["A", "B", "C"] {
            rename(&engine, name).await;
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert_eq!(remote.writes(), 1);

        tokio::time::sleep(Duration::from_millis(700)).await;
        settle().await;

        assert_eq!(remote.writes(), 2);
        let pushed = remote.peek(USER).await.unwrap();
        assert_eq!(pushed.current_profile().unwrap().name, "C");
        assert_eq!(pushed, engine.snapshot().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_pushes_pending_change() {
        let remote = MemoryRemote::new();
        let engine = open(MemoryStore::new(), remote.clone()).await;
        engine.on_session_changed(Some(USER.into())).await.unwrap();
        rename(&engine, "Flushed").await;

        let report = engine.flush().await.unwrap().unwrap();
        assert!(report.ok());
        assert_eq!(remote.writes(), 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(remote.writes(), 2);
    }

    #[tokio::test]
    async fn test_echo_is_ignored() {
        let remote = MemoryRemote::new();
        let engine = open(MemoryStore::new(), remote.clone()).await;
        engine.on_session_changed(Some(USER.into())).await.unwrap();
        rename(&engine, "Mine").await;
        engine.flush().await.unwrap();
        settle().await;

        let revisions = engine.revisions();
        let stale = doc_named("Stale", 1);
        remote.write(USER, &stale).await.unwrap();
        settle().await;

        assert_eq!(profile_name(&engine).await, "Mine");
        assert_eq!(*revisions.borrow(), 0);
    }

    #[tokio::test]
    async fn test_change_from_other_device_is_applied() {
        let remote = MemoryRemote::new();
        let engine = open(MemoryStore::new(), remote.clone()).await;
        engine.on_session_changed(Some(USER.into())).await.unwrap();

        let newer = doc_named("Phone", i64::MAX / 2);
        remote.write(USER, &newer).await.unwrap();
        settle().await;

        assert_eq!(profile_name(&engine).await, "Phone");
        assert_eq!(
            engine.current_status(),
            SyncStatus::UpdatedFromRemote { at: i64::MAX / 2 }
        );
        let stored = engine.local().read().await.unwrap().unwrap();
        assert_eq!(stored.updated_at(), i64::MAX / 2);
        // Adopting must not echo the document back.
        assert_eq!(remote.writes(), 2);
    }

    #[tokio::test]
    async fn test_subscription_error_sets_status() {
        let remote = MemoryRemote::new();
        let engine = open(MemoryStore::new(), remote.clone()).await;
        engine.on_session_changed(Some(USER.into())).await.unwrap();
        remote
            .fail_subscribers(USER, RemoteError::WebSocket("reset".into()))
            .await;
        settle().await;
        assert!(engine.current_status().is_error());
    }

    #[tokio::test]
    async fn test_force_pull_requires_session_and_document() {
        let remote = MemoryRemote::new();
        let engine = open(MemoryStore::new(), remote.clone()).await;
        assert!(matches!(engine.force_pull().await, Err(SyncError::NoSession)));

        engine.on_session_changed(Some(USER.into())).await.unwrap();
        remote.remove(USER).await;
        assert!(matches!(
            engine.force_pull().await,
            Err(SyncError::RemoteDocumentMissing)
        ));
    }

    #[tokio::test]
    async fn test_force_pull_ignores_timestamps() {
        let remote = MemoryRemote::new();
        let local = MemoryStore::with_document(&doc_named("Local", 500)).unwrap();
        let engine = open(local, remote.clone()).await;
        engine.on_session_changed(Some(USER.into())).await.unwrap();

        remote.write(USER, &doc_named("Older", 10)).await.unwrap();
        settle().await;
        assert_eq!(profile_name(&engine).await, "Local");

        engine.force_pull().await.unwrap();
        assert_eq!(profile_name(&engine).await, "Older");
        assert_eq!(engine.current_status(), SyncStatus::ForcePulled { at: 10 });
    }

    #[tokio::test]
    async fn test_oversize_is_advisory() {
        let remote = MemoryRemote::new();
        let settings = SyncSettings {
            soft_limit_bytes: 10,
            ..SyncSettings::default()
        };
        let engine = SyncEngine::open(MemoryStore::new(), remote.clone(), settings)
            .await
            .unwrap();
        engine.on_session_changed(Some(USER.into())).await.unwrap();

        assert_eq!(remote.writes(), 1);
        let report = engine.last_push().await.unwrap();
        assert!(report.oversize);
        assert!(report.ok());
        assert!(matches!(
            engine.current_status(),
            SyncStatus::Oversize { .. }
        ));
    }

    #[tokio::test]
    async fn test_push_failure_is_reported_and_local_kept() {
        let remote = MemoryRemote::new();
        let engine = open(MemoryStore::new(), remote.clone()).await;
        engine.on_session_changed(Some(USER.into())).await.unwrap();

        remote.set_offline(true);
        rename(&engine, "Offline").await;
        let report = engine.flush().await.unwrap().unwrap();

        assert!(!report.ok());
        assert!(engine.current_status().is_error());
        assert_eq!(profile_name(&engine).await, "Offline");
        let stored = engine.local().read().await.unwrap().unwrap();
        assert_eq!(stored.current_profile().unwrap().name, "Offline");
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_session() {
        let remote = MemoryRemote::new();
        remote.set_offline(true);
        let engine = open(MemoryStore::new(), remote.clone()).await;

        let result = engine.on_session_changed(Some(USER.into())).await;
        assert!(matches!(
            result,
            Err(SyncError::Remote(RemoteError::Offline))
        ));
        assert!(engine.user_id().await.is_none());
        assert!(engine.current_status().is_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_session_cancels_pending_push() {
        let remote = MemoryRemote::new();
        let engine = open(MemoryStore::new(), remote.clone()).await;
        engine.on_session_changed(Some(USER.into())).await.unwrap();
        rename(&engine, "Never pushed").await;

        engine.on_session_changed(None).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;

        assert_eq!(remote.writes(), 1);
        assert_eq!(engine.current_status(), SyncStatus::Disabled);
        assert_eq!(profile_name(&engine).await, "Never pushed");
    }

    #[tokio::test]
    async fn test_validation_error_leaves_document_untouched() {
        let engine = open(MemoryStore::new(), MemoryRemote::new()).await;
        let before = engine.snapshot().await;
        let writes = engine.local().writes();

        let result = engine
            .mutate(|doc| profiles::rename_profile(doc, "  "))
            .await;

        assert!(matches!(result, Err(SyncError::Plan(PlanError::EmptyName))));
        assert_eq!(engine.snapshot().await, before);
        assert_eq!(engine.local().writes(), writes);
    }

    #[tokio::test]
    async fn test_non_finite_target_keeps_stored_plan() {
        let engine = open(MemoryStore::new(), MemoryRemote::new()).await;
        rename(&engine, "My plan").await;
        let writes = engine.local().writes();

        let result = engine
            .mutate(|doc| {
                profiles::set_targets(
                    doc,
                    profiles::TargetsUpdate {
                        weight: Some("inf".parse().unwrap()),
                        ..Default::default()
                    },
                )
            })
            .await;

        assert!(matches!(
            result,
            Err(SyncError::Plan(PlanError::InvalidAmount(_)))
        ));
        assert_eq!(engine.local().writes(), writes);
        let raw = engine.local().raw().unwrap();
        assert!(!raw.contains("\"weight\":null"));

        let reopened = open(MemoryStore::with_raw(raw), MemoryRemote::new()).await;
        assert_eq!(profile_name(&reopened).await, "My plan");
    }

    #[tokio::test]
    async fn test_new_session_drops_previous_subscription() {
        let remote = MemoryRemote::new();
        let engine = open(MemoryStore::new(), remote.clone()).await;
        engine.on_session_changed(Some("a".into())).await.unwrap();
        engine.on_session_changed(Some("b".into())).await.unwrap();
        let before = profile_name(&engine).await;

        remote
            .write("a", &doc_named("From A", i64::MAX / 2))
            .await
            .unwrap();
        settle().await;
        assert_eq!(profile_name(&engine).await, before);
        assert_eq!(engine.user_id().await.as_deref(), Some("b"));

        remote
            .write("b", &doc_named("From B", i64::MAX / 2))
            .await
            .unwrap();
        settle().await;
        assert_eq!(profile_name(&engine).await, "From B");
    }

    #[tokio::test]
    async fn test_mutation_stamps_document() {
        let engine = open(MemoryStore::new(), MemoryRemote::new()).await;
        rename(&engine, "Stamped").await;
        let doc = engine.snapshot().await;
        assert!(doc.updated_at() > 0);
        assert_eq!(engine.local().read().await.unwrap().unwrap(), doc);
    }

    #[tokio::test]
    async fn test_reset_local_reseeds_and_repulls() {
        let remote = MemoryRemote::new();
        let engine = open(MemoryStore::new(), remote.clone()).await;
        engine.on_session_changed(Some(USER.into())).await.unwrap();
        rename(&engine, "Synced").await;
        engine.flush().await.unwrap();
        settle().await;

        engine.reset_local().await.unwrap();

        assert_eq!(profile_name(&engine).await, "Synced");
        assert_eq!(engine.current_status(), SyncStatus::Restored);
    }

    #[tokio::test]
    async fn test_reset_local_without_session() {
        let engine = open(MemoryStore::new(), MemoryRemote::new()).await;
        rename(&engine, "Gone").await;
        engine.reset_local().await.unwrap();
        assert_eq!(profile_name(&engine).await, "Profile 1");
        assert_eq!(engine.snapshot().await.updated_at(), 0);
    }
}
