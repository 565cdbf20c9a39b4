//! Sync controller
//!
//! Runs load/add/remove against a [`RemoteCollection`] and feeds confirmed
//! outcomes to the single writer. Every failure is returned to the caller
//! and published on the view channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::view::{Failure, Operation, SyncView};
use super::writer::{Command, Writer};
use crate::client::RemoteCollection;
use crate::error::{Result, SyncError};
use crate::record::{Draft, Record, RecordId};

/// Keeps a local list in step with a remote collection
///
/// Cheap to clone; all clones share one writer task. Must be created inside
/// a tokio runtime.
#[derive(Clone)]
pub struct SyncController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    client: Arc<dyn RemoteCollection>,
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<SyncView>,
    disposed: AtomicBool,
}

impl SyncController {
    pub fn new(client: Arc<dyn RemoteCollection>) -> Self {
        let (view_tx, view_rx) = watch::channel(SyncView::default());
        let (commands, queue) = mpsc::unbounded_channel();

        tokio::spawn(Writer::new(view_tx).run(queue));

        Self {
            inner: Arc::new(ControllerInner {
                client,
                commands,
                view: view_rx,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Latest published view
    pub fn view(&self) -> SyncView {
        self.inner.view.borrow().clone()
    }

    /// Receiver that observes every published view
    pub fn subscribe(&self) -> watch::Receiver<SyncView> {
        self.inner.view.clone()
    }

    /// Current list contents
    pub fn records(&self) -> Vec<Record> {
        self.inner.view.borrow().records.clone()
    }

    /// Wait until every outcome reported so far is applied, then return
    /// the resulting view
    pub async fn flush(&self) -> Result<SyncView> {
        self.request(|reply| Command::Flush { reply }).await
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Stop applying outcomes
    ///
    /// Requests already on the wire still complete, but their results are
    /// discarded and their callers get [`SyncError::Disposed`].
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            tracing::debug!("Disposing sync controller");
            let _ = self.inner.commands.send(Command::Shutdown);
        }
    }

    /// Read the whole collection and replace the local list with it
    ///
    /// Returns the list as installed. On failure the list is left as it was.
    pub async fn load(&self) -> Result<Vec<Record>> {
        join(self.spawn_load()).await
    }

    /// Create a record from `draft` and append the server's copy
    ///
    /// A draft missing `name` or `country` is rejected without a network
    /// call.
    pub async fn add(&self, draft: Draft) -> Result<Record> {
        join(self.spawn_add(draft)).await
    }

    /// Delete `id` remotely, then drop it from the local list
    ///
    /// The id must be in the local list; otherwise this fails with
    /// [`SyncError::NotFound`] without a network call.
    pub async fn remove(&self, id: &RecordId) -> Result<()> {
        join(self.spawn_remove(id.clone())).await
    }

    /// Run [`load`](Self::load) in the background
    ///
    /// Every operation runs on its own task, so the writer sees its outcome
    /// even when the caller stops waiting.
    pub fn spawn_load(&self) -> JoinHandle<Result<Vec<Record>>> {
        tokio::spawn(self.clone().run_load())
    }

    /// Run [`add`](Self::add) in the background
    pub fn spawn_add(&self, draft: Draft) -> JoinHandle<Result<Record>> {
        tokio::spawn(self.clone().run_add(draft))
    }

    /// Run [`remove`](Self::remove) in the background
    pub fn spawn_remove(&self, id: RecordId) -> JoinHandle<Result<()>> {
        tokio::spawn(self.clone().run_remove(id))
    }

    async fn run_load(self) -> Result<Vec<Record>> {
        let since = self
            .request(|reply| Command::BeginLoad { reply })
            .await?;
        tracing::debug!(since, "Load dispatched");

        let outcome = self.inner.client.load().await;
        self.ensure_live(Operation::Load)?;

        match outcome {
            Ok(records) => {
                let count = records.len();
                let installed = self
                    .request(|reply| Command::Loaded {
                        since,
                        records,
                        reply,
                    })
                    .await?;
                tracing::info!(count, installed = installed.len(), "Loaded collection");
                Ok(installed)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Load failed");
                self.send(Command::LoadFailed {
                    since,
                    failure: Failure::new(Operation::Load, &e),
                })?;
                Err(e)
            }
        }
    }

    async fn run_add(self, draft: Draft) -> Result<Record> {
        if self.is_disposed() {
            return Err(SyncError::Disposed);
        }
        if let Err(e) = draft.validate() {
            tracing::debug!(error = %e, "Add rejected before dispatch");
            self.send(Command::Failed {
                failure: Failure::new(Operation::Add, &e),
                dispatched: false,
            })?;
            return Err(e);
        }

        let draft = draft.trimmed();
        self.send(Command::BeginAdd)?;
        tracing::debug!(name = %draft.name, country = %draft.country, "Add dispatched");

        let outcome = self.inner.client.create(&draft).await;
        self.ensure_live(Operation::Add)?;

        match outcome {
            Ok(record) => {
                tracing::info!(id = %record.id, name = %record.name, "Added record");
                self.send(Command::Created {
                    record: record.clone(),
                })?;
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Add failed");
                self.send(Command::Failed {
                    failure: Failure::new(Operation::Add, &e),
                    dispatched: true,
                })?;
                Err(e)
            }
        }
    }

    async fn run_remove(self, id: RecordId) -> Result<()> {
        let present = self
            .request(|reply| Command::BeginRemove {
                id: id.clone(),
                reply,
            })
            .await?;
        if !present {
            let e = SyncError::NotFound(id.clone());
            tracing::debug!(%id, "Remove rejected: not in local list");
            self.send(Command::Failed {
                failure: Failure::new(Operation::Remove, &e),
                dispatched: false,
            })?;
            return Err(e);
        }
        tracing::debug!(%id, "Remove dispatched");

        let outcome = self.inner.client.remove(&id).await;
        self.ensure_live(Operation::Remove)?;

        match outcome {
            Ok(()) => {
                tracing::info!(%id, "Removed record");
                self.send(Command::Removed { id })?;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "Remove failed");
                self.send(Command::Failed {
                    failure: Failure::new(Operation::Remove, &e),
                    dispatched: true,
                })?;
                Err(e)
            }
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        if self.is_disposed() {
            return Err(SyncError::Disposed);
        }
        self.inner
            .commands
            .send(command)
            .map_err(|_| SyncError::Disposed)
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply))?;
        response.await.map_err(|_| SyncError::Disposed)
    }

    /// Refuse to apply a completion that arrived after disposal
    fn ensure_live(&self, operation: Operation) -> Result<()> {
        if self.is_disposed() {
            tracing::debug!(%operation, "Discarding completion after dispose");
            return Err(SyncError::Disposed);
        }
        Ok(())
    }
}

async fn join<T>(task: JoinHandle<Result<T>>) -> Result<T> {
    task.await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Sync task did not complete");
        Err(SyncError::Cancelled)
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::client::fake::{Call, FakeCollection};
    use crate::sync::OperationPhase;

    fn seeded() -> Arc<FakeCollection> {
        Arc::new(FakeCollection::with_records(vec![
            Record::new(1, "Pele", "Brazil"),
            Record::new(2, "Maradona", "Argentina"),
            Record::new(3, "Cruyff", "Netherlands"),
        ]))
    }

    async fn loaded(fake: &Arc<FakeCollection>) -> SyncController {
        let controller = SyncController::new(fake.clone());
        controller.load().await.unwrap();
        controller
    }

    async fn settled(controller: &SyncController) -> SyncView {
        let mut rx = controller.subscribe();
        let view = rx.wait_for(|v| !v.is_busy()).await.unwrap().clone();
        view
    }

    #[tokio::test]
    async fn test_load_installs_server_order() {
        let fake = seeded();
        let controller = SyncController::new(fake.clone());

        let records = controller.load().await.unwrap();
        assert_eq!(records, fake.records());

        let view = controller.view();
        assert_eq!(view.records, fake.records());
        assert_eq!(view.phase(Operation::Load), &OperationPhase::Succeeded);
        assert!(!view.is_busy());
        assert!(view.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn test_repeated_load_is_idempotent() {
        let fake = seeded();
        let controller = SyncController::new(fake.clone());

        let first = controller.load().await.unwrap();
        let second = controller.load().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fake.calls(Call::Load), 2);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_stale_list() {
        let fake = seeded();
        let controller = loaded(&fake).await;
        let before = controller.records();

        fake.fail_next(Call::Load, SyncError::Network("connection refused".into()));
        let err = controller.load().await.unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));

        let view = controller.flush().await.unwrap();
        assert_eq!(view.records, before);
        assert!(matches!(view.load, OperationPhase::Failed { .. }));
        assert_eq!(view.last_error.unwrap().kind, "network");
    }

    #[tokio::test]
    async fn test_add_appends_server_record() {
        let fake = Arc::new(FakeCollection::default());
        let controller = loaded(&fake).await;

        let record = controller.add(Draft::new("Pele", "Brazil")).await.unwrap();
        let view = controller.flush().await.unwrap();

        assert_eq!(view.records.len(), 1);
        assert_eq!(view.records.last(), Some(&record));
        assert_eq!(view.add, OperationPhase::Succeeded);
    }

    #[tokio::test]
    async fn test_add_with_empty_name_skips_network() {
        let fake = seeded();
        let controller = loaded(&fake).await;
        let before = controller.records();

        let err = controller.add(Draft::new("", "Brazil")).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidDraft(_)));
        assert_eq!(fake.calls(Call::Create), 0);

        let view = controller.flush().await.unwrap();
        assert_eq!(view.records, before);
        assert_eq!(view.last_error.unwrap().kind, "invalid_draft");
    }

    #[tokio::test]
    async fn test_failed_add_leaves_list_untouched() {
        let fake = seeded();
        let controller = loaded(&fake).await;
        let before = controller.view();

        fake.fail_next(Call::Create, SyncError::Network("reset by peer".into()));
        let err = controller.add(Draft::new("Pele", "Brazil")).await.unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));

        let view = controller.flush().await.unwrap();
        assert_eq!(view.records, before.records);
        assert_eq!(view.version, before.version);
        assert!(matches!(view.add, OperationPhase::Failed { .. }));
    }

    #[tokio::test]
    async fn test_remove_excises_only_target() {
        let fake = seeded();
        let controller = loaded(&fake).await;

        controller.remove(&RecordId::Number(1)).await.unwrap();
        let view = controller.flush().await.unwrap();

        let ids: Vec<_> = view.records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![RecordId::Number(2), RecordId::Number(3)]);
        assert_eq!(view.remove, OperationPhase::Succeeded);
    }

    #[tokio::test]
    async fn test_remove_absent_id_is_not_found() {
        let fake = seeded();
        let controller = loaded(&fake).await;
        let before = controller.records();

        let err = controller.remove(&RecordId::Number(99)).await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(RecordId::Number(99))));
        assert_eq!(fake.calls(Call::Remove), 0);

        let view = controller.flush().await.unwrap();
        assert_eq!(view.records, before);
    }

    #[tokio::test]
    async fn test_failed_remove_keeps_record() {
        let fake = seeded();
        let controller = loaded(&fake).await;

        fake.fail_next(Call::Remove, SyncError::NotFound(RecordId::Number(2)));
        let err = controller.remove(&RecordId::Number(2)).await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));

        let view = controller.flush().await.unwrap();
        assert_eq!(view.records.len(), 3);
        assert!(matches!(view.remove, OperationPhase::Failed { .. }));
    }

    #[tokio::test]
    async fn test_slow_load_does_not_drop_confirmed_add() {
        let fake = seeded();
        let controller = loaded(&fake).await;

        let release = fake.gate_next(Call::Load);
        let load = controller.spawn_load();
        while fake.calls(Call::Load) < 2 {
            tokio::task::yield_now().await;
        }

        let added = controller.add(Draft::new("Zidane", "France")).await.unwrap();
        release.send(()).unwrap();

        let installed = load.await.unwrap().unwrap();
        assert_eq!(installed.len(), 4);
        assert_eq!(installed.last(), Some(&added));
    }

    #[tokio::test]
    async fn test_completion_after_dispose_is_discarded() {
        let fake = seeded();
        let controller = loaded(&fake).await;
        let before = controller.records();

        let release = fake.gate_next(Call::Create);
        let add = controller.spawn_add(Draft::new("Zidane", "France"));
        while fake.calls(Call::Create) < 1 {
            tokio::task::yield_now().await;
        }

        controller.dispose();
        release.send(()).unwrap();

        let err = add.await.unwrap().unwrap_err();
        assert!(matches!(err, SyncError::Disposed));
        assert_eq!(controller.records(), before);
        assert!(matches!(
            controller.load().await.unwrap_err(),
            SyncError::Disposed
        ));
    }

    #[tokio::test]
    async fn test_create_ack_after_fresh_load_keeps_single_copy() {
        let fake = seeded();
        let controller = loaded(&fake).await;

        let release = fake.hold_next(Call::Create);
        let add = controller.spawn_add(Draft::new("Zidane", "France"));
        while fake.records().len() < 4 {
            tokio::task::yield_now().await;
        }

        // The read lands after the commit but before the create's response
        let installed = controller.load().await.unwrap();
        assert_eq!(installed.len(), 4);

        release.send(()).unwrap();
        let added = add.await.unwrap().unwrap();

        let view = controller.flush().await.unwrap();
        assert_eq!(view.records, fake.records());
        assert_eq!(
            view.records.iter().filter(|r| r.id == added.id).count(),
            1
        );
        assert_eq!(view.add, OperationPhase::Succeeded);
    }

    #[tokio::test]
    async fn test_remove_ack_after_fresh_load() {
        let fake = seeded();
        let controller = loaded(&fake).await;

        let release = fake.hold_next(Call::Remove);
        let remove = controller.spawn_remove(RecordId::Number(1));
        while fake.records().len() > 2 {
            tokio::task::yield_now().await;
        }

        let installed = controller.load().await.unwrap();
        assert_eq!(installed.len(), 2);

        release.send(()).unwrap();
        remove.await.unwrap().unwrap();

        let view = controller.flush().await.unwrap();
        assert_eq!(view.records, fake.records());
        assert_eq!(view.remove, OperationPhase::Succeeded);
    }

    #[tokio::test]
    async fn test_abandoned_load_still_settles() {
        let fake = seeded();
        let controller = loaded(&fake).await;

        let release = fake.gate_next(Call::Load);
        let waited = tokio::time::timeout(Duration::from_millis(20), controller.load()).await;
        assert!(waited.is_err());
        assert_eq!(controller.view().load, OperationPhase::InFlight);

        release.send(()).unwrap();
        let view = settled(&controller).await;
        assert_eq!(view.load, OperationPhase::Succeeded);

        controller.add(Draft::new("Zidane", "France")).await.unwrap();
        controller.load().await.unwrap();
        let view = controller.flush().await.unwrap();
        assert_eq!(view.load, OperationPhase::Succeeded);
        assert_eq!(view.records.len(), 4);
    }

    #[tokio::test]
    async fn test_abandoned_add_is_still_applied() {
        let fake = seeded();
        let controller = loaded(&fake).await;

        let release = fake.gate_next(Call::Create);
        let waited = tokio::time::timeout(
            Duration::from_millis(20),
            controller.add(Draft::new("Zidane", "France")),
        )
        .await;
        assert!(waited.is_err());

        release.send(()).unwrap();
        let view = settled(&controller).await;
        assert_eq!(view.add, OperationPhase::Succeeded);
        assert_eq!(view.records, fake.records());
        assert_eq!(view.records.len(), 4);
    }
}
