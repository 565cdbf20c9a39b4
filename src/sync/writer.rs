//! Single writer for the local list
//!
//! One task owns [`LocalListState`] and applies confirmed outcomes in the
//! order they arrive on its queue. Network calls run outside the writer, so
//! operations still overlap; only the mutations are serialized.
//!
//! A load records the write sequence number it was dispatched at. Mutations
//! confirmed after that point are journaled and replayed on top of the loaded
//! snapshot, so a slow read cannot drop a confirmed create or resurrect a
//! confirmed delete.

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};

use super::state::LocalListState;
use super::view::{Failure, Operation, OperationPhase, SyncView};
use crate::record::{Record, RecordId};

/// Messages accepted by the writer task
pub(crate) enum Command {
    /// A load is being dispatched; replies with the current write sequence
    BeginLoad { reply: oneshot::Sender<u64> },
    BeginAdd,
    /// Replies `false` when `id` is not in the list
    BeginRemove {
        id: RecordId,
        reply: oneshot::Sender<bool>,
    },
    Loaded {
        since: u64,
        records: Vec<Record>,
        reply: oneshot::Sender<Vec<Record>>,
    },
    LoadFailed { since: u64, failure: Failure },
    Created { record: Record },
    Removed { id: RecordId },
    /// Add/remove failure, or a rejection that never reached the network
    Failed { failure: Failure, dispatched: bool },
    /// Replies with the view once everything queued before it is applied
    Flush { reply: oneshot::Sender<SyncView> },
    Shutdown,
}

/// A confirmed mutation kept for replay over older load snapshots
#[derive(Debug, Clone)]
enum Mutation {
    Appended(Record),
    Removed(RecordId),
}

#[derive(Debug, Default)]
struct PhaseTracker {
    in_flight: usize,
    phase: OperationPhase,
}

impl PhaseTracker {
    fn begin(&mut self) {
        self.in_flight += 1;
        self.phase = OperationPhase::InFlight;
    }

    fn finish(&mut self, outcome: OperationPhase) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.phase = if self.in_flight > 0 {
            OperationPhase::InFlight
        } else {
            outcome
        };
    }

    /// Report a failure for an attempt that was never dispatched
    fn reject(&mut self, outcome: OperationPhase) {
        if self.in_flight == 0 {
            self.phase = outcome;
        }
    }
}

pub(crate) struct Writer {
    state: LocalListState,
    /// Count of confirmed creates and removes
    write_seq: u64,
    journal: Vec<(u64, Mutation)>,
    pending_loads: Vec<u64>,
    load: PhaseTracker,
    add: PhaseTracker,
    remove: PhaseTracker,
    last_error: Option<Failure>,
    last_synced_at: Option<chrono::DateTime<Utc>>,
    view: watch::Sender<SyncView>,
}

impl Writer {
    pub(crate) fn new(view: watch::Sender<SyncView>) -> Self {
        Self {
            state: LocalListState::new(),
            write_seq: 0,
            journal: Vec::new(),
            pending_loads: Vec::new(),
            load: PhaseTracker::default(),
            add: PhaseTracker::default(),
            remove: PhaseTracker::default(),
            last_error: None,
            last_synced_at: None,
            view,
        }
    }

    /// Drain the queue until shutdown or until every sender is gone
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Shutdown => {
                    tracing::debug!("Sync writer shutting down");
                    break;
                }
                Command::Flush { reply } => {
                    let _ = reply.send(self.view.borrow().clone());
                }
                command => {
                    let reply = self.handle(command);
                    self.publish();
                    if let Some(reply) = reply {
                        let _ = reply.send(self.state.snapshot());
                    }
                }
            }
        }
    }

    /// Apply one command
    ///
    /// A finished load hands back its reply so the caller can answer it once
    /// the new view is published.
    fn handle(&mut self, command: Command) -> Option<oneshot::Sender<Vec<Record>>> {
        match command {
            Command::BeginLoad { reply } => {
                let since = self.write_seq;
                self.pending_loads.push(since);
                self.load.begin();
                let _ = reply.send(since);
            }
            Command::BeginAdd => self.add.begin(),
            Command::BeginRemove { id, reply } => {
                let present = self.state.contains(&id);
                if present {
                    self.remove.begin();
                }
                let _ = reply.send(present);
            }
            Command::Loaded {
                since,
                records,
                reply,
            } => {
                let replayed = self.install_snapshot(since, records);
                if replayed > 0 {
                    tracing::info!(replayed, since, "Replayed confirmed writes over stale load");
                }
                self.finish_load(since);
                self.load.finish(OperationPhase::Succeeded);
                self.last_synced_at = Some(Utc::now());
                return Some(reply);
            }
            Command::LoadFailed { since, failure } => {
                self.finish_load(since);
                self.load.finish(OperationPhase::Failed {
                    message: failure.message.clone(),
                });
                self.last_error = Some(failure);
            }
            Command::Created { record } => {
                // A load that reached the server after the commit already has it
                if self.state.contains(&record.id) {
                    tracing::debug!(id = %record.id, "Created record already in list");
                } else {
                    self.state.append(record.clone());
                }
                self.journal_mutation(Mutation::Appended(record));
                self.add.finish(OperationPhase::Succeeded);
            }
            Command::Removed { id } => {
                self.state.remove_id(&id);
                self.journal_mutation(Mutation::Removed(id));
                self.remove.finish(OperationPhase::Succeeded);
            }
            Command::Failed {
                failure,
                dispatched,
            } => {
                let outcome = OperationPhase::Failed {
                    message: failure.message.clone(),
                };
                let tracker = match failure.operation {
                    Operation::Load => &mut self.load,
                    Operation::Add => &mut self.add,
                    Operation::Remove => &mut self.remove,
                };
                if dispatched {
                    tracker.finish(outcome);
                } else {
                    tracker.reject(outcome);
                }
                self.last_error = Some(failure);
            }
            Command::Flush { .. } | Command::Shutdown => {}
        }
        None
    }

    /// Replace the list with a loaded snapshot and replay newer writes
    ///
    /// Returns how many journaled mutations changed the snapshot.
    fn install_snapshot(&mut self, since: u64, records: Vec<Record>) -> usize {
        let mut next = LocalListState::new();
        next.replace_all(records);

        let mut replayed = 0;
        for (_, mutation) in self.journal.iter().filter(|(v, _)| *v > since) {
            match mutation {
                Mutation::Appended(record) => {
                    if !next.contains(&record.id) {
                        next.append(record.clone());
                        replayed += 1;
                    }
                }
                Mutation::Removed(id) => {
                    if next.remove_id(id) > 0 {
                        replayed += 1;
                    }
                }
            }
        }

        self.state.replace_all(next.snapshot());
        replayed
    }

    fn journal_mutation(&mut self, mutation: Mutation) {
        self.write_seq += 1;
        if !self.pending_loads.is_empty() {
            self.journal.push((self.write_seq, mutation));
        }
    }

    fn finish_load(&mut self, since: u64) {
        if let Some(pos) = self.pending_loads.iter().position(|v| *v == since) {
            self.pending_loads.swap_remove(pos);
        }
        match self.pending_loads.iter().min() {
            Some(&oldest) => self.journal.retain(|(v, _)| *v > oldest),
            None => self.journal.clear(),
        }
    }

    fn publish(&self) {
        let view = SyncView {
            records: self.state.snapshot(),
            version: self.state.version(),
            load: self.load.phase.clone(),
            add: self.add.phase.clone(),
            remove: self.remove.phase.clone(),
            last_error: self.last_error.clone(),
            last_synced_at: self.last_synced_at,
        };
        self.view.send_replace(view);
    }
}
