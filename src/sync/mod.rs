//! Collection synchronization
//!
//! Keeps a local, ordered list of records in step with the remote
//! collection. The list changes only on confirmed server outcomes, and all
//! changes go through a single writer task.

mod controller;
mod state;
mod view;
mod writer;

pub use controller::SyncController;
pub use state::LocalListState;
pub use view::{Failure, Operation, OperationPhase, SyncView};
