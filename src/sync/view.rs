//! View-facing sync state
//!
//! What a view layer renders: the current list, the phase of each operation
//! kind and the most recent failure.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::SyncError;
use crate::record::Record;

/// Operation kinds the controller runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Load,
    Add,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Load => "load",
            Operation::Add => "add",
            Operation::Remove => "remove",
        };
        f.write_str(name)
    }
}

/// Phase of one operation kind
///
/// `Succeeded` and `Failed` are terminal reports for the latest attempt;
/// a new dispatch moves the kind back to `InFlight`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum OperationPhase {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed { message: String },
}

impl OperationPhase {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, OperationPhase::InFlight)
    }
}

/// Failure surfaced to the view layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub operation: Operation,
    pub kind: &'static str,
    pub message: String,
}

impl Failure {
    pub fn new(operation: Operation, error: &SyncError) -> Self {
        Self {
            operation,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Snapshot published after every phase change or applied mutation
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncView {
    pub records: Vec<Record>,
    pub version: u64,
    pub load: OperationPhase,
    pub add: OperationPhase,
    pub remove: OperationPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<Failure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl SyncView {
    pub fn phase(&self, operation: Operation) -> &OperationPhase {
        match operation {
            Operation::Load => &self.load,
            Operation::Add => &self.add,
            Operation::Remove => &self.remove,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.load.is_in_flight() || self.add.is_in_flight() || self.remove.is_in_flight()
    }
}
