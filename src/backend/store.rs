//! In-memory record store for the mock backend

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::record::{Draft, Record, RecordId};

/// Shared, ordered record storage with sequential numeric ids
#[derive(Clone, Default)]
pub struct CollectionStore {
    inner: Arc<RwLock<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    records: Vec<Record>,
    next_id: u64,
}

impl CollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `records`; new ids continue after the
    /// highest numeric id present
    pub fn with_records(records: Vec<Record>) -> Self {
        let highest = records
            .iter()
            .filter_map(|r| match r.id {
                RecordId::Number(n) => Some(n),
                RecordId::Text(_) => None,
            })
            .max()
            .unwrap_or(0);

        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                records,
                next_id: highest + 1,
            })),
        }
    }

    /// A small demo roster
    pub fn seeded() -> Self {
        Self::with_records(vec![
            Record::new(1, "Pele", "Brazil"),
            Record::new(2, "Diego Maradona", "Argentina"),
            Record::new(3, "Johan Cruyff", "Netherlands"),
        ])
    }

    pub async fn list(&self) -> Vec<Record> {
        self.inner.read().await.records.clone()
    }

    pub async fn create(&self, draft: &Draft) -> Result<Record, ApiError> {
        draft
            .validate()
            .map_err(|e| ApiError::Unprocessable(e.to_string()))?;
        let draft = draft.trimmed();

        let mut inner = self.inner.write().await;
        let id = inner.next_id.max(1);
        inner.next_id = id + 1;

        let record = Record::new(id, &draft.name, &draft.country);
        inner.records.push(record.clone());
        Ok(record)
    }

    pub async fn remove(&self, id: &RecordId) -> Result<(), ApiError> {
        let mut inner = self.inner.write().await;
        let before = inner.records.len();
        inner.records.retain(|r| &r.id != id);
        if inner.records.len() == before {
            return Err(ApiError::NotFound(format!("No record with id {}", id)));
        }
        Ok(())
    }
}
