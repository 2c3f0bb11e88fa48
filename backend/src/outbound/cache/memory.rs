//! Process-local calculation cache.
//!
//! Used when no Redis URL is configured and by integration tests. The status
//! map and the results map are independent; compare-and-set holds the status
//! lock for the whole read-compare-write.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::ports::{
    CalculationResultsStore, CalculationResultsStoreError, JobStatusStore, JobStatusStoreError,
};
use crate::domain::{CalculationResults, FieldId, JobStatus};

#[derive(Debug, Default)]
pub struct InMemoryCalculationCache {
    statuses: Mutex<HashMap<FieldId, JobStatus>>,
    results: Mutex<HashMap<FieldId, CalculationResults>>,
}

impl InMemoryCalculationCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn statuses(&self) -> MutexGuard<'_, HashMap<FieldId, JobStatus>> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn results(&self) -> MutexGuard<'_, HashMap<FieldId, CalculationResults>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn write(map: &mut HashMap<FieldId, JobStatus>, field_id: &FieldId, status: JobStatus) {
    if status == JobStatus::None {
        map.remove(field_id);
    } else {
        map.insert(*field_id, status);
    }
}

#[async_trait]
impl JobStatusStore for InMemoryCalculationCache {
    async fn get(&self, field_id: &FieldId) -> Result<JobStatus, JobStatusStoreError> {
        Ok(self.statuses().get(field_id).copied().unwrap_or_default())
    }

    async fn set(&self, field_id: &FieldId, status: JobStatus) -> Result<(), JobStatusStoreError> {
        write(&mut self.statuses(), field_id, status);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        field_id: &FieldId,
        expected: JobStatus,
        new: JobStatus,
    ) -> Result<bool, JobStatusStoreError> {
        let mut statuses = self.statuses();
        let current = statuses.get(field_id).copied().unwrap_or_default();
        if current != expected {
            return Ok(false);
        }
        write(&mut statuses, field_id, new);
        Ok(true)
    }
}

#[async_trait]
impl CalculationResultsStore for InMemoryCalculationCache {
    async fn get(
        &self,
        field_id: &FieldId,
    ) -> Result<Option<CalculationResults>, CalculationResultsStoreError> {
        Ok(self.results().get(field_id).cloned())
    }

    async fn put(
        &self,
        field_id: &FieldId,
        results: &CalculationResults,
    ) -> Result<(), CalculationResultsStoreError> {
        self.results().insert(*field_id, results.clone());
        Ok(())
    }
}
