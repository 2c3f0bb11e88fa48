//! Decides whether a field's recommendation must be recomputed.
//!
//! Every mutation of a field or of its irrigation records calls
//! [`CalculationDispatcher::request_recompute`]. The dispatcher only touches
//! the status store and the queue; it never waits for the simulation.
//!
//! At most one job per field is pending at any time: the move to `Queued`
//! is a compare-and-set against the status that was read, and a field that
//! is already `Queued` is left alone.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::domain::ports::{CalculationQueue, FieldRepository, JobStatusStore};
use crate::domain::{DomainError, Field, FieldId, JobStatus};

/// Compare-and-set attempts before giving up on a contended status key.
const MAX_CAS_ATTEMPTS: usize = 3;

/// What a recompute request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Field is outside the serviceable area; status set to `Done`.
    NotServiceable,
    /// A job is already pending; nothing submitted.
    AlreadyQueued,
    /// Status moved to `Queued` and a job was submitted.
    Submitted,
}

/// Coordinates the status store and the calculation queue.
#[derive(Clone)]
pub struct CalculationDispatcher {
    status: Arc<dyn JobStatusStore>,
    queue: Arc<dyn CalculationQueue>,
    fields: Arc<dyn FieldRepository>,
}

impl CalculationDispatcher {
    pub fn new(
        status: Arc<dyn JobStatusStore>,
        queue: Arc<dyn CalculationQueue>,
        fields: Arc<dyn FieldRepository>,
    ) -> Self {
        Self {
            status,
            queue,
            fields,
        }
    }

    /// Load the field and dispatch. Fails with `NotFound` for unknown ids.
    pub async fn request_recompute(
        &self,
        field_id: &FieldId,
    ) -> Result<DispatchOutcome, DomainError> {
        let field = self
            .fields
            .find_by_id(field_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found("field not found")
                    .with_details(json!({ "fieldId": field_id }))
            })?;
        self.request_recompute_for(&field).await
    }

    /// Dispatch for a field the caller already holds.
    pub async fn request_recompute_for(
        &self,
        field: &Field,
    ) -> Result<DispatchOutcome, DomainError> {
        if !field.is_serviceable() {
            self.status.set(&field.id, JobStatus::Done).await?;
            debug!(field_id = %field.id, "field outside covered area; marked done");
            return Ok(DispatchOutcome::NotServiceable);
        }

        for _ in 0..MAX_CAS_ATTEMPTS {
            let current = self.status.get(&field.id).await?;
            if !current.accepts_new_job() {
                debug!(field_id = %field.id, "calculation already queued");
                return Ok(DispatchOutcome::AlreadyQueued);
            }
            if !self
                .status
                .compare_and_set(&field.id, current, JobStatus::Queued)
                .await?
            {
                continue;
            }

            if let Err(err) = self.queue.submit(field.id).await {
                self.roll_back(&field.id, current).await;
                return Err(err.into());
            }
            debug!(field_id = %field.id, previous = %current, "calculation queued");
            return Ok(DispatchOutcome::Submitted);
        }

        Err(DomainError::conflict("calculation status changed concurrently")
            .with_details(json!({ "fieldId": field.id, "attempts": MAX_CAS_ATTEMPTS })))
    }

    /// Current status, for polling clients.
    pub async fn status(&self, field_id: &FieldId) -> Result<JobStatus, DomainError> {
        Ok(self.status.get(field_id).await?)
    }

    async fn roll_back(&self, field_id: &FieldId, previous: JobStatus) {
        match self
            .status
            .compare_and_set(field_id, JobStatus::Queued, previous)
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(%field_id, "status changed before rollback; leaving it"),
            Err(err) => warn!(%field_id, error = %err, "failed to roll back queued status"),
        }
    }
}

#[cfg(test)]
#[path = "calculation_dispatcher_tests.rs"]
mod tests;
