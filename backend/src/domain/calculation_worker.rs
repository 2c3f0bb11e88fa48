//! Executes one recomputation job for a field.
//!
//! Status lifecycle driven here: `Queued` to `Processing` on start, then
//! `Done` once the results are stored, or `Failed` when anything on the way
//! errors. Every transition is a compare-and-set, so a job re-queued while
//! this one ran keeps its `Queued` status. Results are only published while
//! the job still owns `Processing`; the pool runs one job per field at a
//! time, so no other job can take ownership between the check and the put.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::ports::{
    CalculationResultsStore, FieldRepository, IrrigationRepository, JobStatusStore,
    SoilWaterModel,
};
use crate::domain::{DomainError, FieldId, JobStatus, SimulationInput};

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Results stored and status moved to `Done`.
    Completed,
    /// A newer job was queued while the model ran; results discarded.
    Superseded,
    /// Status was no longer `Queued` when the job started; nothing ran.
    Skipped,
    /// Field is outside the serviceable area; no simulation ran.
    NotServiceable,
    /// Field no longer exists; status reset to `None`.
    FieldMissing,
}

/// Ports the worker needs, grouped to keep construction readable.
#[derive(Clone)]
pub struct CalculationWorkerPorts {
    pub status: Arc<dyn JobStatusStore>,
    pub fields: Arc<dyn FieldRepository>,
    pub irrigations: Arc<dyn IrrigationRepository>,
    pub model: Arc<dyn SoilWaterModel>,
    pub results: Arc<dyn CalculationResultsStore>,
}

/// Runs the soil water model for a field and publishes the results.
#[derive(Clone)]
pub struct CalculationWorker {
    ports: CalculationWorkerPorts,
}

impl CalculationWorker {
    pub fn new(ports: CalculationWorkerPorts) -> Self {
        Self { ports }
    }

    pub async fn process(&self, field_id: FieldId) -> Result<JobOutcome, DomainError> {
        if !self
            .ports
            .status
            .compare_and_set(&field_id, JobStatus::Queued, JobStatus::Processing)
            .await?
        {
            debug!(%field_id, "calculation no longer queued; skipping job");
            return Ok(JobOutcome::Skipped);
        }
        match self.execute(field_id).await {
            Ok(outcome) => {
                info!(%field_id, ?outcome, "calculation job finished");
                Ok(outcome)
            }
            Err(err) => {
                error!(%field_id, error = %err, "calculation job failed");
                self.finish(&field_id, JobStatus::Failed).await;
                Err(err)
            }
        }
    }

    async fn execute(&self, field_id: FieldId) -> Result<JobOutcome, DomainError> {
        let Some(field) = self.ports.fields.find_by_id(&field_id).await? else {
            warn!(%field_id, "field vanished before its calculation ran");
            self.finish(&field_id, JobStatus::None).await;
            return Ok(JobOutcome::FieldMissing);
        };

        if !field.is_serviceable() {
            self.finish(&field_id, JobStatus::Done).await;
            return Ok(JobOutcome::NotServiceable);
        }

        let irrigations = self.ports.irrigations.list_for_field(&field_id).await?;
        let input = SimulationInput::new(&field, &irrigations);
        debug!(%field_id, irrigations = input.irrigations.len(), "running soil water model");
        let results = self.ports.model.run(&input).await?;

        if self.ports.status.get(&field_id).await? != JobStatus::Processing {
            debug!(%field_id, "field re-queued during calculation; discarding results");
            return Ok(JobOutcome::Superseded);
        }
        self.ports.results.put(&field_id, &results).await?;

        if self.finish(&field_id, JobStatus::Done).await {
            Ok(JobOutcome::Completed)
        } else {
            Ok(JobOutcome::Superseded)
        }
    }

    /// Move `Processing` to `terminal`. Returns whether the write happened.
    async fn finish(&self, field_id: &FieldId, terminal: JobStatus) -> bool {
        match self
            .ports
            .status
            .compare_and_set(field_id, JobStatus::Processing, terminal)
            .await
        {
            Ok(swapped) => {
                if !swapped {
                    debug!(%field_id, %terminal, "status changed during calculation; not overwriting");
                }
                swapped
            }
            Err(err) => {
                warn!(%field_id, %terminal, error = %err, "failed to record calculation status");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::field::fixtures::field;
    use crate::domain::ports::{
        MockCalculationResultsStore, MockFieldRepository, MockIrrigationRepository,
        MockJobStatusStore, MockSoilWaterModel, SoilWaterModelError,
    };
    use crate::domain::{CalculationResults, ErrorCode};
    use chrono::{NaiveDate, Utc};
    use mockall::predicate::{always, eq};

    struct Mocks {
        status: MockJobStatusStore,
        fields: MockFieldRepository,
        irrigations: MockIrrigationRepository,
        model: MockSoilWaterModel,
        results: MockCalculationResultsStore,
    }

    impl Mocks {
        /// Mocks for a job that successfully claims the field.
        fn new() -> Self {
            let mut status = MockJobStatusStore::new();
            status
                .expect_compare_and_set()
                .with(always(), eq(JobStatus::Queued), eq(JobStatus::Processing))
                .times(1)
                .returning(|_, _, _| Ok(true));
            Self {
                status,
                fields: MockFieldRepository::new(),
                irrigations: MockIrrigationRepository::new(),
                model: MockSoilWaterModel::new(),
                results: MockCalculationResultsStore::new(),
            }
        }

        fn with_field(mut self, field: crate::domain::Field) -> Self {
            self.fields
                .expect_find_by_id()
                .return_once(move |_| Ok(Some(field)));
            self.irrigations
                .expect_list_for_field()
                .return_once(|_| Ok(Vec::new()));
            self
        }

        fn status_after_run(mut self, status: JobStatus) -> Self {
            self.status
                .expect_get()
                .times(1)
                .return_once(move |_| Ok(status));
            self
        }

        fn finishes_with(mut self, terminal: JobStatus, swapped: bool) -> Self {
            self.status
                .expect_compare_and_set()
                .with(always(), eq(JobStatus::Processing), eq(terminal))
                .times(1)
                .return_once(move |_, _, _| Ok(swapped));
            self
        }

        fn worker(self) -> CalculationWorker {
            CalculationWorker::new(CalculationWorkerPorts {
                status: Arc::new(self.status),
                fields: Arc::new(self.fields),
                irrigations: Arc::new(self.irrigations),
                model: Arc::new(self.model),
                results: Arc::new(self.results),
            })
        }
    }

    fn results() -> CalculationResults {
        CalculationResults {
            raw: 30.0,
            taw: 60.0,
            forecast_start_date: NaiveDate::from_ymd_opt(2024, 7, 3).expect("valid date"),
            days: Vec::new(),
            computed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn stores_results_and_marks_done() {
        let field = field();
        let field_id = field.id;
        let mut mocks = Mocks::new()
            .with_field(field)
            .status_after_run(JobStatus::Processing)
            .finishes_with(JobStatus::Done, true);
        mocks
            .model
            .expect_run()
            .withf(move |input| input.field_id == field_id)
            .return_once(|_| Ok(results()));
        mocks
            .results
            .expect_put()
            .with(eq(field_id), always())
            .times(1)
            .return_once(|_, _| Ok(()));

        let outcome = mocks.worker().process(field_id).await.expect("job runs");
        assert_eq!(outcome, JobOutcome::Completed);
    }

    #[tokio::test]
    async fn requeued_job_discards_its_results() {
        let field = field();
        let field_id = field.id;
        let mut mocks = Mocks::new()
            .with_field(field)
            .status_after_run(JobStatus::Queued);
        mocks.model.expect_run().return_once(|_| Ok(results()));
        mocks.results.expect_put().never();

        let outcome = mocks.worker().process(field_id).await.expect("job runs");
        assert_eq!(outcome, JobOutcome::Superseded);
    }

    #[tokio::test]
    async fn requeue_between_put_and_finish_keeps_queued() {
        let field = field();
        let field_id = field.id;
        let mut mocks = Mocks::new()
            .with_field(field)
            .status_after_run(JobStatus::Processing)
            .finishes_with(JobStatus::Done, false);
        mocks.model.expect_run().return_once(|_| Ok(results()));
        mocks.results.expect_put().times(1).return_once(|_, _| Ok(()));

        let outcome = mocks.worker().process(field_id).await.expect("job runs");
        assert_eq!(outcome, JobOutcome::Superseded);
    }

    #[tokio::test]
    async fn job_not_queued_is_skipped() {
        let field_id = FieldId::random();
        let mut status = MockJobStatusStore::new();
        status
            .expect_compare_and_set()
            .with(eq(field_id), eq(JobStatus::Queued), eq(JobStatus::Processing))
            .times(1)
            .return_once(|_, _, _| Ok(false));
        let mut mocks = Mocks {
            status,
            fields: MockFieldRepository::new(),
            irrigations: MockIrrigationRepository::new(),
            model: MockSoilWaterModel::new(),
            results: MockCalculationResultsStore::new(),
        };
        mocks.fields.expect_find_by_id().never();
        mocks.model.expect_run().never();

        let outcome = mocks.worker().process(field_id).await.expect("job runs");
        assert_eq!(outcome, JobOutcome::Skipped);
    }

    #[tokio::test]
    async fn model_failure_marks_failed() {
        let field = field();
        let field_id = field.id;
        let mut mocks = Mocks::new()
            .with_field(field)
            .finishes_with(JobStatus::Failed, true);
        mocks
            .model
            .expect_run()
            .return_once(|_| Err(SoilWaterModelError::execution("diverged")));
        mocks.results.expect_put().never();

        let err = mocks.worker().process(field_id).await.expect_err("fails");
        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[tokio::test]
    async fn uncovered_field_skips_the_model() {
        let mut field = field();
        field.in_covered_area = false;
        let field_id = field.id;
        let mut mocks = Mocks::new().finishes_with(JobStatus::Done, true);
        mocks
            .fields
            .expect_find_by_id()
            .return_once(move |_| Ok(Some(field)));
        mocks.model.expect_run().never();

        let outcome = mocks.worker().process(field_id).await.expect("job runs");
        assert_eq!(outcome, JobOutcome::NotServiceable);
    }

    #[tokio::test]
    async fn missing_field_resets_status() {
        let field_id = FieldId::random();
        let mut mocks = Mocks::new().finishes_with(JobStatus::None, true);
        mocks.fields.expect_find_by_id().return_once(|_| Ok(None));

        let outcome = mocks.worker().process(field_id).await.expect("job runs");
        assert_eq!(outcome, JobOutcome::FieldMissing);
    }
}
