//! Saving fields.
//!
//! Serviceability is derived from the location on every save, and every save
//! asks for a recomputation because any agronomic input may have changed.

use std::sync::Arc;

use tracing::info;

use crate::domain::ports::{CoverageMap, FieldRepository};
use crate::domain::{CalculationDispatcher, DispatchOutcome, DomainError, Field};

#[derive(Clone)]
pub struct FieldService {
    fields: Arc<dyn FieldRepository>,
    coverage: Arc<dyn CoverageMap>,
    dispatcher: CalculationDispatcher,
}

impl FieldService {
    pub fn new(
        fields: Arc<dyn FieldRepository>,
        coverage: Arc<dyn CoverageMap>,
        dispatcher: CalculationDispatcher,
    ) -> Self {
        Self {
            fields,
            coverage,
            dispatcher,
        }
    }

    /// Validate, store and dispatch. Returns the field as stored.
    pub async fn save_field(
        &self,
        mut field: Field,
    ) -> Result<(Field, DispatchOutcome), DomainError> {
        field.validate()?;
        field.in_covered_area = self.coverage.covers(&field.location);
        self.fields.save(&field).await?;
        info!(
            field_id = %field.id,
            owner = %field.owner,
            serviceable = field.in_covered_area,
            "field saved"
        );
        let outcome = self.dispatcher.request_recompute_for(&field).await?;
        Ok((field, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::field::fixtures::field;
    use crate::domain::ports::{
        FieldRepositoryError, MockCalculationQueue, MockCoverageMap, MockFieldRepository,
        MockJobStatusStore,
    };
    use crate::domain::{ErrorCode, JobStatus};
    use mockall::predicate::eq;

    fn coverage(covers: bool) -> MockCoverageMap {
        let mut coverage = MockCoverageMap::new();
        coverage.expect_covers().return_const(covers);
        coverage
    }

    #[tokio::test]
    async fn uncovered_location_is_stored_as_not_serviceable() {
        let field = field();
        let field_id = field.id;
        let mut fields = MockFieldRepository::new();
        fields
            .expect_save()
            .withf(|f| !f.in_covered_area)
            .times(1)
            .return_once(|_| Ok(()));
        let mut status = MockJobStatusStore::new();
        status
            .expect_set()
            .with(eq(field_id), eq(JobStatus::Done))
            .times(1)
            .return_once(|_, _| Ok(()));
        let fields = Arc::new(fields);
        let dispatcher = CalculationDispatcher::new(
            Arc::new(status),
            Arc::new(MockCalculationQueue::new()),
            fields.clone(),
        );

        let (saved, outcome) = FieldService::new(fields, Arc::new(coverage(false)), dispatcher)
            .save_field(field)
            .await
            .expect("save");

        assert!(!saved.in_covered_area);
        assert_eq!(outcome, DispatchOutcome::NotServiceable);
    }

    #[tokio::test]
    async fn covered_field_is_queued_after_save() {
        let mut field = field();
        field.in_covered_area = false;
        let field_id = field.id;
        let mut fields = MockFieldRepository::new();
        fields.expect_save().times(1).return_once(|_| Ok(()));
        let mut status = MockJobStatusStore::new();
        status.expect_get().return_once(|_| Ok(JobStatus::None));
        status
            .expect_compare_and_set()
            .return_once(|_, _, _| Ok(true));
        let mut queue = MockCalculationQueue::new();
        queue
            .expect_submit()
            .with(eq(field_id))
            .times(1)
            .return_once(|_| Ok(()));
        let fields = Arc::new(fields);
        let dispatcher = CalculationDispatcher::new(Arc::new(status), Arc::new(queue), fields.clone());

        let (saved, outcome) = FieldService::new(fields, Arc::new(coverage(true)), dispatcher)
            .save_field(field)
            .await
            .expect("save");

        assert!(saved.in_covered_area);
        assert_eq!(outcome, DispatchOutcome::Submitted);
    }

    #[tokio::test]
    async fn invalid_field_is_not_stored() {
        let mut field = field();
        field.name = "  ".to_owned();
        let mut fields = MockFieldRepository::new();
        fields.expect_save().never();
        let fields = Arc::new(fields);
        let dispatcher = CalculationDispatcher::new(
            Arc::new(MockJobStatusStore::new()),
            Arc::new(MockCalculationQueue::new()),
            fields.clone(),
        );

        let err = FieldService::new(fields, Arc::new(MockCoverageMap::new()), dispatcher)
            .save_field(field)
            .await
            .expect_err("invalid");

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn missing_crop_type_is_invalid_request() {
        let mut fields = MockFieldRepository::new();
        fields
            .expect_save()
            .return_once(|_| Err(FieldRepositoryError::missing_reference("crop type 9")));
        let fields = Arc::new(fields);
        let dispatcher = CalculationDispatcher::new(
            Arc::new(MockJobStatusStore::new()),
            Arc::new(MockCalculationQueue::new()),
            fields.clone(),
        );

        let err = FieldService::new(fields, Arc::new(coverage(true)), dispatcher)
            .save_field(field())
            .await
            .expect_err("missing reference");

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }
}
