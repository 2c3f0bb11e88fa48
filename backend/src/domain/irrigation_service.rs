//! Owner-facing create, update and delete of applied irrigations.
//!
//! Each successful mutation requests a recomputation for the field the
//! record belongs to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;

use crate::domain::ports::{FieldRepository, IrrigationRepository};
use crate::domain::{
    AppliedIrrigation, CalculationDispatcher, DomainError, Field, FieldId, IrrigationId,
    IrrigationMeasurement, ManualIrrigation,
};

/// Replacement values for an existing record.
#[derive(Debug, Clone, PartialEq)]
pub struct IrrigationUpdate {
    pub timestamp: DateTime<Utc>,
    pub measurement: IrrigationMeasurement,
}

#[derive(Clone)]
pub struct IrrigationService {
    fields: Arc<dyn FieldRepository>,
    irrigations: Arc<dyn IrrigationRepository>,
    dispatcher: CalculationDispatcher,
}

fn irrigation_not_found(id: &IrrigationId) -> DomainError {
    DomainError::not_found("irrigation not found").with_details(json!({ "irrigationId": id }))
}

impl IrrigationService {
    pub fn new(
        fields: Arc<dyn FieldRepository>,
        irrigations: Arc<dyn IrrigationRepository>,
        dispatcher: CalculationDispatcher,
    ) -> Self {
        Self {
            fields,
            irrigations,
            dispatcher,
        }
    }

    async fn field(&self, field_id: &FieldId) -> Result<Field, DomainError> {
        self.fields.find_by_id(field_id).await?.ok_or_else(|| {
            DomainError::not_found("field not found").with_details(json!({ "fieldId": field_id }))
        })
    }

    pub async fn record(
        &self,
        irrigation: ManualIrrigation,
    ) -> Result<AppliedIrrigation, DomainError> {
        irrigation.validate()?;
        let field = self.field(&irrigation.field_id).await?;
        let stored = self.irrigations.insert_manual(&irrigation).await?;
        info!(
            field_id = %field.id,
            irrigation_id = %stored.id,
            kind = %stored.kind(),
            "irrigation recorded"
        );
        self.dispatcher.request_recompute_for(&field).await?;
        Ok(stored)
    }

    /// Replace the timestamp and measurement of a record. Automatic records
    /// keep their origin flag.
    pub async fn update(
        &self,
        id: &IrrigationId,
        update: IrrigationUpdate,
    ) -> Result<AppliedIrrigation, DomainError> {
        update.measurement.validate()?;
        let mut record = self
            .irrigations
            .find_by_id(id)
            .await?
            .ok_or_else(|| irrigation_not_found(id))?;
        record.timestamp = update.timestamp;
        record.measurement = update.measurement;
        if !self.irrigations.update(&record).await? {
            return Err(irrigation_not_found(id));
        }
        info!(field_id = %record.field_id, irrigation_id = %id, "irrigation updated");
        self.dispatcher.request_recompute(&record.field_id).await?;
        Ok(record)
    }

    pub async fn delete(&self, id: &IrrigationId) -> Result<AppliedIrrigation, DomainError> {
        let removed = self
            .irrigations
            .delete(id)
            .await?
            .ok_or_else(|| irrigation_not_found(id))?;
        info!(field_id = %removed.field_id, irrigation_id = %id, "irrigation deleted");
        self.dispatcher.request_recompute(&removed.field_id).await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::field::fixtures::field;
    use crate::domain::ports::{
        IrrigationRepositoryError, MockCalculationQueue, MockFieldRepository,
        MockIrrigationRepository, MockJobStatusStore,
    };
    use crate::domain::{ErrorCode, JobStatus};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0)
            .single()
            .expect("valid time")
    }

    fn volume(v: f64) -> IrrigationMeasurement {
        IrrigationMeasurement::Volume { volume: Some(v) }
    }

    /// Fields mock knowing `field`, and a dispatcher that submits once.
    fn wiring(field: Field, submits: usize) -> (Arc<MockFieldRepository>, CalculationDispatcher) {
        let mut fields = MockFieldRepository::new();
        fields
            .expect_find_by_id()
            .returning(move |_| Ok(Some(field.clone())));
        let mut status = MockJobStatusStore::new();
        status.expect_get().returning(|_| Ok(JobStatus::Done));
        status
            .expect_compare_and_set()
            .returning(|_, _, _| Ok(true));
        let mut queue = MockCalculationQueue::new();
        queue.expect_submit().times(submits).returning(|_| Ok(()));
        let fields = Arc::new(fields);
        let dispatcher = CalculationDispatcher::new(Arc::new(status), Arc::new(queue), fields.clone());
        (fields, dispatcher)
    }

    fn stored(field_id: FieldId, measurement: IrrigationMeasurement) -> AppliedIrrigation {
        AppliedIrrigation {
            id: IrrigationId::random(),
            field_id,
            timestamp: at(6),
            measurement,
            is_automatic: false,
        }
    }

    #[tokio::test]
    async fn recording_stores_and_dispatches() {
        let field = field();
        let field_id = field.id;
        let (fields, dispatcher) = wiring(field, 1);
        let mut irrigations = MockIrrigationRepository::new();
        irrigations
            .expect_insert_manual()
            .times(1)
            .returning(move |m| Ok(stored(m.field_id, m.measurement)));

        let record = IrrigationService::new(fields, Arc::new(irrigations), dispatcher)
            .record(ManualIrrigation {
                field_id,
                timestamp: at(6),
                measurement: volume(12.0),
            })
            .await
            .expect("record");

        assert_eq!(record.volume(), Some(12.0));
    }

    #[tokio::test]
    async fn incomplete_record_is_rejected_before_storage() {
        let field = field();
        let field_id = field.id;
        let (fields, dispatcher) = wiring(field, 0);
        let mut irrigations = MockIrrigationRepository::new();
        irrigations.expect_insert_manual().never();

        let err = IrrigationService::new(fields, Arc::new(irrigations), dispatcher)
            .record(ManualIrrigation {
                field_id,
                timestamp: at(6),
                measurement: IrrigationMeasurement::DurationFlow {
                    duration_minutes: Some(30),
                    flow_rate: None,
                },
            })
            .await
            .expect_err("invalid");

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn storage_duplicate_surfaces_as_invalid_request() {
        let field = field();
        let field_id = field.id;
        let (fields, dispatcher) = wiring(field, 0);
        let mut irrigations = MockIrrigationRepository::new();
        irrigations
            .expect_insert_manual()
            .return_once(|_| Err(IrrigationRepositoryError::duplicate("same instant")));

        let err = IrrigationService::new(fields, Arc::new(irrigations), dispatcher)
            .record(ManualIrrigation {
                field_id,
                timestamp: at(6),
                measurement: volume(1.0),
            })
            .await
            .expect_err("duplicate");

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn update_rewrites_measurement_and_dispatches() {
        let field = field();
        let existing = stored(field.id, volume(5.0));
        let id = existing.id;
        let (fields, dispatcher) = wiring(field, 1);
        let mut irrigations = MockIrrigationRepository::new();
        irrigations
            .expect_find_by_id()
            .return_once(move |_| Ok(Some(existing)));
        irrigations
            .expect_update()
            .withf(|r| r.volume() == Some(9.0) && r.timestamp == at(8))
            .return_once(|_| Ok(true));

        let updated = IrrigationService::new(fields, Arc::new(irrigations), dispatcher)
            .update(
                &id,
                IrrigationUpdate {
                    timestamp: at(8),
                    measurement: volume(9.0),
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.id, id);
    }

    #[tokio::test]
    async fn deleting_unknown_record_is_not_found() {
        let (fields, dispatcher) = wiring(field(), 0);
        let mut irrigations = MockIrrigationRepository::new();
        irrigations.expect_delete().return_once(|_| Ok(None));

        let err = IrrigationService::new(fields, Arc::new(irrigations), dispatcher)
            .delete(&IrrigationId::random())
            .await
            .expect_err("missing");

        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn deleting_dispatches_for_the_owning_field() {
        let field = field();
        let existing = stored(field.id, volume(5.0));
        let id = existing.id;
        let (fields, dispatcher) = wiring(field, 1);
        let mut irrigations = MockIrrigationRepository::new();
        irrigations
            .expect_delete()
            .return_once(move |_| Ok(Some(existing)));

        let removed = IrrigationService::new(fields, Arc::new(irrigations), dispatcher)
            .delete(&id)
            .await
            .expect("delete");

        assert_eq!(removed.id, id);
    }
}
