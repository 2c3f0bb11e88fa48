//! Pre-filled values for a new irrigation record, taken from history.
//!
//! Each measurement mode is looked up independently. A mode with no history
//! contributes nothing rather than zeros.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::ports::IrrigationRepository;
use crate::domain::{DomainError, FieldId, IrrigationKind, IrrigationMeasurement};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationDefaults {
    pub duration_minutes: Option<u32>,
    pub flow_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowmeterDefaults {
    /// End reading of the last flowmeter record.
    pub reading_start: Option<f64>,
    pub water_percentage: Option<u8>,
}

/// Suggested initial values.
///
/// `volume` is the outer `Option` for "no volume history" and the inner one
/// for a volume record that carried no value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrigationDefaults {
    pub kind: IrrigationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationDefaults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flowmeter: Option<FlowmeterDefaults>,
}

/// Reads irrigation history to build [`IrrigationDefaults`].
pub struct IrrigationDefaultsService<R: ?Sized> {
    irrigations: Arc<R>,
}

impl<R: ?Sized> Clone for IrrigationDefaultsService<R> {
    fn clone(&self) -> Self {
        Self {
            irrigations: Arc::clone(&self.irrigations),
        }
    }
}

impl<R: ?Sized> IrrigationDefaultsService<R> {
    pub fn new(irrigations: Arc<R>) -> Self {
        Self { irrigations }
    }
}

impl<R: IrrigationRepository + ?Sized> IrrigationDefaultsService<R> {
    async fn latest(
        &self,
        field_id: &FieldId,
        kind: Option<IrrigationKind>,
    ) -> Result<Option<IrrigationMeasurement>, DomainError> {
        Ok(self
            .irrigations
            .find_latest(field_id, kind)
            .await?
            .map(|record| record.measurement))
    }

    pub async fn get_defaults(&self, field_id: &FieldId) -> Result<IrrigationDefaults, DomainError> {
        let kind = self
            .latest(field_id, None)
            .await?
            .map_or(IrrigationKind::Volume, |m| m.kind());

        let volume = match self.latest(field_id, Some(IrrigationKind::Volume)).await? {
            Some(IrrigationMeasurement::Volume { volume }) => Some(volume),
            _ => None,
        };

        let duration = match self
            .latest(field_id, Some(IrrigationKind::DurationFlow))
            .await?
        {
            Some(IrrigationMeasurement::DurationFlow {
                duration_minutes,
                flow_rate,
            }) => Some(DurationDefaults {
                duration_minutes,
                flow_rate,
            }),
            _ => None,
        };

        let flowmeter = match self.latest(field_id, Some(IrrigationKind::Flowmeter)).await? {
            Some(IrrigationMeasurement::Flowmeter {
                reading_end,
                water_percentage,
                ..
            }) => Some(FlowmeterDefaults {
                reading_start: reading_end,
                water_percentage,
            }),
            _ => None,
        };

        Ok(IrrigationDefaults {
            kind,
            volume,
            duration,
            flowmeter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{IrrigationRepositoryError, MockIrrigationRepository};
    use crate::domain::{AppliedIrrigation, ErrorCode, IrrigationId};
    use chrono::{Duration, Utc};

    fn record(field_id: FieldId, age_hours: i64, measurement: IrrigationMeasurement) -> AppliedIrrigation {
        AppliedIrrigation {
            id: IrrigationId::random(),
            field_id,
            timestamp: Utc::now() - Duration::hours(age_hours),
            measurement,
            is_automatic: false,
        }
    }

    #[tokio::test]
    async fn empty_history_defaults_to_volume_without_values() {
        let mut repo = MockIrrigationRepository::new();
        repo.expect_find_latest().times(4).returning(|_, _| Ok(None));

        let service = IrrigationDefaultsService::new(Arc::new(repo));
        let defaults = service
            .get_defaults(&FieldId::random())
            .await
            .expect("defaults");

        assert_eq!(defaults.kind, IrrigationKind::Volume);
        assert_eq!(defaults.volume, None);
        assert_eq!(defaults.duration, None);
        assert_eq!(defaults.flowmeter, None);
        let json = serde_json::to_value(defaults).expect("serialise");
        assert_eq!(json, serde_json::json!({ "kind": "VOLUME_OF_WATER" }));
    }

    #[tokio::test]
    async fn duration_defaults_come_from_latest_duration_record() {
        let field_id = FieldId::random();
        let duration = record(
            field_id,
            5,
            IrrigationMeasurement::DurationFlow {
                duration_minutes: Some(45),
                flow_rate: Some(3.5),
            },
        );
        let mut repo = MockIrrigationRepository::new();
        repo.expect_find_latest()
            .times(4)
            .returning(move |_, kind| match kind {
                None | Some(IrrigationKind::DurationFlow) => Ok(Some(duration.clone())),
                Some(_) => Ok(None),
            });

        let service = IrrigationDefaultsService::new(Arc::new(repo));
        let defaults = service.get_defaults(&field_id).await.expect("defaults");

        assert_eq!(defaults.kind, IrrigationKind::DurationFlow);
        assert_eq!(
            defaults.duration,
            Some(DurationDefaults {
                duration_minutes: Some(45),
                flow_rate: Some(3.5),
            })
        );
        assert_eq!(defaults.volume, None);
    }

    #[tokio::test]
    async fn repository_failures_surface_as_domain_errors() {
        let mut repo = MockIrrigationRepository::new();
        repo.expect_find_latest()
            .returning(|_, _| Err(IrrigationRepositoryError::connection("refused")));

        let service = IrrigationDefaultsService::new(Arc::new(repo));
        let err = service
            .get_defaults(&FieldId::random())
            .await
            .expect_err("error");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
