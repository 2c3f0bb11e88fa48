//! Inputs and outputs of the soil water balance simulation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{AppliedIrrigation, Coordinates, Field, FieldId};

/// Effective agronomic parameters after custom overrides are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveParameters {
    pub field_capacity: Option<f64>,
    pub wilting_point: Option<f64>,
    pub root_depth: f64,
    pub p: f64,
    pub irrigation_efficiency: f64,
    pub irrigation_optimizer: f64,
}

/// One logged irrigation as seen by the model.
///
/// `volume` is `None` when the amount is unknown; the model then assumes the
/// soil was brought to field capacity on that day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrigationEvent {
    pub timestamp: DateTime<Utc>,
    pub volume: Option<f64>,
}

impl From<&AppliedIrrigation> for IrrigationEvent {
    fn from(value: &AppliedIrrigation) -> Self {
        Self {
            timestamp: value.timestamp,
            volume: value.volume(),
        }
    }
}

/// Everything the simulation needs for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationInput {
    pub field_id: FieldId,
    pub location: Coordinates,
    pub wetted_area: f64,
    pub parameters: EffectiveParameters,
    pub irrigations: Vec<IrrigationEvent>,
}

impl SimulationInput {
    /// Build the input from a field and its irrigation history, ordered by
    /// timestamp.
    pub fn new(field: &Field, irrigations: &[AppliedIrrigation]) -> Self {
        let mut events: Vec<IrrigationEvent> = irrigations.iter().map(Into::into).collect();
        events.sort_by_key(|e| e.timestamp);
        Self {
            field_id: field.id,
            location: field.location,
            wetted_area: field.wetted_area,
            parameters: EffectiveParameters {
                field_capacity: field.field_capacity(),
                wilting_point: field.wilting_point(),
                root_depth: field.root_depth(),
                p: field.p(),
                irrigation_efficiency: field.irrigation_efficiency(),
                irrigation_optimizer: field.irrigation_optimizer(),
            },
            irrigations: events,
        }
    }
}

/// Recommendation for one day of the simulated period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecommendation {
    pub date: NaiveDate,
    /// Gross irrigation in millimetres.
    pub ifinal: f64,
    /// Gross irrigation in cubic metres over the wetted area.
    pub ifinal_m3: f64,
}

/// Stored outcome of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResults {
    /// Readily available water (mm).
    pub raw: f64,
    /// Total available water (mm).
    pub taw: f64,
    pub forecast_start_date: NaiveDate,
    pub days: Vec<DailyRecommendation>,
    pub computed_at: DateTime<Utc>,
}

impl CalculationResults {
    /// Days from the forecast start onwards.
    pub fn forecast(&self) -> impl Iterator<Item = &DailyRecommendation> {
        self.days
            .iter()
            .filter(move |d| d.date >= self.forecast_start_date)
    }

    /// True when any forecast day recommends irrigation.
    pub fn needs_irrigation(&self) -> bool {
        self.forecast().map(|d| d.ifinal).sum::<f64>() > 0.0
    }

    /// Forecast days with a non-zero recommendation.
    pub fn recommended_days(&self) -> Vec<DailyRecommendation> {
        self.forecast().filter(|d| d.ifinal > 0.0).copied().collect()
    }
}
