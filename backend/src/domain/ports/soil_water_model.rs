//! Port for the soil water balance simulation.
//!
//! The numerical model lives outside this service. Adapters translate a
//! [`SimulationInput`] into whatever the model expects and parse its output.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{CalculationResults, SimulationInput};

use super::define_port_error;

define_port_error! {
    /// Errors raised while running the model.
    pub enum SoilWaterModelError {
        /// The model could not be started.
        Unavailable { message: String } => "soil water model unavailable: {message}",
        /// The model ran but reported a failure.
        Execution { message: String } => "soil water model failed: {message}",
        /// The model output could not be understood.
        InvalidOutput { message: String } => "soil water model returned invalid output: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SoilWaterModel: Send + Sync {
    async fn run(&self, input: &SimulationInput) -> Result<CalculationResults, SoilWaterModelError>;
}

/// Model stand-in producing empty results, for deployments without a model
/// binary and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSoilWaterModel;

#[async_trait]
impl SoilWaterModel for FixtureSoilWaterModel {
    async fn run(&self, _input: &SimulationInput) -> Result<CalculationResults, SoilWaterModelError> {
        let computed_at: DateTime<Utc> = Utc::now();
        Ok(CalculationResults {
            raw: 0.0,
            taw: 0.0,
            forecast_start_date: computed_at.date_naive(),
            days: Vec::new(),
            computed_at,
        })
    }
}
