//! Port for storing the latest simulation results per field.
use async_trait::async_trait;

use crate::domain::{CalculationResults, FieldId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by results store adapters.
    pub enum CalculationResultsStoreError {
        /// The backing store could not be reached.
        Connection { message: String } => "results store unavailable: {message}",
        /// Results could not be encoded or decoded.
        Serialization { message: String } => "results serialisation failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalculationResultsStore: Send + Sync {
    async fn get(
        &self,
        field_id: &FieldId,
    ) -> Result<Option<CalculationResults>, CalculationResultsStoreError>;

    /// Replace any previously stored results for the field.
    async fn put(
        &self,
        field_id: &FieldId,
        results: &CalculationResults,
    ) -> Result<(), CalculationResultsStoreError>;
}
