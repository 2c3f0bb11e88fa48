//! Port for handing recomputation jobs to the worker pool.
use async_trait::async_trait;

use crate::domain::FieldId;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by the queue adapter.
    pub enum JobDispatchError {
        /// Queue infrastructure is unavailable or shut down.
        Unavailable { message: String } => "calculation queue is unavailable: {message}",
        /// The job could not be accepted.
        Rejected { message: String } => "calculation job was rejected: {message}",
    }
}

/// Fire-and-forget submission of a field recomputation.
///
/// Implementations must eventually move the field's status to `Processing`
/// and then to a terminal state, storing results keyed by field id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalculationQueue: Send + Sync {
    async fn submit(&self, field_id: FieldId) -> Result<(), JobDispatchError>;
}
