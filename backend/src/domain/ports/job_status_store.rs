//! Port for the shared per-field calculation status store.
//!
//! The store is the only state shared between request handlers and the
//! worker pool, so transitions that depend on the current value go through
//! [`JobStatusStore::compare_and_set`].

use async_trait::async_trait;

use crate::domain::{FieldId, JobStatus};

use super::define_port_error;

define_port_error! {
    /// Errors raised by job status store adapters.
    pub enum JobStatusStoreError {
        /// The backing store could not be reached.
        Connection { message: String } => "job status store unavailable: {message}",
        /// A stored value could not be read back.
        Corrupt { message: String } => "job status store returned invalid data: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobStatusStore: Send + Sync {
    /// Current status; an absent key reads as [`JobStatus::None`].
    async fn get(&self, field_id: &FieldId) -> Result<JobStatus, JobStatusStoreError>;

    /// Unconditionally overwrite the status.
    async fn set(&self, field_id: &FieldId, status: JobStatus) -> Result<(), JobStatusStoreError>;

    /// Atomically replace `expected` with `new`.
    ///
    /// Returns `false` without writing when the current status differs from
    /// `expected`. An absent key matches `JobStatus::None`.
    async fn compare_and_set(
        &self,
        field_id: &FieldId,
        expected: JobStatus,
        new: JobStatus,
    ) -> Result<bool, JobStatusStoreError>;
}
