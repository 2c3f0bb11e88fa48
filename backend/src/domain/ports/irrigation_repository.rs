//! Port for applied irrigation persistence.
//!
//! Automatic records are unique on `(field, timestamp, volume)`. Adapters
//! enforce this in storage and skip conflicting rows on bulk insert.

use async_trait::async_trait;

use crate::domain::{
    AppliedIrrigation, AutomaticIrrigation, FieldId, IrrigationId, IrrigationKind,
    ManualIrrigation,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by irrigation repository adapters.
    pub enum IrrigationRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "irrigation repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "irrigation repository query failed: {message}",
        /// The write would duplicate an existing record.
        Duplicate { message: String } => "duplicate irrigation record: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IrrigationRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &IrrigationId,
    ) -> Result<Option<AppliedIrrigation>, IrrigationRepositoryError>;

    /// Most recent record of the field, optionally restricted to one kind.
    async fn find_latest(
        &self,
        field_id: &FieldId,
        kind: Option<IrrigationKind>,
    ) -> Result<Option<AppliedIrrigation>, IrrigationRepositoryError>;

    /// All records of the field, newest first.
    async fn list_for_field(
        &self,
        field_id: &FieldId,
    ) -> Result<Vec<AppliedIrrigation>, IrrigationRepositoryError>;

    async fn insert_manual(
        &self,
        record: &ManualIrrigation,
    ) -> Result<AppliedIrrigation, IrrigationRepositoryError>;

    /// Overwrite timestamp and measurement. Returns `false` if the record
    /// does not exist.
    async fn update(&self, record: &AppliedIrrigation) -> Result<bool, IrrigationRepositoryError>;

    /// Delete and return the record, if it existed.
    async fn delete(
        &self,
        id: &IrrigationId,
    ) -> Result<Option<AppliedIrrigation>, IrrigationRepositoryError>;

    /// Insert in one statement, silently skipping rows that duplicate an
    /// existing automatic record. Returns the rows actually written.
    async fn insert_automatic(
        &self,
        records: &[AutomaticIrrigation],
    ) -> Result<Vec<AutomaticIrrigation>, IrrigationRepositoryError>;

    /// Remove every automatic record of the field; returns the count.
    async fn delete_automatic_for_field(
        &self,
        field_id: &FieldId,
    ) -> Result<usize, IrrigationRepositoryError>;
}
