//! Port for field persistence.
use async_trait::async_trait;

use crate::domain::{Field, FieldId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by field repository adapters.
    pub enum FieldRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "field repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "field repository query failed: {message}",
        /// A referenced crop type, irrigation type or owner does not exist.
        MissingReference { message: String } => "field references a missing record: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FieldRepository: Send + Sync {
    async fn find_by_id(&self, id: &FieldId) -> Result<Option<Field>, FieldRepositoryError>;

    /// Fields of one owner, ordered by name.
    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Field>, FieldRepositoryError>;

    /// Insert or update the field.
    async fn save(&self, field: &Field) -> Result<(), FieldRepositoryError>;
}
