//! Port listing who receives irrigation digests.
use async_trait::async_trait;

use crate::domain::{Recipient, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by notification directory adapters.
    pub enum NotificationDirectoryError {
        /// Directory connection could not be established.
        Connection { message: String } => "notification directory connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } => "notification directory query failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDirectory: Send + Sync {
    /// Every account that has a profile, ordered by username.
    async fn list_recipients(&self) -> Result<Vec<Recipient>, NotificationDirectoryError>;

    /// Accounts whose profile names `supervisor` as their supervisor.
    async fn list_supervisees(
        &self,
        supervisor: &UserId,
    ) -> Result<Vec<Recipient>, NotificationDirectoryError>;
}
