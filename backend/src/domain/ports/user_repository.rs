//! Ports for account and profile persistence.
use async_trait::async_trait;

use crate::domain::{Profile, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user and profile repository adapters.
    pub enum UserRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// Username or email is already taken.
        Duplicate { message: String } => "user already exists: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: &User) -> Result<(), UserRepositoryError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Profile>, UserRepositoryError>;

    /// Insert or update the profile.
    async fn save(&self, profile: &Profile) -> Result<(), UserRepositoryError>;
}
