//! Account registration with its notification profile.
//!
//! Every account gets a profile at registration time so later reads never
//! have to guess defaults: no notifications, English digests, no supervisor.

use std::sync::Arc;

use tracing::info;

use crate::domain::ports::{ProfileRepository, UserRepository};
use crate::domain::{DomainError, Profile, User};

#[derive(Clone)]
pub struct UserOnboardingService {
    users: Arc<dyn UserRepository>,
    profiles: Arc<dyn ProfileRepository>,
}

impl UserOnboardingService {
    pub fn new(users: Arc<dyn UserRepository>, profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { users, profiles }
    }

    /// Store the account and its default profile. An existing profile for
    /// the same id is left untouched.
    pub async fn register(&self, user: User) -> Result<Profile, DomainError> {
        if user.username.trim().is_empty() {
            return Err(DomainError::invalid_request("username must not be empty"));
        }
        self.users.insert(&user).await?;
        if let Some(existing) = self.profiles.find_by_user(&user.id).await? {
            return Ok(existing);
        }
        let profile = Profile::new_default(user.id);
        self.profiles.save(&profile).await?;
        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockProfileRepository, MockUserRepository, UserRepositoryError};
    use crate::domain::{EmailLanguage, ErrorCode, UserId};

    fn user() -> User {
        User {
            id: UserId::random(),
            username: "eleni".to_owned(),
            email: "eleni@example.org".to_owned(),
        }
    }

    #[tokio::test]
    async fn registration_creates_default_profile() {
        let mut users = MockUserRepository::new();
        users.expect_insert().times(1).return_once(|_| Ok(()));
        let mut profiles = MockProfileRepository::new();
        profiles.expect_find_by_user().return_once(|_| Ok(None));
        profiles
            .expect_save()
            .withf(|p| p.notification.is_none() && p.supervisor.is_none())
            .times(1)
            .return_once(|_| Ok(()));

        let profile = UserOnboardingService::new(Arc::new(users), Arc::new(profiles))
            .register(user())
            .await
            .expect("register");

        assert_eq!(profile.email_language, EmailLanguage::En);
    }

    #[tokio::test]
    async fn duplicate_account_is_a_conflict() {
        let mut users = MockUserRepository::new();
        users
            .expect_insert()
            .return_once(|_| Err(UserRepositoryError::duplicate("eleni")));
        let mut profiles = MockProfileRepository::new();
        profiles.expect_save().never();

        let err = UserOnboardingService::new(Arc::new(users), Arc::new(profiles))
            .register(user())
            .await
            .expect_err("duplicate");

        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn blank_username_is_rejected() {
        let mut users = MockUserRepository::new();
        users.expect_insert().never();
        let mut user = user();
        user.username = " ".to_owned();

        let err = UserOnboardingService::new(Arc::new(users), Arc::new(MockProfileRepository::new()))
            .register(user)
            .await
            .expect_err("blank");

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }
}
