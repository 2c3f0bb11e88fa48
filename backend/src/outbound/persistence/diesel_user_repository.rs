//! PostgreSQL-backed account, profile and notification directory adapters.
//!
//! One struct serves all three ports since they read the same two tables.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::error_mapping::{
    DieselFailure, classify, map_basic_diesel_error, map_basic_pool_error, violation_message,
};
use super::models::{NewUserRow, ProfileRow, UserRow, collect_rows};
use super::pool::{DbPool, PoolError};
use super::schema::{profiles, users};
use crate::domain::ports::{
    NotificationDirectory, NotificationDirectoryError, ProfileRepository, UserRepository,
    UserRepositoryError,
};
use crate::domain::{Profile, Recipient, User, UserId};

#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn recipients(
        &self,
        supervisor: Option<&UserId>,
    ) -> Result<Vec<Recipient>, NotificationDirectoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_basic_pool_error(err, NotificationDirectoryError::connection))?;
        let mut query = users::table
            .inner_join(profiles::table.on(profiles::user_id.eq(users::id)))
            .select((UserRow::as_select(), ProfileRow::as_select()))
            .order_by((users::username.asc(), users::id.asc()))
            .into_boxed();
        if let Some(supervisor) = supervisor {
            query = query.filter(profiles::supervisor_id.eq(*supervisor.as_uuid()));
        }
        let rows: Vec<(UserRow, ProfileRow)> = query.load(&mut conn).await.map_err(|err| {
            map_basic_diesel_error(
                err,
                NotificationDirectoryError::query,
                NotificationDirectoryError::connection,
            )
        })?;
        collect_rows(
            rows.into_iter().map(|(user, profile)| {
                Ok(Recipient {
                    user: user.into(),
                    profile: Profile::try_from(profile)?,
                })
            }),
            NotificationDirectoryError::query,
        )
    }
}

fn map_pool_error(error: PoolError) -> UserRepositoryError {
    map_basic_pool_error(error, UserRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> UserRepositoryError {
    match classify(error) {
        DieselFailure::Connection(message) => UserRepositoryError::connection(message),
        DieselFailure::Query(message) => UserRepositoryError::query(message),
        DieselFailure::UniqueViolation { constraint } => {
            UserRepositoryError::duplicate(violation_message("unique", constraint.as_deref()))
        }
        DieselFailure::ForeignKeyViolation { constraint } => {
            UserRepositoryError::query(violation_message("foreign key", constraint.as_deref()))
        }
    }
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn insert(&self, user: &User) -> Result<(), UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(users::table)
            .values(NewUserRow::from(user))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .filter(users::id.eq(id.as_uuid()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(User::from))
    }
}

#[async_trait]
impl ProfileRepository for DieselUserRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Profile>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ProfileRow> = profiles::table
            .filter(profiles::user_id.eq(user_id.as_uuid()))
            .select(ProfileRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(Profile::try_from)
            .transpose()
            .map_err(UserRepositoryError::query)
    }

    async fn save(&self, profile: &Profile) -> Result<(), UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = ProfileRow::from(profile);
        diesel::insert_into(profiles::table)
            .values(&row)
            .on_conflict(profiles::user_id)
            .do_update()
            .set(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}

#[async_trait]
impl NotificationDirectory for DieselUserRepository {
    async fn list_recipients(&self) -> Result<Vec<Recipient>, NotificationDirectoryError> {
        self.recipients(None).await
    }

    async fn list_supervisees(
        &self,
        supervisor: &UserId,
    ) -> Result<Vec<Recipient>, NotificationDirectoryError> {
        self.recipients(Some(supervisor)).await
    }
}
