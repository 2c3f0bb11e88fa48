//! PostgreSQL-backed `FieldRepository`.
//!
//! Reads join the crop and irrigation type rows so the domain field carries
//! its full agronomic parameters. Writes store only the type ids.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::error_mapping::{DieselFailure, classify, map_basic_pool_error, violation_message};
use super::models::{CropTypeRow, FieldRow, IrrigationTypeRow};
use super::pool::{DbPool, PoolError};
use super::schema::{crop_types, fields, irrigation_types};
use crate::domain::ports::{FieldRepository, FieldRepositoryError};
use crate::domain::{Field, FieldId, UserId};

#[derive(Clone)]
pub struct DieselFieldRepository {
    pool: DbPool,
}

impl DieselFieldRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> FieldRepositoryError {
    map_basic_pool_error(error, FieldRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> FieldRepositoryError {
    match classify(error) {
        DieselFailure::Connection(message) => FieldRepositoryError::connection(message),
        DieselFailure::Query(message) => FieldRepositoryError::query(message),
        DieselFailure::ForeignKeyViolation { constraint } => {
            FieldRepositoryError::missing_reference(violation_message(
                "foreign key",
                constraint.as_deref(),
            ))
        }
        DieselFailure::UniqueViolation { constraint } => {
            FieldRepositoryError::query(violation_message("unique", constraint.as_deref()))
        }
    }
}

type JoinedField = (FieldRow, CropTypeRow, IrrigationTypeRow);

fn into_field((field, crop, irrigation): JoinedField) -> Field {
    field.into_domain(crop, irrigation)
}

#[async_trait]
impl FieldRepository for DieselFieldRepository {
    async fn find_by_id(&self, id: &FieldId) -> Result<Option<Field>, FieldRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<JoinedField> = fields::table
            .inner_join(crop_types::table)
            .inner_join(irrigation_types::table)
            .filter(fields::id.eq(id.as_uuid()))
            .select((
                FieldRow::as_select(),
                CropTypeRow::as_select(),
                IrrigationTypeRow::as_select(),
            ))
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(into_field))
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Field>, FieldRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<JoinedField> = fields::table
            .inner_join(crop_types::table)
            .inner_join(irrigation_types::table)
            .filter(fields::owner_id.eq(owner.as_uuid()))
            .order_by((fields::name.asc(), fields::id.asc()))
            .select((
                FieldRow::as_select(),
                CropTypeRow::as_select(),
                IrrigationTypeRow::as_select(),
            ))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(into_field).collect())
    }

    async fn save(&self, field: &Field) -> Result<(), FieldRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = FieldRow::from_domain(field, Utc::now());
        diesel::insert_into(fields::table)
            .values(&row)
            .on_conflict(fields::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}
