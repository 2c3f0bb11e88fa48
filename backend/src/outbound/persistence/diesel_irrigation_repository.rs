//! PostgreSQL-backed `IrrigationRepository`.
//!
//! Automatic records are deduplicated by the partial unique index
//! `applied_irrigations_automatic_identity`, so bulk inserts use
//! `ON CONFLICT DO NOTHING` and report back only the rows written.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::error_mapping::{DieselFailure, classify, map_basic_pool_error, violation_message};
use super::models::{IrrigationChangeset, IrrigationRow, collect_rows};
use super::pool::{DbPool, PoolError};
use super::schema::applied_irrigations;
use crate::domain::ports::{IrrigationRepository, IrrigationRepositoryError};
use crate::domain::{
    AppliedIrrigation, AutomaticIrrigation, FieldId, IrrigationId, IrrigationKind,
    ManualIrrigation,
};

#[derive(Clone)]
pub struct DieselIrrigationRepository {
    pool: DbPool,
}

impl DieselIrrigationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> IrrigationRepositoryError {
    map_basic_pool_error(error, IrrigationRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> IrrigationRepositoryError {
    match classify(error) {
        DieselFailure::Connection(message) => IrrigationRepositoryError::connection(message),
        DieselFailure::Query(message) => IrrigationRepositoryError::query(message),
        DieselFailure::UniqueViolation { constraint } => {
            IrrigationRepositoryError::duplicate(violation_message("unique", constraint.as_deref()))
        }
        DieselFailure::ForeignKeyViolation { constraint } => IrrigationRepositoryError::query(
            violation_message("foreign key", constraint.as_deref()),
        ),
    }
}

fn to_applied(row: IrrigationRow) -> Result<AppliedIrrigation, IrrigationRepositoryError> {
    AppliedIrrigation::try_from(row).map_err(IrrigationRepositoryError::query)
}

#[async_trait]
impl IrrigationRepository for DieselIrrigationRepository {
    async fn find_by_id(
        &self,
        id: &IrrigationId,
    ) -> Result<Option<AppliedIrrigation>, IrrigationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<IrrigationRow> = applied_irrigations::table
            .filter(applied_irrigations::id.eq(id.as_uuid()))
            .select(IrrigationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_applied).transpose()
    }

    async fn find_latest(
        &self,
        field_id: &FieldId,
        kind: Option<IrrigationKind>,
    ) -> Result<Option<AppliedIrrigation>, IrrigationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = applied_irrigations::table
            .filter(applied_irrigations::field_id.eq(field_id.as_uuid()))
            .select(IrrigationRow::as_select())
            .order_by((
                applied_irrigations::irrigated_at.desc(),
                applied_irrigations::id.desc(),
            ))
            .into_boxed();
        if let Some(kind) = kind {
            query = query.filter(applied_irrigations::irrigation_kind.eq(kind.code()));
        }
        let row: Option<IrrigationRow> = query
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_applied).transpose()
    }

    async fn list_for_field(
        &self,
        field_id: &FieldId,
    ) -> Result<Vec<AppliedIrrigation>, IrrigationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<IrrigationRow> = applied_irrigations::table
            .filter(applied_irrigations::field_id.eq(field_id.as_uuid()))
            .select(IrrigationRow::as_select())
            .order_by((
                applied_irrigations::irrigated_at.desc(),
                applied_irrigations::id.desc(),
            ))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(
            rows.into_iter().map(AppliedIrrigation::try_from),
            IrrigationRepositoryError::query,
        )
    }

    async fn insert_manual(
        &self,
        record: &ManualIrrigation,
    ) -> Result<AppliedIrrigation, IrrigationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = IrrigationRow::manual(IrrigationId::random(), record);
        let stored: IrrigationRow = diesel::insert_into(applied_irrigations::table)
            .values(&row)
            .returning(IrrigationRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_applied(stored)
    }

    async fn update(&self, record: &AppliedIrrigation) -> Result<bool, IrrigationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changeset = IrrigationChangeset::new(record.timestamp, &record.measurement);
        let updated = diesel::update(
            applied_irrigations::table.filter(applied_irrigations::id.eq(record.id.as_uuid())),
        )
        .set(&changeset)
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn delete(
        &self,
        id: &IrrigationId,
    ) -> Result<Option<AppliedIrrigation>, IrrigationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<IrrigationRow> = diesel::delete(
            applied_irrigations::table.filter(applied_irrigations::id.eq(id.as_uuid())),
        )
        .returning(IrrigationRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;
        row.map(to_applied).transpose()
    }

    async fn insert_automatic(
        &self,
        records: &[AutomaticIrrigation],
    ) -> Result<Vec<AutomaticIrrigation>, IrrigationRepositoryError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<IrrigationRow> = records
            .iter()
            .map(|record| IrrigationRow::automatic(IrrigationId::random(), record))
            .collect();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let inserted: Vec<IrrigationRow> = diesel::insert_into(applied_irrigations::table)
            .values(&rows)
            .on_conflict_do_nothing()
            .returning(IrrigationRow::as_returning())
            .get_results(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(
            inserted.into_iter().map(AutomaticIrrigation::try_from),
            IrrigationRepositoryError::query,
        )
    }

    async fn delete_automatic_for_field(
        &self,
        field_id: &FieldId,
    ) -> Result<usize, IrrigationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::delete(
            applied_irrigations::table
                .filter(applied_irrigations::field_id.eq(field_id.as_uuid()))
                .filter(applied_irrigations::is_automatically_reported.eq(true)),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)
    }
}
