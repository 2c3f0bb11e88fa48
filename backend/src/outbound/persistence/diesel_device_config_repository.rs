//! PostgreSQL-backed `DeviceConfigRepository`.
//!
//! A field has at most one registration (`field_id` is the primary key) and
//! a device id is unique per kind. Replacing a registration deletes and
//! inserts inside one transaction so a failed insert keeps the old row.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::error_mapping::{DieselFailure, classify, map_basic_pool_error, violation_message};
use super::models::DeviceRow;
use super::pool::{DbPool, PoolError};
use super::schema::telemetric_devices;
use crate::domain::ports::{DeviceConfigRepository, DeviceConfigRepositoryError};
use crate::domain::{FieldId, TelemetricDeviceConfig, TelemetricDeviceKind};

#[derive(Clone)]
pub struct DieselDeviceConfigRepository {
    pool: DbPool,
}

impl DieselDeviceConfigRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> DeviceConfigRepositoryError {
    map_basic_pool_error(error, DeviceConfigRepositoryError::connection)
}

/// `device_id` is reported on unique violations; the only unique key
/// besides the primary key is `(device_kind, device_id)`.
fn map_diesel_error(error: diesel::result::Error, device_id: &str) -> DeviceConfigRepositoryError {
    match classify(error) {
        DieselFailure::Connection(message) => DeviceConfigRepositoryError::connection(message),
        DieselFailure::Query(message) => DeviceConfigRepositoryError::query(message),
        DieselFailure::UniqueViolation { .. } => DeviceConfigRepositoryError::device_in_use(device_id),
        DieselFailure::ForeignKeyViolation { constraint } => DeviceConfigRepositoryError::query(
            violation_message("foreign key", constraint.as_deref()),
        ),
    }
}

fn to_config(row: DeviceRow) -> Result<TelemetricDeviceConfig, DeviceConfigRepositoryError> {
    TelemetricDeviceConfig::try_from(row).map_err(DeviceConfigRepositoryError::query)
}

#[async_trait]
impl DeviceConfigRepository for DieselDeviceConfigRepository {
    async fn find_by_device_id(
        &self,
        kind: TelemetricDeviceKind,
        device_id: &str,
    ) -> Result<Option<TelemetricDeviceConfig>, DeviceConfigRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<DeviceRow> = telemetric_devices::table
            .filter(telemetric_devices::device_kind.eq(kind.code()))
            .filter(telemetric_devices::device_id.eq(device_id))
            .select(DeviceRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, device_id))?;
        row.map(to_config).transpose()
    }

    async fn find_by_field(
        &self,
        field_id: &FieldId,
    ) -> Result<Option<TelemetricDeviceConfig>, DeviceConfigRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<DeviceRow> = telemetric_devices::table
            .filter(telemetric_devices::field_id.eq(field_id.as_uuid()))
            .select(DeviceRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, ""))?;
        row.map(to_config).transpose()
    }

    async fn replace_for_field(
        &self,
        config: &TelemetricDeviceConfig,
    ) -> Result<(), DeviceConfigRepositoryError> {
        let row = DeviceRow::try_from(config).map_err(DeviceConfigRepositoryError::query)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                diesel::delete(
                    telemetric_devices::table.filter(telemetric_devices::field_id.eq(row.field_id)),
                )
                .execute(conn)
                .await?;
                diesel::insert_into(telemetric_devices::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                Ok::<_, diesel::result::Error>(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| map_diesel_error(err, &config.device_id))
    }

    async fn delete_for_field(
        &self,
        field_id: &FieldId,
    ) -> Result<bool, DeviceConfigRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(
            telemetric_devices::table.filter(telemetric_devices::field_id.eq(field_id.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map_err(|err| map_diesel_error(err, ""))?;
        Ok(deleted > 0)
    }
}
