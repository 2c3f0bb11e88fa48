//! In-memory port implementations for integration tests.
//!
//! Compiled only with the `test-support` feature. Each adapter keeps its
//! state behind a `Mutex` and mirrors the storage guarantees of the
//! PostgreSQL adapters that tests depend on, notably the uniqueness of
//! automatic irrigation records.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::ports::{
    CalculationQueue, DeviceConfigRepository, DeviceConfigRepositoryError, DigestSender,
    DigestSenderError, FieldRepository, FieldRepositoryError, IrrigationRepository,
    IrrigationRepositoryError, JobDispatchError, NotificationDirectory,
    NotificationDirectoryError, TelemetrySource, TelemetrySourceError,
};
use crate::domain::{
    AppliedIrrigation, AutomaticIrrigation, Field, FieldId, IrrigationDigest, IrrigationId,
    IrrigationKind, IrrigationMeasurement, Lookback, ManualIrrigation, Recipient,
    TelemetricDeviceConfig, TelemetricDeviceKind, TelemetryReading, User, UserId,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct InMemoryFieldRepository {
    fields: Mutex<HashMap<FieldId, Field>>,
}

impl InMemoryFieldRepository {
    pub fn with_fields(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            fields: Mutex::new(fields.into_iter().map(|f| (f.id, f)).collect()),
        }
    }
}

#[async_trait]
impl FieldRepository for InMemoryFieldRepository {
    async fn find_by_id(&self, id: &FieldId) -> Result<Option<Field>, FieldRepositoryError> {
        Ok(lock(&self.fields).get(id).cloned())
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Field>, FieldRepositoryError> {
        let mut owned: Vec<Field> = lock(&self.fields)
            .values()
            .filter(|field| field.owner == *owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(owned)
    }

    async fn save(&self, field: &Field) -> Result<(), FieldRepositoryError> {
        lock(&self.fields).insert(field.id, field.clone());
        Ok(())
    }
}

/// Irrigation store; records are kept in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryIrrigationRepository {
    records: Mutex<Vec<AppliedIrrigation>>,
}

impl InMemoryIrrigationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<AppliedIrrigation> {
        lock(&self.records).clone()
    }

    pub fn automatic_for(&self, field_id: &FieldId) -> Vec<AppliedIrrigation> {
        lock(&self.records)
            .iter()
            .filter(|r| r.is_automatic && r.field_id == *field_id)
            .cloned()
            .collect()
    }
}

fn automatic_identity(record: &AppliedIrrigation) -> Option<(FieldId, i64, u64)> {
    if !record.is_automatic {
        return None;
    }
    let volume = record.volume()?;
    Some((
        record.field_id,
        record.timestamp.timestamp_micros(),
        volume.to_bits(),
    ))
}

/// Mirrors the manual-instant unique index.
fn manual_instant_taken(
    records: &[AppliedIrrigation],
    candidate: &AppliedIrrigation,
) -> Result<(), IrrigationRepositoryError> {
    let taken = !candidate.is_automatic
        && records.iter().any(|r| {
            !r.is_automatic
                && r.id != candidate.id
                && r.field_id == candidate.field_id
                && r.timestamp == candidate.timestamp
        });
    if taken {
        Err(IrrigationRepositoryError::duplicate(
            "applied_irrigations_manual_instant",
        ))
    } else {
        Ok(())
    }
}

fn newest_first(records: &mut [AppliedIrrigation]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[async_trait]
impl IrrigationRepository for InMemoryIrrigationRepository {
    async fn find_by_id(
        &self,
        id: &IrrigationId,
    ) -> Result<Option<AppliedIrrigation>, IrrigationRepositoryError> {
        Ok(lock(&self.records).iter().find(|r| r.id == *id).cloned())
    }

    async fn find_latest(
        &self,
        field_id: &FieldId,
        kind: Option<IrrigationKind>,
    ) -> Result<Option<AppliedIrrigation>, IrrigationRepositoryError> {
        Ok(lock(&self.records)
            .iter()
            .filter(|r| r.field_id == *field_id)
            .filter(|r| kind.is_none_or(|k| r.kind() == k))
            .max_by_key(|r| r.timestamp)
            .cloned())
    }

    async fn list_for_field(
        &self,
        field_id: &FieldId,
    ) -> Result<Vec<AppliedIrrigation>, IrrigationRepositoryError> {
        let mut records: Vec<_> = lock(&self.records)
            .iter()
            .filter(|r| r.field_id == *field_id)
            .cloned()
            .collect();
        newest_first(&mut records);
        Ok(records)
    }

    async fn insert_manual(
        &self,
        record: &ManualIrrigation,
    ) -> Result<AppliedIrrigation, IrrigationRepositoryError> {
        let stored = AppliedIrrigation {
            id: IrrigationId::random(),
            field_id: record.field_id,
            timestamp: record.timestamp,
            measurement: record.measurement,
            is_automatic: false,
        };
        let mut records = lock(&self.records);
        manual_instant_taken(&records, &stored)?;
        records.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, record: &AppliedIrrigation) -> Result<bool, IrrigationRepositoryError> {
        let mut records = lock(&self.records);
        let Some(is_automatic) = records.iter().find(|r| r.id == record.id).map(|r| r.is_automatic)
        else {
            return Ok(false);
        };
        manual_instant_taken(
            &records,
            &AppliedIrrigation {
                is_automatic,
                ..record.clone()
            },
        )?;
        let Some(existing) = records.iter_mut().find(|r| r.id == record.id) else {
            return Ok(false);
        };
        existing.timestamp = record.timestamp;
        existing.measurement = record.measurement;
        Ok(true)
    }

    async fn delete(
        &self,
        id: &IrrigationId,
    ) -> Result<Option<AppliedIrrigation>, IrrigationRepositoryError> {
        let mut records = lock(&self.records);
        let position = records.iter().position(|r| r.id == *id);
        Ok(position.map(|index| records.remove(index)))
    }

    async fn insert_automatic(
        &self,
        batch: &[AutomaticIrrigation],
    ) -> Result<Vec<AutomaticIrrigation>, IrrigationRepositoryError> {
        let mut records = lock(&self.records);
        let mut seen: HashSet<_> = records.iter().filter_map(automatic_identity).collect();
        let mut inserted = Vec::new();
        for record in batch {
            let stored = AppliedIrrigation {
                id: IrrigationId::random(),
                field_id: record.field_id,
                timestamp: record.timestamp,
                measurement: IrrigationMeasurement::Volume {
                    volume: Some(record.volume),
                },
                is_automatic: true,
            };
            let Some(identity) = automatic_identity(&stored) else {
                continue;
            };
            if seen.insert(identity) {
                records.push(stored);
                inserted.push(*record);
            }
        }
        Ok(inserted)
    }

    async fn delete_automatic_for_field(
        &self,
        field_id: &FieldId,
    ) -> Result<usize, IrrigationRepositoryError> {
        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|r| !(r.is_automatic && r.field_id == *field_id));
        Ok(before - records.len())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDeviceConfigRepository {
    configs: Mutex<HashMap<FieldId, TelemetricDeviceConfig>>,
}

impl InMemoryDeviceConfigRepository {
    pub fn with_configs(configs: impl IntoIterator<Item = TelemetricDeviceConfig>) -> Self {
        Self {
            configs: Mutex::new(configs.into_iter().map(|c| (c.field_id, c)).collect()),
        }
    }
}

#[async_trait]
impl DeviceConfigRepository for InMemoryDeviceConfigRepository {
    async fn find_by_device_id(
        &self,
        kind: TelemetricDeviceKind,
        device_id: &str,
    ) -> Result<Option<TelemetricDeviceConfig>, DeviceConfigRepositoryError> {
        Ok(lock(&self.configs)
            .values()
            .find(|c| c.kind() == kind && c.device_id == device_id)
            .cloned())
    }

    async fn find_by_field(
        &self,
        field_id: &FieldId,
    ) -> Result<Option<TelemetricDeviceConfig>, DeviceConfigRepositoryError> {
        Ok(lock(&self.configs).get(field_id).cloned())
    }

    async fn replace_for_field(
        &self,
        config: &TelemetricDeviceConfig,
    ) -> Result<(), DeviceConfigRepositoryError> {
        let mut configs = lock(&self.configs);
        let taken = configs.values().any(|c| {
            c.field_id != config.field_id
                && c.kind() == config.kind()
                && c.device_id == config.device_id
        });
        if taken {
            return Err(DeviceConfigRepositoryError::device_in_use(
                config.device_id.clone(),
            ));
        }
        configs.insert(config.field_id, config.clone());
        Ok(())
    }

    async fn delete_for_field(
        &self,
        field_id: &FieldId,
    ) -> Result<bool, DeviceConfigRepositoryError> {
        Ok(lock(&self.configs).remove(field_id).is_some())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryNotificationDirectory {
    recipients: Vec<Recipient>,
}

impl InMemoryNotificationDirectory {
    pub fn new(mut recipients: Vec<Recipient>) -> Self {
        recipients.sort_by(|a, b| a.user.username.cmp(&b.user.username));
        Self { recipients }
    }
}

#[async_trait]
impl NotificationDirectory for InMemoryNotificationDirectory {
    async fn list_recipients(&self) -> Result<Vec<Recipient>, NotificationDirectoryError> {
        Ok(self.recipients.clone())
    }

    async fn list_supervisees(
        &self,
        supervisor: &UserId,
    ) -> Result<Vec<Recipient>, NotificationDirectoryError> {
        Ok(self
            .recipients
            .iter()
            .filter(|r| r.profile.supervisor == Some(*supervisor))
            .cloned()
            .collect())
    }
}

/// Digest sender that keeps every delivery for inspection.
#[derive(Debug, Default)]
pub struct RecordingDigestSender {
    sent: Mutex<Vec<(User, IrrigationDigest)>>,
}

impl RecordingDigestSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(User, IrrigationDigest)> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl DigestSender for RecordingDigestSender {
    async fn send(&self, to: &User, digest: &IrrigationDigest) -> Result<(), DigestSenderError> {
        lock(&self.sent).push((to.clone(), digest.clone()));
        Ok(())
    }
}

/// Queue that records submissions without running them.
#[derive(Debug, Default)]
pub struct RecordingQueue {
    submitted: Mutex<Vec<FieldId>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<FieldId> {
        lock(&self.submitted).clone()
    }
}

#[async_trait]
impl CalculationQueue for RecordingQueue {
    async fn submit(&self, field_id: FieldId) -> Result<(), JobDispatchError> {
        lock(&self.submitted).push(field_id);
        Ok(())
    }
}

/// Telemetry source returning a fixed batch.
#[derive(Debug, Clone, Default)]
pub struct StaticTelemetrySource {
    readings: Vec<TelemetryReading>,
}

impl StaticTelemetrySource {
    pub fn new(readings: Vec<TelemetryReading>) -> Self {
        Self { readings }
    }
}

#[async_trait]
impl TelemetrySource for StaticTelemetrySource {
    fn device_kind(&self) -> TelemetricDeviceKind {
        TelemetricDeviceKind::LoraArta
    }

    async fn fetch_readings(
        &self,
        _lookback: &Lookback,
    ) -> Result<Vec<TelemetryReading>, TelemetrySourceError> {
        Ok(self.readings.clone())
    }
}
