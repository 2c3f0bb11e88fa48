//! Converts telemetry readings into automatic irrigation records.
//!
//! One run fetches a lookback window, drops readings without a usable
//! frequency, resolves each device to its registration and inserts the
//! resulting volume records in one batch. Unregistered devices are logged
//! and skipped; re-delivered readings are absorbed by the uniqueness of
//! automatic records.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::ports::{DeviceConfigRepository, IrrigationRepository, TelemetrySource};
use crate::domain::{AutomaticIrrigation, CalculationDispatcher, DomainError, FieldId, Lookback};

/// Counters describing one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    pub fetched: usize,
    /// Readings without a non-zero frequency.
    pub discarded: usize,
    /// Device ids with no registration.
    pub unregistered_devices: Vec<String>,
    /// Records built after in-batch deduplication.
    pub built_records: usize,
    /// Records written; the rest already existed.
    pub inserted_records: usize,
    /// Fields a recomputation was requested for.
    pub recomputed_fields: Vec<FieldId>,
}

/// Ingestion pipeline for one telemetry source.
#[derive(Clone)]
pub struct TelemetryIngestionService {
    source: Arc<dyn TelemetrySource>,
    devices: Arc<dyn DeviceConfigRepository>,
    irrigations: Arc<dyn IrrigationRepository>,
    dispatcher: CalculationDispatcher,
}

impl TelemetryIngestionService {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        devices: Arc<dyn DeviceConfigRepository>,
        irrigations: Arc<dyn IrrigationRepository>,
        dispatcher: CalculationDispatcher,
    ) -> Self {
        Self {
            source,
            devices,
            irrigations,
            dispatcher,
        }
    }

    pub async fn ingest(&self, lookback: &Lookback) -> Result<IngestionReport, DomainError> {
        let readings = self.source.fetch_readings(lookback).await?;
        let mut report = IngestionReport {
            fetched: readings.len(),
            ..IngestionReport::default()
        };

        let mut by_device: BTreeMap<String, Vec<(DateTime<Utc>, f64)>> = BTreeMap::new();
        for reading in readings {
            match reading.usable_frequency() {
                Some(frequency) => by_device
                    .entry(reading.device_id)
                    .or_default()
                    .push((reading.timestamp, frequency)),
                None => report.discarded += 1,
            }
        }

        let kind = self.source.device_kind();
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for (device_id, points) in by_device {
            let Some(config) = self.devices.find_by_device_id(kind, &device_id).await? else {
                warn!(
                    %device_id,
                    device_kind = %kind,
                    readings = points.len(),
                    "Got non-existing flowmeter with id={device_id} from telemetry source"
                );
                report.unregistered_devices.push(device_id);
                continue;
            };
            for (timestamp, frequency) in points {
                let record = AutomaticIrrigation {
                    field_id: config.field_id,
                    timestamp,
                    volume: config.volume_for(frequency),
                };
                if seen.insert(record.identity()) {
                    records.push(record);
                }
            }
        }
        report.built_records = records.len();

        if !records.is_empty() {
            let inserted = self.irrigations.insert_automatic(&records).await?;
            report.inserted_records = inserted.len();
            let fields: BTreeSet<FieldId> = inserted.iter().map(|r| r.field_id).collect();
            for field_id in fields {
                match self.dispatcher.request_recompute(&field_id).await {
                    Ok(_) => report.recomputed_fields.push(field_id),
                    Err(err) => warn!(%field_id, error = %err, "recompute request failed after ingestion"),
                }
            }
        }

        info!(
            lookback = %lookback,
            fetched = report.fetched,
            discarded = report.discarded,
            unregistered = report.unregistered_devices.len(),
            built = report.built_records,
            inserted = report.inserted_records,
            "telemetry ingestion finished"
        );
        Ok(report)
    }
}
