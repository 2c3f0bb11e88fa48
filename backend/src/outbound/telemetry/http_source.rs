//! Reqwest-backed telemetry source adapter.
//!
//! Owns transport details only: the lookback query, the access key header,
//! timeout and status mapping, and lenient JSON decoding.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, warn};

use super::dto::UplinkDto;
use crate::domain::ports::{TelemetrySource, TelemetrySourceError};
use crate::domain::{Lookback, TelemetricDeviceKind, TelemetryReading};

/// Endpoint, credentials and timeout for the telemetry network.
#[derive(Debug, Clone)]
pub struct TelemetryHttpSourceConfig {
    pub base_url: Url,
    pub access_key: String,
    pub timeout: Duration,
}

/// Telemetry source issuing one GET per ingestion run.
pub struct TelemetryHttpSource {
    client: Client,
    base_url: Url,
    access_key: String,
}

impl TelemetryHttpSource {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: TelemetryHttpSourceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url,
            access_key: config.access_key,
        })
    }

    fn request_url(&self, lookback: &Lookback) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("last", lookback.as_str());
        url
    }
}

#[async_trait]
impl TelemetrySource for TelemetryHttpSource {
    fn device_kind(&self) -> TelemetricDeviceKind {
        TelemetricDeviceKind::LoraArta
    }

    async fn fetch_readings(
        &self,
        lookback: &Lookback,
    ) -> Result<Vec<TelemetryReading>, TelemetrySourceError> {
        let response = self
            .client
            .get(self.request_url(lookback))
            .header(reqwest::header::AUTHORIZATION, format!("key {}", self.access_key))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(parse_readings(body.as_ref()))
    }
}

/// Undecodable bodies yield no readings rather than failing the run. Entries
/// are decoded one by one, so a malformed entry only loses itself.
fn parse_readings(body: &[u8]) -> Vec<TelemetryReading> {
    let entries: Vec<serde_json::Value> = match serde_json::from_slice(body) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(
                %error,
                body = %body_preview(body),
                "telemetry payload is not a JSON array of uplinks; ignoring"
            );
            return Vec::new();
        }
    };
    let total = entries.len();
    let mut malformed = 0_usize;
    let mut readings = Vec::with_capacity(total);
    for entry in entries {
        match serde_json::from_value::<UplinkDto>(entry) {
            Ok(uplink) => readings.extend(uplink.into_reading()),
            Err(error) => {
                malformed += 1;
                debug!(%error, "undecodable telemetry entry");
            }
        }
    }
    if malformed > 0 {
        warn!(malformed, total, "dropped malformed telemetry entries");
    }
    let unattributed = total - malformed - readings.len();
    if unattributed > 0 {
        debug!(
            dropped = unattributed,
            "telemetry entries without device id or time"
        );
    }
    readings
}

fn map_transport_error(error: reqwest::Error) -> TelemetrySourceError {
    if error.is_timeout() {
        TelemetrySourceError::timeout(error.to_string())
    } else {
        TelemetrySourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> TelemetrySourceError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    };
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            TelemetrySourceError::timeout(message)
        }
        _ => TelemetrySourceError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
