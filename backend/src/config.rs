//! Service configuration loaded via OrthoConfig.
//!
//! Values come from `IRRIGATION_*` environment variables and an optional
//! configuration file. Optional values have accessors that apply defaults
//! and parse them into typed values.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::{Coordinates, InvalidLookback, Lookback};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_LOOKBACK: &str = "1d";

/// Errors raised when a configured value cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IRRIGATION_{0} is required")]
    Missing(&'static str),
    #[error("invalid bind address {value:?}: {source}")]
    BindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid telemetry base url {value:?}: {source}")]
    TelemetryUrl {
        value: String,
        source: url::ParseError,
    },
    #[error(transparent)]
    Lookback(#[from] InvalidLookback),
}

/// Settings shared by the server and the batch commands.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "IRRIGATION")]
pub struct Settings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    #[ortho_config(default = 10)]
    pub database_max_connections: u32,
    /// Redis URL for job statuses and results; in-process storage when
    /// absent.
    pub redis_url: Option<String>,
    /// Listen address for `serve`.
    pub bind_addr: Option<String>,
    /// Calculation jobs run concurrently.
    #[ortho_config(default = 2)]
    pub worker_concurrency: usize,
    /// Telemetry network query endpoint.
    pub telemetry_base_url: Option<String>,
    /// Telemetry network access key; ingestion is skipped when empty.
    pub telemetry_access_key: Option<String>,
    /// How far back each ingestion run reads, e.g. `1d` or `6h`.
    pub telemetry_lookback: Option<String>,
    #[ortho_config(default = 30)]
    pub telemetry_timeout_seconds: u64,
    /// Serviceable area bounding box (WGS84 degrees).
    pub coverage_min_lng: Option<f64>,
    pub coverage_min_lat: Option<f64>,
    pub coverage_max_lng: Option<f64>,
    pub coverage_max_lat: Option<f64>,
    /// Soil water model executable and its arguments.
    pub model_program: Option<PathBuf>,
    /// Whitespace-separated.
    pub model_args: Option<String>,
    #[ortho_config(default = 600)]
    pub model_timeout_seconds: u64,
}

impl Settings {
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(SettingsError::Missing("DATABASE_URL"))
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|source| SettingsError::BindAddr {
            value: value.to_owned(),
            source,
        })
    }

    /// `None` when no access key is configured.
    pub fn telemetry_access_key(&self) -> Option<&str> {
        self.telemetry_access_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn telemetry_base_url(&self) -> Result<Url, SettingsError> {
        let value = self
            .telemetry_base_url
            .as_deref()
            .ok_or(SettingsError::Missing("TELEMETRY_BASE_URL"))?;
        Url::parse(value).map_err(|source| SettingsError::TelemetryUrl {
            value: value.to_owned(),
            source,
        })
    }

    pub fn telemetry_lookback(&self) -> Result<Lookback, SettingsError> {
        Ok(self
            .telemetry_lookback
            .as_deref()
            .unwrap_or(DEFAULT_LOOKBACK)
            .parse()?)
    }

    pub fn telemetry_timeout(&self) -> Duration {
        Duration::from_secs(self.telemetry_timeout_seconds)
    }

    /// South-west and north-east corners, when all four are set.
    pub fn coverage_box(&self) -> Option<(Coordinates, Coordinates)> {
        Some((
            Coordinates::new(self.coverage_min_lng?, self.coverage_min_lat?),
            Coordinates::new(self.coverage_max_lng?, self.coverage_max_lat?),
        ))
    }

    pub fn model_args(&self) -> Vec<String> {
        self.model_args
            .as_deref()
            .map(|args| args.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_seconds)
    }
}
