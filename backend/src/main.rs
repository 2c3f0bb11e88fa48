//! Backend entry-point: HTTP server plus the periodic batch commands.

mod server;
mod wiring;

use std::ffi::OsString;
use std::sync::Arc;

use actix_web::web;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use irrigation_backend::config::Settings;
use irrigation_backend::domain::{
    CalculationDispatcher, Lookback, NotificationService, TelemetryIngestionService,
};
use irrigation_backend::inbound::http::health::HealthState;
use irrigation_backend::inbound::http::state::{HttpState, HttpStatePorts};
use irrigation_backend::outbound::notifications::LoggingDigestSender;
use irrigation_backend::outbound::telemetry::{TelemetryHttpSource, TelemetryHttpSourceConfig};

use server::{ServerConfig, create_server};
use wiring::{CalculationCache, Repositories, coverage, start_workers};

#[derive(Debug, Parser)]
#[command(name = "irrigation-backend", about = "Irrigation accounting service", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API and run calculation workers.
    Serve,
    /// Pull recent telemetry once and record automatic irrigations.
    IngestTelemetry {
        /// Overrides the configured lookback window, e.g. `6h`.
        #[arg(long, value_name = "window")]
        lookback: Option<Lookback>,
    },
    /// Send the irrigation digests due on a date (default today, UTC).
    SendNotifications {
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },
}

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let settings = Settings::load_from_iter([OsString::from("irrigation-backend")])
        .map_err(|error| eyre!("failed to load configuration: {error}"))?;

    match cli.command {
        Command::Serve => serve(&settings).await,
        Command::IngestTelemetry { lookback } => ingest_telemetry(&settings, lookback).await,
        Command::SendNotifications { date } => send_notifications(&settings, date).await,
    }
}

async fn serve(settings: &Settings) -> Result<()> {
    let repositories = Repositories::connect(settings).await?;
    let cache = CalculationCache::connect(settings).await?;
    let (queue, workers) = start_workers(settings, &repositories, &cache);

    let http_state = HttpState::from(HttpStatePorts {
        fields: Arc::clone(&repositories.fields),
        irrigations: Arc::clone(&repositories.irrigations),
        devices: Arc::clone(&repositories.devices),
        users: repositories.users.clone(),
        profiles: repositories.users.clone(),
        coverage: coverage(settings)?,
        status: Arc::clone(&cache.status),
        queue: Arc::new(queue),
    });
    let bind_addr = settings.bind_addr()?;
    let server = create_server(
        web::Data::new(HealthState::new()),
        ServerConfig::new(bind_addr, http_state),
    )
    .wrap_err_with(|| format!("failed to bind {bind_addr}"))?;
    info!(%bind_addr, "listening");

    let outcome = server.await;
    workers.shutdown().await;
    outcome.wrap_err("http server failed")
}

async fn ingest_telemetry(settings: &Settings, lookback: Option<Lookback>) -> Result<()> {
    let Some(access_key) = settings.telemetry_access_key() else {
        info!("no telemetry access key configured; nothing to ingest");
        return Ok(());
    };
    let lookback = match lookback {
        Some(lookback) => lookback,
        None => settings.telemetry_lookback()?,
    };
    let source = TelemetryHttpSource::new(TelemetryHttpSourceConfig {
        base_url: settings.telemetry_base_url()?,
        access_key: access_key.to_owned(),
        timeout: settings.telemetry_timeout(),
    })
    .wrap_err("failed to build telemetry client")?;

    let repositories = Repositories::connect(settings).await?;
    let cache = CalculationCache::connect(settings).await?;
    let (queue, workers) = start_workers(settings, &repositories, &cache);

    // The service owns the last queue handle; dropping it lets the pool drain.
    let outcome = TelemetryIngestionService::new(
        Arc::new(source),
        Arc::clone(&repositories.devices),
        Arc::clone(&repositories.irrigations),
        CalculationDispatcher::new(
            Arc::clone(&cache.status),
            Arc::new(queue),
            Arc::clone(&repositories.fields),
        ),
    )
    .ingest(&lookback)
    .await;
    workers.drain().await;

    let report = outcome.wrap_err("telemetry ingestion failed")?;
    info!(
        fetched = report.fetched,
        discarded = report.discarded,
        unregistered = report.unregistered_devices.len(),
        inserted = report.inserted_records,
        recomputed = report.recomputed_fields.len(),
        "telemetry ingestion finished"
    );
    Ok(())
}

async fn send_notifications(settings: &Settings, date: Option<NaiveDate>) -> Result<()> {
    let repositories = Repositories::connect(settings).await?;
    let cache = CalculationCache::connect(settings).await?;
    let service = NotificationService::new(
        repositories.users.clone(),
        Arc::clone(&repositories.fields),
        Arc::clone(&cache.results),
        Arc::new(LoggingDigestSender),
        Arc::new(DefaultClock),
    );

    let outcome = match date {
        Some(date) => service.run(date).await,
        None => service.run_today().await,
    };
    let report = outcome.wrap_err("notification run failed")?;
    info!(
        due = report.due_recipients,
        sent = report.sent,
        empty = report.empty,
        missing_results = report.missing_results,
        lookup_failures = report.lookup_failures,
        failed = report.failed_deliveries,
        "notification run finished"
    );
    Ok(())
}
