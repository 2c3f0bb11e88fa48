//! Adapter construction shared by the server and the batch commands.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};

use irrigation_backend::config::Settings;
use irrigation_backend::domain::ports::{
    CalculationResultsStore, CoverageMap, DeviceConfigRepository, FieldRepository,
    FixtureSoilWaterModel, IrrigationRepository, JobStatusStore, SoilWaterModel,
};
use irrigation_backend::domain::{CalculationWorker, CalculationWorkerPorts};
use irrigation_backend::outbound::cache::{InMemoryCalculationCache, RedisCalculationCache};
use irrigation_backend::outbound::coverage::{BoundingBoxCoverage, NoCoverage};
use irrigation_backend::outbound::persistence::{
    DbPool, DieselDeviceConfigRepository, DieselFieldRepository, DieselIrrigationRepository,
    DieselUserRepository, PoolConfig, run_pending_migrations,
};
use irrigation_backend::outbound::queue::{WorkerPool, WorkerPoolQueue};
use irrigation_backend::outbound::simulation::CommandSoilWaterModel;

const REDIS_POOL_SIZE: u32 = 16;
const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL-backed repositories over one pool.
pub struct Repositories {
    pub fields: Arc<dyn FieldRepository>,
    pub irrigations: Arc<dyn IrrigationRepository>,
    pub devices: Arc<dyn DeviceConfigRepository>,
    pub users: Arc<DieselUserRepository>,
}

impl Repositories {
    /// Apply pending migrations, then open the pool.
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let database_url = settings.database_url()?;
        let applied = run_pending_migrations(database_url)
            .await
            .wrap_err("failed to apply database migrations")?;
        info!(applied, "database migrations checked");

        let pool = DbPool::new(
            PoolConfig::new(database_url).with_max_size(settings.database_max_connections),
        )
        .await
        .wrap_err("failed to create database pool")?;
        Ok(Self {
            fields: Arc::new(DieselFieldRepository::new(pool.clone())),
            irrigations: Arc::new(DieselIrrigationRepository::new(pool.clone())),
            devices: Arc::new(DieselDeviceConfigRepository::new(pool.clone())),
            users: Arc::new(DieselUserRepository::new(pool)),
        })
    }
}

/// Job statuses and results, backed by one store.
pub struct CalculationCache {
    pub status: Arc<dyn JobStatusStore>,
    pub results: Arc<dyn CalculationResultsStore>,
}

impl CalculationCache {
    pub async fn connect(settings: &Settings) -> Result<Self> {
        match settings.redis_url.as_deref().filter(|url| !url.trim().is_empty()) {
            Some(url) => {
                let cache = Arc::new(
                    RedisCalculationCache::connect(url, REDIS_POOL_SIZE, REDIS_CONNECT_TIMEOUT)
                        .await
                        .wrap_err("failed to connect to redis")?,
                );
                let status: Arc<dyn JobStatusStore> = cache.clone();
                let results: Arc<dyn CalculationResultsStore> = cache;
                Ok(Self { status, results })
            }
            None => {
                warn!("no redis url configured; job statuses and results stay in this process");
                let cache = Arc::new(InMemoryCalculationCache::new());
                let status: Arc<dyn JobStatusStore> = cache.clone();
                let results: Arc<dyn CalculationResultsStore> = cache;
                Ok(Self { status, results })
            }
        }
    }
}

fn soil_water_model(settings: &Settings) -> Arc<dyn SoilWaterModel> {
    match &settings.model_program {
        Some(program) => Arc::new(CommandSoilWaterModel::new(
            program.clone(),
            settings.model_args(),
            settings.model_timeout(),
        )),
        None => {
            warn!("no soil water model configured; calculations yield empty results");
            Arc::new(FixtureSoilWaterModel)
        }
    }
}

/// Start the calculation worker pool.
pub fn start_workers(
    settings: &Settings,
    repositories: &Repositories,
    cache: &CalculationCache,
) -> (WorkerPoolQueue, WorkerPool) {
    let worker = CalculationWorker::new(CalculationWorkerPorts {
        status: Arc::clone(&cache.status),
        fields: Arc::clone(&repositories.fields),
        irrigations: Arc::clone(&repositories.irrigations),
        model: soil_water_model(settings),
        results: Arc::clone(&cache.results),
    });
    WorkerPool::start(worker, settings.worker_concurrency)
}

pub fn coverage(settings: &Settings) -> Result<Arc<dyn CoverageMap>> {
    match settings.coverage_box() {
        Some((min, max)) => {
            let coverage =
                BoundingBoxCoverage::new(min, max).wrap_err("invalid coverage bounding box")?;
            Ok(Arc::new(coverage))
        }
        None => {
            warn!("coverage bounding box not configured; no field is serviceable");
            Ok(Arc::new(NoCoverage))
        }
    }
}
