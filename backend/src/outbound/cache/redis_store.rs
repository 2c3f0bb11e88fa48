//! Redis-backed calculation cache using `bb8-redis` pooling.
//!
//! Statuses are plain string values; `none` is represented by the absence
//! of the key. Compare-and-set runs as a Lua script so the read and the
//! write happen atomically on the server. Results are stored as JSON.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::{Pool, PooledConnection};
use bb8_redis::redis::{self, AsyncCommands};

use super::keys::{results_key, status_key};
use crate::domain::ports::{
    CalculationResultsStore, CalculationResultsStoreError, JobStatusStore, JobStatusStoreError,
};
use crate::domain::{CalculationResults, FieldId, JobStatus};

const COMPARE_AND_SET: &str = r"
local current = redis.call('GET', KEYS[1])
if not current then current = 'none' end
if current ~= ARGV[1] then return 0 end
if ARGV[2] == 'none' then
  redis.call('DEL', KEYS[1])
else
  redis.call('SET', KEYS[1], ARGV[2])
end
return 1
";

/// Errors raised while building the Redis pool.
#[derive(Debug, thiserror::Error)]
pub enum RedisCacheError {
    #[error("invalid redis url: {0}")]
    Url(#[source] redis::RedisError),
    #[error("failed to build redis pool: {0}")]
    Build(#[source] redis::RedisError),
}

#[derive(Clone)]
pub struct RedisCalculationCache {
    pool: Pool<RedisConnectionManager>,
    compare_and_set: redis::Script,
}

impl RedisCalculationCache {
    /// Connect a pool to `url`.
    ///
    /// # Errors
    ///
    /// Fails when the URL is malformed or the first connection cannot be
    /// established within `connection_timeout`.
    pub async fn connect(
        url: &str,
        max_size: u32,
        connection_timeout: Duration,
    ) -> Result<Self, RedisCacheError> {
        let manager = RedisConnectionManager::new(url).map_err(RedisCacheError::Url)?;
        let pool = Pool::builder()
            .max_size(max_size)
            .connection_timeout(connection_timeout)
            .build(manager)
            .await
            .map_err(RedisCacheError::Build)?;
        Ok(Self {
            pool,
            compare_and_set: redis::Script::new(COMPARE_AND_SET),
        })
    }

    async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, RedisConnectionManager>, String> {
        self.pool.get().await.map_err(|error| error.to_string())
    }
}

fn parse_status(raw: Option<String>) -> Result<JobStatus, JobStatusStoreError> {
    match raw {
        None => Ok(JobStatus::None),
        Some(raw) => raw
            .parse()
            .map_err(|error: crate::domain::UnknownJobStatus| {
                JobStatusStoreError::corrupt(error.to_string())
            }),
    }
}

#[async_trait]
impl JobStatusStore for RedisCalculationCache {
    async fn get(&self, field_id: &FieldId) -> Result<JobStatus, JobStatusStoreError> {
        let mut conn = self
            .connection()
            .await
            .map_err(JobStatusStoreError::connection)?;
        let raw: Option<String> = conn
            .get(status_key(field_id))
            .await
            .map_err(|error| JobStatusStoreError::connection(error.to_string()))?;
        parse_status(raw)
    }

    async fn set(&self, field_id: &FieldId, status: JobStatus) -> Result<(), JobStatusStoreError> {
        let mut conn = self
            .connection()
            .await
            .map_err(JobStatusStoreError::connection)?;
        let key = status_key(field_id);
        let outcome: redis::RedisResult<()> = if status == JobStatus::None {
            conn.del(key).await
        } else {
            conn.set(key, status.as_str()).await
        };
        outcome.map_err(|error| JobStatusStoreError::connection(error.to_string()))
    }

    async fn compare_and_set(
        &self,
        field_id: &FieldId,
        expected: JobStatus,
        new: JobStatus,
    ) -> Result<bool, JobStatusStoreError> {
        let mut conn = self
            .connection()
            .await
            .map_err(JobStatusStoreError::connection)?;
        let swapped: i64 = self
            .compare_and_set
            .key(status_key(field_id))
            .arg(expected.as_str())
            .arg(new.as_str())
            .invoke_async(&mut *conn)
            .await
            .map_err(|error| JobStatusStoreError::connection(error.to_string()))?;
        Ok(swapped == 1)
    }
}

#[async_trait]
impl CalculationResultsStore for RedisCalculationCache {
    async fn get(
        &self,
        field_id: &FieldId,
    ) -> Result<Option<CalculationResults>, CalculationResultsStoreError> {
        let mut conn = self
            .connection()
            .await
            .map_err(CalculationResultsStoreError::connection)?;
        let raw: Option<String> = conn
            .get(results_key(field_id))
            .await
            .map_err(|error| CalculationResultsStoreError::connection(error.to_string()))?;
        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|error| CalculationResultsStoreError::serialization(error.to_string()))
        })
        .transpose()
    }

    async fn put(
        &self,
        field_id: &FieldId,
        results: &CalculationResults,
    ) -> Result<(), CalculationResultsStoreError> {
        let json = serde_json::to_string(results)
            .map_err(|error| CalculationResultsStoreError::serialization(error.to_string()))?;
        let mut conn = self
            .connection()
            .await
            .map_err(CalculationResultsStoreError::connection)?;
        conn.set::<_, _, ()>(results_key(field_id), json)
            .await
            .map_err(|error| CalculationResultsStoreError::connection(error.to_string()))
    }
}
