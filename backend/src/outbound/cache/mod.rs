//! Shared calculation state: per-field job status and latest results.
//!
//! Redis is used when configured so several processes can share the state;
//! otherwise the in-memory store keeps everything inside one process.

mod keys;
mod memory;
mod redis_store;

pub use memory::InMemoryCalculationCache;
pub use redis_store::{RedisCalculationCache, RedisCacheError};
