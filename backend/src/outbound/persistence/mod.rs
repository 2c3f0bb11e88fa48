//! PostgreSQL persistence adapters built on `diesel-async` and `bb8`.
//!
//! Repositories translate between row structs (`models.rs`) and domain
//! types and classify database failures into port errors. Schema and rows
//! stay private to this module.
//!
//! ```ignore
//! use irrigation_backend::outbound::persistence::{DbPool, DieselFieldRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/irrigation")).await?;
//! let fields = DieselFieldRepository::new(pool.clone());
//! ```

mod diesel_device_config_repository;
mod diesel_field_repository;
mod diesel_irrigation_repository;
mod diesel_user_repository;
mod error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_device_config_repository::DieselDeviceConfigRepository;
pub use diesel_field_repository::DieselFieldRepository;
pub use diesel_irrigation_repository::DieselIrrigationRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
