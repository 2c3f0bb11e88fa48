//! Diesel and pool failure classification shared by the repositories.
//!
//! Each repository supplies the constructors of its own port error; the
//! helpers here only decide which one applies.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Outcome of inspecting a Diesel error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DieselFailure {
    Connection(String),
    Query(String),
    UniqueViolation { constraint: Option<String> },
    ForeignKeyViolation { constraint: Option<String> },
}

pub(crate) fn classify(error: diesel::result::Error) -> DieselFailure {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(%error, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            DieselFailure::UniqueViolation {
                constraint: info.constraint_name().map(str::to_owned),
            }
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            DieselFailure::ForeignKeyViolation {
                constraint: info.constraint_name().map(str::to_owned),
            }
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            DieselFailure::Connection("database connection error".to_owned())
        }
        DieselError::NotFound => DieselFailure::Query("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => {
            DieselFailure::Query("database query error".to_owned())
        }
        DieselError::DeserializationError(inner) => {
            DieselFailure::Query(format!("row decoding failed: {inner}"))
        }
        _ => DieselFailure::Query("database error".to_owned()),
    }
}

/// Map a Diesel error onto the two constructors every port error has.
/// Constraint violations fall back to `query`.
pub(crate) fn map_basic_diesel_error<E>(
    error: diesel::result::Error,
    query: impl FnOnce(String) -> E,
    connection: impl FnOnce(String) -> E,
) -> E {
    match classify(error) {
        DieselFailure::Connection(message) => connection(message),
        DieselFailure::Query(message) => query(message),
        DieselFailure::UniqueViolation { constraint } => {
            query(violation_message("unique", constraint.as_deref()))
        }
        DieselFailure::ForeignKeyViolation { constraint } => {
            query(violation_message("foreign key", constraint.as_deref()))
        }
    }
}

pub(crate) fn map_basic_pool_error<E>(error: PoolError, connection: impl FnOnce(String) -> E) -> E {
    connection(error.into_message())
}

pub(crate) fn violation_message(kind: &str, constraint: Option<&str>) -> String {
    match constraint {
        Some(name) => format!("{kind} constraint {name} violated"),
        None => format!("{kind} constraint violated"),
    }
}
