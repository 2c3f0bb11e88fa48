//! HTTP inbound adapter.
//!
//! Mutation endpoints call the domain services, which dispatch a
//! recomputation; clients then poll the calculation status endpoint.

pub mod calculation_status;
pub mod error;
pub mod fields;
pub mod health;
pub mod irrigations;
pub mod state;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod users;

use std::str::FromStr;

use actix_web::{Scope, web};
use serde_json::json;

pub use error::ApiResult;

use crate::domain::{DomainError, IdParseError};

/// Every `/api/v1` endpoint.
pub fn api_scope() -> Scope {
    web::scope("/api/v1")
        .service(calculation_status::get_calculation_status)
        .service(fields::put_field)
        .service(fields::get_irrigation_defaults)
        .service(fields::put_telemetric_device)
        .service(fields::delete_telemetric_device)
        .service(irrigations::create_irrigation)
        .service(irrigations::update_irrigation)
        .service(irrigations::delete_irrigation)
        .service(users::register_user)
}

/// Parse an identifier path segment, reporting the segment name on failure.
pub(crate) fn parse_id<T>(raw: &str, name: &'static str) -> Result<T, DomainError>
where
    T: FromStr<Err = IdParseError>,
{
    raw.parse().map_err(|err: IdParseError| {
        DomainError::invalid_request(err.to_string()).with_details(json!({ name: raw }))
    })
}
