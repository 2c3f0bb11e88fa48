//! Helpers for handler tests: mocked ports and a one-shot request runner.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use serde_json::Value;

use super::api_scope;
use super::state::{HttpState, HttpStatePorts};
use crate::domain::ports::{
    MockCalculationQueue, MockCoverageMap, MockDeviceConfigRepository, MockFieldRepository,
    MockIrrigationRepository, MockJobStatusStore, MockProfileRepository, MockUserRepository,
};

/// One mock per port; unset expectations panic when called.
#[derive(Default)]
pub(crate) struct MockPorts {
    pub fields: MockFieldRepository,
    pub irrigations: MockIrrigationRepository,
    pub devices: MockDeviceConfigRepository,
    pub users: MockUserRepository,
    pub profiles: MockProfileRepository,
    pub coverage: MockCoverageMap,
    pub status: MockJobStatusStore,
    pub queue: MockCalculationQueue,
}

impl MockPorts {
    pub(crate) fn into_state(self) -> HttpState {
        HttpState::from(HttpStatePorts {
            fields: Arc::new(self.fields),
            irrigations: Arc::new(self.irrigations),
            devices: Arc::new(self.devices),
            users: Arc::new(self.users),
            profiles: Arc::new(self.profiles),
            coverage: Arc::new(self.coverage),
            status: Arc::new(self.status),
            queue: Arc::new(self.queue),
        })
    }
}

/// Run one request against the API scope and decode the JSON body
/// (`Value::Null` when empty).
pub(crate) async fn send(
    ports: MockPorts,
    request: actix_test::TestRequest,
) -> (StatusCode, Value) {
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(ports.into_state()))
            .service(api_scope()),
    )
    .await;
    let response = actix_test::call_service(&app, request.to_request()).await;
    let status = response.status();
    let bytes = actix_test::read_body(response).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}
