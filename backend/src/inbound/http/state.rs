//! Shared state for HTTP handlers.
//!
//! Handlers receive [`HttpState`] through `web::Data` and only call domain
//! services, so they can be exercised with mocked ports.

use std::sync::Arc;

use crate::domain::ports::{
    CalculationQueue, CoverageMap, DeviceConfigRepository, FieldRepository, IrrigationRepository,
    JobStatusStore, ProfileRepository, UserRepository,
};
use crate::domain::{
    CalculationDispatcher, DeviceRegistrationService, FieldService, IrrigationDefaultsService,
    IrrigationService, UserOnboardingService,
};

/// Parameter object bundling the ports the HTTP services are built from.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub fields: Arc<dyn FieldRepository>,
    pub irrigations: Arc<dyn IrrigationRepository>,
    pub devices: Arc<dyn DeviceConfigRepository>,
    pub users: Arc<dyn UserRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub coverage: Arc<dyn CoverageMap>,
    pub status: Arc<dyn JobStatusStore>,
    pub queue: Arc<dyn CalculationQueue>,
}

/// Services the handlers call; cloned into each actix worker.
#[derive(Clone)]
pub struct HttpState {
    pub calculations: CalculationDispatcher,
    pub fields: FieldService,
    pub irrigations: IrrigationService,
    pub defaults: IrrigationDefaultsService<dyn IrrigationRepository>,
    pub devices: DeviceRegistrationService,
    pub onboarding: UserOnboardingService,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        let calculations = CalculationDispatcher::new(
            ports.status,
            ports.queue,
            Arc::clone(&ports.fields),
        );
        Self {
            fields: FieldService::new(
                Arc::clone(&ports.fields),
                ports.coverage,
                calculations.clone(),
            ),
            irrigations: IrrigationService::new(
                Arc::clone(&ports.fields),
                Arc::clone(&ports.irrigations),
                calculations.clone(),
            ),
            defaults: IrrigationDefaultsService::new(Arc::clone(&ports.irrigations)),
            devices: DeviceRegistrationService::new(
                ports.fields,
                ports.devices,
                ports.irrigations,
                calculations.clone(),
            ),
            onboarding: UserOnboardingService::new(ports.users, ports.profiles),
            calculations,
        }
    }
}
