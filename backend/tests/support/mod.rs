//! Builders shared by the integration tests.
#![allow(dead_code, reason = "each test binary uses a different subset")]

use chrono::{DateTime, TimeZone, Utc};
use irrigation_backend::domain::{
    Coordinates, CropType, CustomParameters, Field, FieldId, IrrigationType, LoraArtaSettings,
    SoilProfile, TelemetricDevice, TelemetricDeviceConfig, TelemetryReading, UserId,
};

/// Serviceable field owned by `owner`.
pub fn field(owner: UserId, name: &str) -> Field {
    Field {
        id: FieldId::random(),
        owner,
        name: name.to_owned(),
        location: Coordinates::new(20.98, 39.15),
        crop_type: CropType {
            id: 3,
            name: "olive".to_owned(),
            root_depth_max: 1.2,
            root_depth_min: 0.6,
            max_allowed_depletion: 0.65,
        },
        irrigation_type: IrrigationType {
            id: 2,
            name: "sprinkler".to_owned(),
            efficiency: 0.75,
        },
        wetted_area: 5000.0,
        use_custom_parameters: false,
        custom: CustomParameters::default(),
        soil: SoilProfile {
            field_capacity: Some(0.3),
            wilting_point: Some(0.12),
        },
        in_covered_area: true,
    }
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, hour, minute, 0)
        .single()
        .expect("valid time")
}

/// LoRA-ARTA registration with a 1:1 volume per unit of frequency at 100%.
pub fn arta_device(field_id: FieldId, device_id: &str) -> TelemetricDeviceConfig {
    TelemetricDeviceConfig {
        field_id,
        device_id: device_id.to_owned(),
        water_percentage: 100,
        device: TelemetricDevice::LoraArta(LoraArtaSettings {
            conversion_rate: 5.0,
            report_frequency_minutes: 5,
        }),
    }
}

pub fn reading(device_id: &str, frequency: f64, timestamp: DateTime<Utc>) -> TelemetryReading {
    TelemetryReading {
        device_id: device_id.to_owned(),
        sensor_frequency: Some(frequency),
        timestamp,
    }
}
