//! Internal Diesel row structs and their conversions to domain types.
//!
//! Rows never leave the persistence module. Conversions from rows are
//! fallible because stored codes (irrigation kinds, cadences, device kinds)
//! are plain strings; a bad value surfaces as a `String` message that the
//! repository wraps in its query error.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    applied_irrigations, crop_types, fields, irrigation_types, profiles, telemetric_devices, users,
};
use crate::domain::{
    AppliedIrrigation, AutomaticIrrigation, Cadence, Coordinates, CropType, CustomParameters,
    EmailLanguage, Field, IrrigationId, IrrigationKind, IrrigationMeasurement, IrrigationType,
    ManualIrrigation, Profile, SoilProfile, TelemetricDevice, TelemetricDeviceConfig,
    TelemetricDeviceKind, User,
};

/// Collect row conversions, mapping the first failure through `map_err`.
pub(crate) fn collect_rows<T, E>(
    results: impl Iterator<Item = Result<T, String>>,
    map_err: impl FnOnce(String) -> E,
) -> Result<Vec<T>, E> {
    results.collect::<Result<Vec<_>, _>>().map_err(map_err)
}

// ---------------------------------------------------------------------------
// Users and profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id.into(),
            username: row.username,
            email: row.email,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub email: &'a str,
}

impl<'a> From<&'a User> for NewUserRow<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: *user.id.as_uuid(),
            username: &user.username,
            email: &user.email,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = profiles)]
#[diesel(primary_key(user_id))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ProfileRow {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub notification: Option<String>,
    pub email_language: String,
    pub supervisor_id: Option<Uuid>,
    pub supervision_question: bool,
}

impl From<&Profile> for ProfileRow {
    fn from(profile: &Profile) -> Self {
        Self {
            user_id: *profile.user_id.as_uuid(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            address: profile.address.clone(),
            notification: profile.notification.map(|c| c.code().to_owned()),
            email_language: profile.email_language.code().to_owned(),
            supervisor_id: profile.supervisor.map(|id| *id.as_uuid()),
            supervision_question: profile.supervision_question,
        }
    }
}

impl TryFrom<ProfileRow> for Profile {
    type Error = String;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let notification = row
            .notification
            .as_deref()
            .map(str::parse::<Cadence>)
            .transpose()
            .map_err(|err| err.to_string())?;
        let email_language = row
            .email_language
            .parse::<EmailLanguage>()
            .map_err(|err| err.to_string())?;
        Ok(Self {
            user_id: row.user_id.into(),
            first_name: row.first_name,
            last_name: row.last_name,
            address: row.address,
            notification,
            email_language,
            supervisor: row.supervisor_id.map(Into::into),
            supervision_question: row.supervision_question,
        })
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crop_types)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CropTypeRow {
    pub id: i64,
    pub name: String,
    pub root_depth_max: f64,
    pub root_depth_min: f64,
    pub max_allowed_depletion: f64,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = irrigation_types)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct IrrigationTypeRow {
    pub id: i64,
    pub name: String,
    pub efficiency: f64,
}

/// Field columns; used for reads and for upserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = fields)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FieldRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    pub crop_type_id: i64,
    pub irrigation_type_id: i64,
    pub wetted_area: f64,
    pub use_custom_parameters: bool,
    pub custom_root_depth_max: Option<f64>,
    pub custom_root_depth_min: Option<f64>,
    pub custom_max_allowed_depletion: Option<f64>,
    pub custom_efficiency: Option<f64>,
    pub custom_irrigation_optimizer: Option<f64>,
    pub custom_field_capacity: Option<f64>,
    pub custom_wilting_point: Option<f64>,
    pub soil_field_capacity: Option<f64>,
    pub soil_wilting_point: Option<f64>,
    pub in_covered_area: bool,
    pub updated_at: DateTime<Utc>,
}

impl FieldRow {
    pub(crate) fn from_domain(field: &Field, updated_at: DateTime<Utc>) -> Self {
        let custom = &field.custom;
        Self {
            id: *field.id.as_uuid(),
            owner_id: *field.owner.as_uuid(),
            name: field.name.clone(),
            longitude: field.location.longitude,
            latitude: field.location.latitude,
            crop_type_id: field.crop_type.id,
            irrigation_type_id: field.irrigation_type.id,
            wetted_area: field.wetted_area,
            use_custom_parameters: field.use_custom_parameters,
            custom_root_depth_max: custom.root_depth_max,
            custom_root_depth_min: custom.root_depth_min,
            custom_max_allowed_depletion: custom.max_allowed_depletion,
            custom_efficiency: custom.efficiency,
            custom_irrigation_optimizer: custom.irrigation_optimizer,
            custom_field_capacity: custom.field_capacity,
            custom_wilting_point: custom.wilting_point,
            soil_field_capacity: field.soil.field_capacity,
            soil_wilting_point: field.soil.wilting_point,
            in_covered_area: field.in_covered_area,
            updated_at,
        }
    }

    pub(crate) fn into_domain(self, crop: CropTypeRow, irrigation: IrrigationTypeRow) -> Field {
        Field {
            id: self.id.into(),
            owner: self.owner_id.into(),
            name: self.name,
            location: Coordinates::new(self.longitude, self.latitude),
            crop_type: CropType {
                id: crop.id,
                name: crop.name,
                root_depth_max: crop.root_depth_max,
                root_depth_min: crop.root_depth_min,
                max_allowed_depletion: crop.max_allowed_depletion,
            },
            irrigation_type: IrrigationType {
                id: irrigation.id,
                name: irrigation.name,
                efficiency: irrigation.efficiency,
            },
            wetted_area: self.wetted_area,
            use_custom_parameters: self.use_custom_parameters,
            custom: CustomParameters {
                root_depth_max: self.custom_root_depth_max,
                root_depth_min: self.custom_root_depth_min,
                max_allowed_depletion: self.custom_max_allowed_depletion,
                efficiency: self.custom_efficiency,
                irrigation_optimizer: self.custom_irrigation_optimizer,
                field_capacity: self.custom_field_capacity,
                wilting_point: self.custom_wilting_point,
            },
            soil: SoilProfile {
                field_capacity: self.soil_field_capacity,
                wilting_point: self.soil_wilting_point,
            },
            in_covered_area: self.in_covered_area,
        }
    }
}

// ---------------------------------------------------------------------------
// Applied irrigations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = applied_irrigations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct IrrigationRow {
    pub id: Uuid,
    pub field_id: Uuid,
    pub irrigated_at: DateTime<Utc>,
    pub irrigation_kind: String,
    pub supplied_water_volume: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub flow_rate: Option<f64>,
    pub reading_start: Option<f64>,
    pub reading_end: Option<f64>,
    pub water_percentage: Option<i16>,
    pub is_automatically_reported: bool,
}

/// Columns rewritten by an update; operand columns of other kinds are
/// cleared.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = applied_irrigations)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct IrrigationChangeset {
    pub irrigated_at: DateTime<Utc>,
    pub irrigation_kind: String,
    pub supplied_water_volume: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub flow_rate: Option<f64>,
    pub reading_start: Option<f64>,
    pub reading_end: Option<f64>,
    pub water_percentage: Option<i16>,
}

impl IrrigationChangeset {
    pub(crate) fn new(timestamp: DateTime<Utc>, measurement: &IrrigationMeasurement) -> Self {
        let mut changeset = Self {
            irrigated_at: timestamp,
            irrigation_kind: measurement.kind().code().to_owned(),
            supplied_water_volume: None,
            duration_minutes: None,
            flow_rate: None,
            reading_start: None,
            reading_end: None,
            water_percentage: None,
        };
        match *measurement {
            IrrigationMeasurement::Volume { volume } => changeset.supplied_water_volume = volume,
            IrrigationMeasurement::DurationFlow {
                duration_minutes,
                flow_rate,
            } => {
                changeset.duration_minutes =
                    duration_minutes.map(|m| i32::try_from(m).unwrap_or(i32::MAX));
                changeset.flow_rate = flow_rate;
            }
            IrrigationMeasurement::Flowmeter {
                reading_start,
                reading_end,
                water_percentage,
            } => {
                changeset.reading_start = reading_start;
                changeset.reading_end = reading_end;
                changeset.water_percentage = water_percentage.map(i16::from);
            }
        }
        changeset
    }

    fn into_row(self, id: Uuid, field_id: Uuid, automatic: bool) -> IrrigationRow {
        IrrigationRow {
            id,
            field_id,
            irrigated_at: self.irrigated_at,
            irrigation_kind: self.irrigation_kind,
            supplied_water_volume: self.supplied_water_volume,
            duration_minutes: self.duration_minutes,
            flow_rate: self.flow_rate,
            reading_start: self.reading_start,
            reading_end: self.reading_end,
            water_percentage: self.water_percentage,
            is_automatically_reported: automatic,
        }
    }
}

impl IrrigationRow {
    pub(crate) fn manual(id: IrrigationId, record: &ManualIrrigation) -> Self {
        IrrigationChangeset::new(record.timestamp, &record.measurement).into_row(
            *id.as_uuid(),
            *record.field_id.as_uuid(),
            false,
        )
    }

    pub(crate) fn automatic(id: IrrigationId, record: &AutomaticIrrigation) -> Self {
        let measurement = IrrigationMeasurement::Volume {
            volume: Some(record.volume),
        };
        IrrigationChangeset::new(record.timestamp, &measurement).into_row(
            *id.as_uuid(),
            *record.field_id.as_uuid(),
            true,
        )
    }

    fn measurement(&self) -> Result<IrrigationMeasurement, String> {
        let kind = self
            .irrigation_kind
            .parse::<IrrigationKind>()
            .map_err(|err| err.to_string())?;
        Ok(match kind {
            IrrigationKind::Volume => IrrigationMeasurement::Volume {
                volume: self.supplied_water_volume,
            },
            IrrigationKind::DurationFlow => IrrigationMeasurement::DurationFlow {
                duration_minutes: self.duration_minutes.and_then(|m| u32::try_from(m).ok()),
                flow_rate: self.flow_rate,
            },
            IrrigationKind::Flowmeter => IrrigationMeasurement::Flowmeter {
                reading_start: self.reading_start,
                reading_end: self.reading_end,
                water_percentage: self.water_percentage.and_then(|p| u8::try_from(p).ok()),
            },
        })
    }
}

impl TryFrom<IrrigationRow> for AppliedIrrigation {
    type Error = String;

    fn try_from(row: IrrigationRow) -> Result<Self, Self::Error> {
        let measurement = row.measurement()?;
        Ok(Self {
            id: row.id.into(),
            field_id: row.field_id.into(),
            timestamp: row.irrigated_at,
            measurement,
            is_automatic: row.is_automatically_reported,
        })
    }
}

impl TryFrom<IrrigationRow> for AutomaticIrrigation {
    type Error = String;

    fn try_from(row: IrrigationRow) -> Result<Self, Self::Error> {
        let volume = row
            .supplied_water_volume
            .ok_or_else(|| format!("automatic irrigation {} has no volume", row.id))?;
        Ok(Self {
            field_id: row.field_id.into(),
            timestamp: row.irrigated_at,
            volume,
        })
    }
}

// ---------------------------------------------------------------------------
// Telemetric devices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = telemetric_devices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DeviceRow {
    pub field_id: Uuid,
    pub device_kind: String,
    pub device_id: String,
    pub water_percentage: i16,
    /// Kind-specific settings without the kind tag.
    pub settings: serde_json::Value,
}

impl TryFrom<&TelemetricDeviceConfig> for DeviceRow {
    type Error = String;

    fn try_from(config: &TelemetricDeviceConfig) -> Result<Self, Self::Error> {
        let settings = match &config.device {
            TelemetricDevice::LoraArta(settings) => serde_json::to_value(settings),
        }
        .map_err(|err| err.to_string())?;
        Ok(Self {
            field_id: *config.field_id.as_uuid(),
            device_kind: config.kind().code().to_owned(),
            device_id: config.device_id.clone(),
            water_percentage: i16::from(config.water_percentage),
            settings,
        })
    }
}

impl TryFrom<DeviceRow> for TelemetricDeviceConfig {
    type Error = String;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        let kind = row
            .device_kind
            .parse::<TelemetricDeviceKind>()
            .map_err(|err| err.to_string())?;
        let device = match kind {
            TelemetricDeviceKind::LoraArta => serde_json::from_value(row.settings)
                .map(TelemetricDevice::LoraArta)
                .map_err(|err| format!("invalid {kind} settings: {err}"))?,
        };
        let water_percentage = u8::try_from(row.water_percentage)
            .map_err(|_| format!("water percentage {} out of range", row.water_percentage))?;
        Ok(Self {
            field_id: row.field_id.into(),
            device_id: row.device_id,
            water_percentage,
            device,
        })
    }
}
