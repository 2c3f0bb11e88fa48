//! Irrigable field model and its effective agronomic parameters.
//!
//! A field references a crop type and an irrigation type. When the owner
//! enables custom parameters, any non-zero override replaces the value the
//! crop or irrigation type would otherwise supply.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{DomainError, FieldId, UserId};

/// Irrigation optimiser applied when no custom value is set.
pub const DEFAULT_IRRIGATION_OPTIMIZER: f64 = 0.5;

/// WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// Crop characteristics shared by every field growing that crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropType {
    pub id: i64,
    pub name: String,
    /// Metres.
    pub root_depth_max: f64,
    /// Metres.
    pub root_depth_min: f64,
    /// Fraction of total available water that may be depleted before stress.
    pub max_allowed_depletion: f64,
}

/// Irrigation method with its application efficiency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationType {
    pub id: i64,
    pub name: String,
    pub efficiency: f64,
}

/// Owner-supplied overrides. A value of `None` or zero means "not set".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomParameters {
    pub root_depth_max: Option<f64>,
    pub root_depth_min: Option<f64>,
    pub max_allowed_depletion: Option<f64>,
    pub efficiency: Option<f64>,
    pub irrigation_optimizer: Option<f64>,
    pub field_capacity: Option<f64>,
    pub wilting_point: Option<f64>,
}

/// Soil hydraulic properties sampled for the field location.
///
/// Both values are absent for fields outside the serviceable area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilProfile {
    pub field_capacity: Option<f64>,
    pub wilting_point: Option<f64>,
}

/// An irrigable land unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub owner: UserId,
    pub name: String,
    pub location: Coordinates,
    pub crop_type: CropType,
    pub irrigation_type: IrrigationType,
    /// Square metres.
    pub wetted_area: f64,
    pub use_custom_parameters: bool,
    pub custom: CustomParameters,
    pub soil: SoilProfile,
    /// Whether the location lies inside the coverage of the input datasets.
    pub in_covered_area: bool,
}

fn set(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

impl Field {
    fn custom(&self, pick: impl Fn(&CustomParameters) -> Option<f64>) -> Option<f64> {
        if self.use_custom_parameters {
            set(pick(&self.custom))
        } else {
            None
        }
    }

    /// Fields outside the covered area skip computation entirely.
    pub fn is_serviceable(&self) -> bool {
        self.in_covered_area
    }

    /// Maximum allowed depletion fraction.
    pub fn p(&self) -> f64 {
        self.custom(|c| c.max_allowed_depletion)
            .unwrap_or(self.crop_type.max_allowed_depletion)
    }

    pub fn root_depth_max(&self) -> f64 {
        self.custom(|c| c.root_depth_max)
            .unwrap_or(self.crop_type.root_depth_max)
    }

    pub fn root_depth_min(&self) -> f64 {
        self.custom(|c| c.root_depth_min)
            .unwrap_or(self.crop_type.root_depth_min)
    }

    /// Mean of the maximum and minimum root depth.
    pub fn root_depth(&self) -> f64 {
        (self.root_depth_max() + self.root_depth_min()) / 2.0
    }

    pub fn irrigation_efficiency(&self) -> f64 {
        self.custom(|c| c.efficiency)
            .unwrap_or(self.irrigation_type.efficiency)
    }

    pub fn irrigation_optimizer(&self) -> f64 {
        self.custom(|c| c.irrigation_optimizer)
            .unwrap_or(DEFAULT_IRRIGATION_OPTIMIZER)
    }

    /// Effective field capacity, `None` when neither an override nor a
    /// sampled value exists.
    pub fn field_capacity(&self) -> Option<f64> {
        self.custom(|c| c.field_capacity)
            .or_else(|| self.default_soil().field_capacity)
    }

    pub fn wilting_point(&self) -> Option<f64> {
        self.custom(|c| c.wilting_point)
            .or_else(|| self.default_soil().wilting_point)
    }

    /// Check owner-editable values: a name, a positive wetted area and
    /// custom overrides inside agronomically plausible ranges.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut invalid = Vec::new();
        if self.name.trim().is_empty() {
            invalid.push("name");
        }
        if !(self.wetted_area.is_finite() && self.wetted_area > 0.0) {
            invalid.push("wettedArea");
        }
        let c = &self.custom;
        let bounded: [(&'static str, Option<f64>, f64, f64); 7] = [
            ("customRootDepthMax", c.root_depth_max, 0.2, 4.0),
            ("customRootDepthMin", c.root_depth_min, 0.1, 2.0),
            ("customMaxAllowedDepletion", c.max_allowed_depletion, 0.0, 0.99),
            ("customEfficiency", c.efficiency, 0.05, 1.0),
            ("customIrrigationOptimizer", c.irrigation_optimizer, 0.1, 1.0),
            ("customFieldCapacity", c.field_capacity, 0.1, 0.45),
            ("customWiltingPoint", c.wilting_point, 0.0, 0.22),
        ];
        for (name, value, min, max) in bounded {
            if value.is_some_and(|v| !(min..=max).contains(&v)) {
                invalid.push(name);
            }
        }
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(DomainError::invalid_request("field parameters are invalid")
                .with_details(json!({ "invalid": invalid })))
        }
    }

    fn default_soil(&self) -> SoilProfile {
        if self.in_covered_area {
            self.soil
        } else {
            SoilProfile::default()
        }
    }
}
