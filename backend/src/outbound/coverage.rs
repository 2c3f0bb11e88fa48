//! Serviceable area defined by a WGS84 bounding box.

use crate::domain::Coordinates;
use crate::domain::ports::CoverageMap;

/// Inclusive longitude/latitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBoxCoverage {
    min: Coordinates,
    max: Coordinates,
}

/// Error returned for an empty or inverted rectangle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("coverage box must satisfy min < max on both axes within WGS84 ranges")]
pub struct InvalidCoverageBox;

impl BoundingBoxCoverage {
    pub fn new(min: Coordinates, max: Coordinates) -> Result<Self, InvalidCoverageBox> {
        let lng_ok = (-180.0..=180.0).contains(&min.longitude)
            && (-180.0..=180.0).contains(&max.longitude)
            && min.longitude < max.longitude;
        let lat_ok = (-90.0..=90.0).contains(&min.latitude)
            && (-90.0..=90.0).contains(&max.latitude)
            && min.latitude < max.latitude;
        if lng_ok && lat_ok {
            Ok(Self { min, max })
        } else {
            Err(InvalidCoverageBox)
        }
    }
}

impl CoverageMap for BoundingBoxCoverage {
    fn covers(&self, location: &Coordinates) -> bool {
        (self.min.longitude..=self.max.longitude).contains(&location.longitude)
            && (self.min.latitude..=self.max.latitude).contains(&location.latitude)
    }
}

/// Used when no box is configured: nothing is serviceable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCoverage;

impl CoverageMap for NoCoverage {
    fn covers(&self, _location: &Coordinates) -> bool {
        false
    }
}
