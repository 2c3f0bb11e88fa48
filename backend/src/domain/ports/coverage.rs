//! Port deciding whether a location is inside the serviceable area.
use crate::domain::Coordinates;

/// Geographic coverage of the simulation input datasets.
#[cfg_attr(test, mockall::automock)]
pub trait CoverageMap: Send + Sync {
    fn covers(&self, location: &Coordinates) -> bool;
}
