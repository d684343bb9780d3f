//! Candidate scope and distance metric for nearest-street matching.

use geo::{Distance as _, Euclidean, Haversine, Point};
use serde::{Deserialize, Serialize};

/// Which descriptive streets a generic location may be mapped to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingScope {
    /// Only streets recorded in the same area.
    #[default]
    SameArea,
    /// Streets from any area in the session.
    Global,
}

/// How to measure the distance between two coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Straight-line distance in degrees. Cheap, and adequate for ranking
    /// nearby points at UK latitudes.
    #[default]
    Euclidean,
    /// Great-circle distance in metres.
    Haversine,
}

impl DistanceMetric {
    /// Distance between two `(latitude, longitude)` points.
    #[must_use]
    pub fn between(self, a: (f64, f64), b: (f64, f64)) -> f64 {
        let a = Point::new(a.1, a.0);
        let b = Point::new(b.1, b.0);
        match self {
            Self::Euclidean => Euclidean.distance(a, b),
            Self::Haversine => Haversine.distance(a, b),
        }
    }
}
