#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Boundary geometry for the crime hotspots pipeline.
//!
//! Reads area boundaries from a `GeoJSON` feature collection, normalizes
//! every shape into a [`geo::MultiPolygon`], and turns each ring into the
//! `poly=` query string the police API expects.

pub mod normalize;
pub mod query;

use thiserror::Error;

pub use query::{MAX_QUERY_LEN, QueryError};

/// Errors that can occur while importing boundaries.
#[derive(Debug, Error)]
pub enum GeographyError {
    /// The boundary file is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The boundary file is valid `GeoJSON` but not a feature collection.
    #[error("Expected a GeoJSON FeatureCollection")]
    NotFeatureCollection,

    /// A feature's geometry is neither a polygon nor a multipolygon.
    #[error("Unsupported geometry for {name:?}: {kind}")]
    UnsupportedGeometry {
        /// Display name of the offending feature.
        name: String,
        /// Geometry type that was found.
        kind: String,
    },

    /// Two features share the same display name.
    #[error("Duplicate area name {0:?}")]
    DuplicateArea(String),

    /// A requested area is not present in the boundary file.
    #[error("Unknown area {0:?}")]
    UnknownArea(String),
}
