#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library behind the `crime_hotspots_ingest` CLI.
//!
//! Ties the pipeline together: boundaries are imported, a window of months
//! is planned, incidents are aggregated through the cache and the police
//! API, generic locations are resolved, and the resolved set is written
//! back to the cache and optionally exported as CSV.

pub mod export;
pub mod session;
pub mod settings;

use crime_hotspots_cache::CacheError;
use crime_hotspots_geography::GeographyError;
use crime_hotspots_incident_models::{Category, ConfigurationError, UsageKind, find_category};
use crime_hotspots_resolver::ResolveError;
use crime_hotspots_source::FetchError;
use crime_hotspots_source::aggregate::AggregateError;
use crime_hotspots_source::api::ALL_CRIME;
use thiserror::Error;

pub use session::{AreaSummary, Session};
pub use settings::{Settings, SettingsError};

/// Errors surfaced by the ingest pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Boundary import failed: {0}")]
    Geography(#[from] GeographyError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested crime category is not published by the API.
    #[error("Unknown crime category {0:?}; run `categories` to list them")]
    UnknownCategory(String),
}

/// Splits a comma-separated list of area names, dropping blanks.
#[must_use]
pub fn parse_area_list(areas: &str) -> Vec<String> {
    areas
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Picks the category slug to query.
///
/// Stop and search has no categories. For crimes, `requested` may be a
/// display name or slug; `None` means every crime.
///
/// # Errors
///
/// Returns [`IngestError::UnknownCategory`] if `requested` matches none of
/// `categories`.
pub fn select_category(
    usage: UsageKind,
    categories: &[Category],
    requested: Option<&str>,
) -> Result<Option<String>, IngestError> {
    if !usage.uses_category() {
        if let Some(requested) = requested {
            log::warn!("Ignoring category {requested:?}: stop and search data has no categories");
        }
        return Ok(None);
    }

    let Some(requested) = requested else {
        return Ok(Some(ALL_CRIME.to_string()));
    };

    find_category(categories, requested)
        .map(|c| Some(c.slug.clone()))
        .ok_or_else(|| IngestError::UnknownCategory(requested.to_string()))
}
