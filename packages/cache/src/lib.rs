#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cache of monthly incident tables.
//!
//! Each [`CacheKey`] addresses exactly one artifact. Reads return `None`
//! when nothing is stored; writes overwrite unconditionally. There is no
//! expiry: artifacts live until [`CacheStore::clear`] removes them.
//!
//! [`FsCacheStore`] keeps one CSV file per key under a cache root,
//! [`MemoryCacheStore`] keeps tables in a map for tests.

pub mod fs;
pub mod memory;
pub mod paths;

use std::collections::BTreeMap;

use crime_hotspots_incident_models::{CacheKey, IncidentRecord, MonthToken, UsageKind};
use thiserror::Error;

pub use fs::FsCacheStore;
pub use memory::MemoryCacheStore;

/// Errors that can occur while reading or writing the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cached table could not be read or written as CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Another thread panicked while holding the cache lock.
    #[error("Cache lock poisoned")]
    Poisoned,
}

/// Key-to-table storage for monthly incident data.
///
/// Implementations must make [`put`](Self::put) safe to call from several
/// threads; concurrent writes to the same key resolve as last write wins.
pub trait CacheStore: Send + Sync {
    /// Returns the stored table for `key`, or `None` if there isn't one.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if a stored table exists but cannot be read.
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<IncidentRecord>>, CacheError>;

    /// Stores `records` under `key`, replacing anything already there.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the table cannot be written.
    fn put(&self, key: &CacheKey, records: &[IncidentRecord]) -> Result<(), CacheError>;

    /// Removes every artifact stored for `location_type`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if removal fails.
    fn clear(&self, location_type: &str) -> Result<(), CacheError>;
}

/// Writes a whole session's records back to the cache, one artifact per
/// `(area, month)` unit.
///
/// Units with no records are written as empty tables so that months
/// known to be empty are not fetched again. Records belonging to units
/// not listed in `units` are left out.
///
/// Returns the number of artifacts written.
///
/// # Errors
///
/// Returns the first [`CacheError`] encountered.
pub fn write_session(
    store: &dyn CacheStore,
    location_type: &str,
    usage: UsageKind,
    category: Option<&str>,
    units: &[(String, MonthToken)],
    records: &[IncidentRecord],
) -> Result<usize, CacheError> {
    let mut groups: BTreeMap<(String, MonthToken), Vec<IncidentRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.area_name.clone(), record.month))
            .or_default()
            .push(record.clone());
    }

    let mut written = 0;
    for (area_name, month) in units {
        let key = CacheKey::new(location_type, area_name, usage, category, *month);
        let table = groups
            .remove(&(area_name.clone(), *month))
            .unwrap_or_default();
        store.put(&key, &table)?;
        written += 1;
    }

    log::info!("Wrote {written} cache artifacts for {location_type}");

    Ok(written)
}
