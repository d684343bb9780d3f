#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the cache directory.
//!
//! Layout: `<root>/<location_type>/<area>/<usage>[/<category>]/<month>.csv`.

use std::path::{Path, PathBuf};

use crime_hotspots_incident_models::CacheKey;

/// Name of the cache directory created under the user's home directory.
pub const CACHE_DIR_NAME: &str = ".crime_hotspots_cache";

/// File extension of cached tables.
pub const TABLE_EXTENSION: &str = "csv";

/// Returns the default cache root, `~/.crime_hotspots_cache`.
///
/// Falls back to the current directory when no home directory is set.
#[must_use]
pub fn default_cache_root() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(CACHE_DIR_NAME)
}

/// Returns the directory holding every artifact for `location_type`.
#[must_use]
pub fn location_type_dir(root: &Path, location_type: &str) -> PathBuf {
    root.join(segment(location_type))
}

/// Returns the artifact path for `key`.
#[must_use]
pub fn artifact_path(root: &Path, key: &CacheKey) -> PathBuf {
    let mut path = location_type_dir(root, &key.location_type)
        .join(segment(&key.area_name))
        .join(key.usage.to_string());

    if let Some(category) = &key.category {
        path = path.join(segment(category));
    }

    path.join(format!("{}.{TABLE_EXTENSION}", key.month))
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Makes a name safe to use as a single path component.
fn segment(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}
