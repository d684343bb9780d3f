//! Filesystem-backed [`CacheStore`].
//!
//! One CSV file per key. Writes go through a single lock and land via a
//! temporary file plus rename, so readers never observe a half-written
//! table and the store has exactly one writer at a time.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crime_hotspots_incident_models::{CacheKey, IncidentRecord};

use crate::{CacheError, CacheStore, paths};

/// Cache store rooted at a directory on disk.
pub struct FsCacheStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FsCacheStore {
    /// Creates a store rooted at `root`. The directory is created lazily on
    /// the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store at [`paths::default_cache_root`].
    #[must_use]
    pub fn open_default() -> Self {
        Self::new(paths::default_cache_root())
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file that holds (or would hold) `key`.
    #[must_use]
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        paths::artifact_path(&self.root, key)
    }

    fn read_table(path: &Path) -> Result<Option<Vec<IncidentRecord>>, CacheError> {
        let mut reader = csv::ReaderBuilder::new().from_path(path)?;

        let headers = reader.headers()?.clone();
        if !headers.iter().eq(IncidentRecord::COLUMNS.iter().copied()) {
            log::warn!(
                "Ignoring cached table with outdated columns: {}",
                path.display()
            );
            return Ok(None);
        }

        let records = reader
            .deserialize()
            .collect::<Result<Vec<IncidentRecord>, _>>()?;

        Ok(Some(records))
    }

    fn write_table(path: &Path, records: &[IncidentRecord]) -> Result<(), CacheError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(File::create(path)?);

        writer.write_record(IncidentRecord::COLUMNS)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        Ok(())
    }
}

impl CacheStore for FsCacheStore {
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<IncidentRecord>>, CacheError> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }

        let table = Self::read_table(&path)?;
        if let Some(records) = &table {
            log::debug!("Cache hit: {} ({} rows)", path.display(), records.len());
        }
        Ok(table)
    }

    fn put(&self, key: &CacheKey, records: &[IncidentRecord]) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let _guard = self.write_lock.lock().map_err(|_| CacheError::Poisoned)?;

        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }

        let tmp = path.with_extension(format!("{}.tmp", paths::TABLE_EXTENSION));
        Self::write_table(&tmp, records)?;
        std::fs::rename(&tmp, &path)?;

        log::debug!("Cached {} rows at {}", records.len(), path.display());
        Ok(())
    }

    fn clear(&self, location_type: &str) -> Result<(), CacheError> {
        let dir = paths::location_type_dir(&self.root, location_type);
        let _guard = self.write_lock.lock().map_err(|_| CacheError::Poisoned)?;

        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
            log::info!("Cleared cache at {}", dir.display());
        }
        Ok(())
    }
}
