//! In-memory [`CacheStore`] for tests and dry runs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crime_hotspots_incident_models::{CacheKey, IncidentRecord};

use crate::{CacheError, CacheStore};

/// Cache store that keeps every table in a map.
#[derive(Default)]
pub struct MemoryCacheStore {
    tables: RwLock<BTreeMap<CacheKey, Vec<IncidentRecord>>>,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.read().map_or(0, |t| t.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys currently stored, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<CacheKey> {
        self.tables
            .read()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<IncidentRecord>>, CacheError> {
        let tables = self.tables.read().map_err(|_| CacheError::Poisoned)?;
        Ok(tables.get(key).cloned())
    }

    fn put(&self, key: &CacheKey, records: &[IncidentRecord]) -> Result<(), CacheError> {
        let mut tables = self.tables.write().map_err(|_| CacheError::Poisoned)?;
        tables.insert(key.clone(), records.to_vec());
        Ok(())
    }

    fn clear(&self, location_type: &str) -> Result<(), CacheError> {
        let mut tables = self.tables.write().map_err(|_| CacheError::Poisoned)?;
        tables.retain(|key, _| key.location_type != location_type);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;
    use crime_hotspots_incident_models::{MonthToken, UsageKind};

    #[test]
    fn round_trips_and_overwrites() {
        let store = MemoryCacheStore::new();
        let month = MonthToken::new(2024, 1).unwrap();
        let key = CacheKey::new(
            "constituencies",
            "Leeds Central",
            UsageKind::Crime,
            Some("burglary"),
            month,
        );

        assert!(store.get(&key).unwrap().is_none());

        let table = vec![
            record("Leeds Central", month, "High Street"),
            record("Leeds Central", month, "Park Lane"),
        ];
        store.put(&key, &table).unwrap();
        assert_eq!(store.get(&key).unwrap().unwrap().len(), 2);

        store.put(&key, &table[..1]).unwrap();
        assert_eq!(store.get(&key).unwrap().unwrap().len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_only_touches_one_location_type() {
        let store = MemoryCacheStore::new();
        let month = MonthToken::new(2024, 1).unwrap();
        let a = CacheKey::new("constituencies", "A", UsageKind::StopSearch, None, month);
        let b = CacheKey::new("wards", "B", UsageKind::StopSearch, None, month);
        store.put(&a, &[]).unwrap();
        store.put(&b, &[]).unwrap();

        store.clear("constituencies").unwrap();

        assert_eq!(store.keys(), vec![b]);
    }
}
