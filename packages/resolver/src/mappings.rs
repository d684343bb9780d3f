//! Mapping table from generic locations to their nearest descriptive street.

use std::collections::{HashMap, HashSet};

use crime_hotspots_incident_models::IncidentRecord;

use crate::distance::{DistanceMetric, MappingScope};
use crate::vocabulary::Vocabulary;

/// Canonical street given to generic locations with no descriptive street
/// in scope.
pub const SENTINEL: &str = "DEADBEEF";

/// One distinct generic location and the street it maps to.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    pub latitude: f64,
    pub longitude: f64,
    /// The generic street label, e.g. `"Parking Area"`.
    pub original_street: String,
    pub area_name: String,
    /// Nearest descriptive street, or [`SENTINEL`].
    pub canonical_street: String,
    /// `false` when no descriptive street was in scope.
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LocationKey {
    area_name: String,
    latitude: u64,
    longitude: u64,
    street: String,
}

impl LocationKey {
    fn new(area_name: &str, latitude: f64, longitude: f64, street: &str) -> Self {
        Self {
            area_name: area_name.to_string(),
            latitude: latitude.to_bits(),
            longitude: longitude.to_bits(),
            street: street.to_string(),
        }
    }

    fn of(record: &IncidentRecord) -> Self {
        Self::new(
            &record.area_name,
            record.latitude,
            record.longitude,
            record.published_street(),
        )
    }
}

/// Mappings for every generic location in a record set, in first-seen
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationMappings {
    entries: Vec<MappingEntry>,
    index: HashMap<LocationKey, usize>,
}

impl LocationMappings {
    #[must_use]
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with no descriptive street in scope.
    pub fn unmatched(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter().filter(|e| !e.matched)
    }

    /// Looks up the entry for a generic location.
    #[must_use]
    pub fn get(
        &self,
        area_name: &str,
        latitude: f64,
        longitude: f64,
        street: &str,
    ) -> Option<&MappingEntry> {
        let key = LocationKey::new(area_name, latitude, longitude, street);
        self.index.get(&key).map(|&i| &self.entries[i])
    }

    /// Looks up the entry for `record`'s location.
    #[must_use]
    pub fn for_record(&self, record: &IncidentRecord) -> Option<&MappingEntry> {
        self.index.get(&LocationKey::of(record)).map(|&i| &self.entries[i])
    }
}

struct Candidate<'a> {
    latitude: f64,
    longitude: f64,
    street: &'a str,
    area_name: &'a str,
    resolved: bool,
}

/// Builds mappings for every generic location in `records`.
///
/// Records are grouped by `(latitude, longitude, street, area)` using the
/// published street, so records resolved by an earlier run are grouped with
/// their generic label again. Each generic group is mapped to the nearest
/// descriptive group in `scope`; ties go to the descriptive group seen
/// first. Resolved records never act as descriptive streets.
pub(crate) fn build(
    records: &[IncidentRecord],
    vocabulary: &Vocabulary,
    scope: MappingScope,
    metric: DistanceMetric,
) -> LocationMappings {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for record in records {
        if seen.insert(LocationKey::of(record)) {
            candidates.push(Candidate {
                latitude: record.latitude,
                longitude: record.longitude,
                street: record.published_street(),
                area_name: &record.area_name,
                resolved: record.is_resolved(),
            });
        }
    }

    let (generic, mut descriptive): (Vec<&Candidate>, Vec<&Candidate>) = candidates
        .iter()
        .partition(|c| vocabulary.is_generic(c.street));
    descriptive.retain(|c| !c.resolved);

    let mut mappings = LocationMappings::default();

    for location in generic {
        let origin = (location.latitude, location.longitude);
        let mut nearest: Option<(&Candidate, f64)> = None;

        for candidate in descriptive
            .iter()
            .filter(|c| scope == MappingScope::Global || c.area_name == location.area_name)
        {
            let distance = metric.between(origin, (candidate.latitude, candidate.longitude));
            if nearest.is_none_or(|(_, best)| distance < best) {
                nearest = Some((*candidate, distance));
            }
        }

        let (canonical_street, matched) = match nearest {
            Some((candidate, _)) => (candidate.street.to_string(), true),
            None => {
                log::warn!(
                    "No descriptive street near {} ({}, {}) in {}",
                    location.street,
                    location.latitude,
                    location.longitude,
                    location.area_name,
                );
                (SENTINEL.to_string(), false)
            }
        };

        let key = LocationKey::new(
            location.area_name,
            location.latitude,
            location.longitude,
            location.street,
        );
        mappings.index.insert(key, mappings.entries.len());
        mappings.entries.push(MappingEntry {
            latitude: location.latitude,
            longitude: location.longitude,
            original_street: location.street.to_string(),
            area_name: location.area_name.to_string(),
            canonical_street,
            matched,
        });
    }

    log::info!(
        "Mapped {} generic locations from {} distinct locations ({} unmatched)",
        mappings.len(),
        candidates.len(),
        mappings.unmatched().count(),
    );

    mappings
}
