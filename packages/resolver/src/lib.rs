#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Location resolution for police API incidents.
//!
//! Incidents at generic locations ("Parking Area", "Supermarket") are
//! re-labelled with the nearest descriptive street recorded in the same
//! session. Resolution runs in two phases:
//!
//! 1. [`LocationResolver::create_mappings`] pairs each distinct generic
//!    location with its nearest descriptive street.
//! 2. [`LocationResolver::fix_locations`] rewrites every record at a
//!    generic location using those mappings.
//!
//! [`LocationResolver::resolve`] runs both. Records are never modified in
//! place; each phase returns new values.

pub mod distance;
pub mod mappings;
pub mod vocabulary;

use crime_hotspots_incident_models::IncidentRecord;
use thiserror::Error;

pub use distance::{DistanceMetric, MappingScope};
pub use mappings::{LocationMappings, MappingEntry, SENTINEL};
pub use vocabulary::{DEFAULT_GENERIC_LABELS, Vocabulary};

/// Errors from location resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Resolution was asked for before there were records to resolve, or
    /// resolved output was asked for before resolution ran.
    #[error("Locations not fixed: {0}")]
    LocationsNotFixed(String),
}

/// Records after location resolution, with the mappings that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIncidents {
    records: Vec<IncidentRecord>,
    mappings: LocationMappings,
}

impl ResolvedIncidents {
    #[must_use]
    pub fn records(&self) -> &[IncidentRecord] {
        &self.records
    }

    #[must_use]
    pub const fn mappings(&self) -> &LocationMappings {
        &self.mappings
    }

    #[must_use]
    pub fn into_records(self) -> Vec<IncidentRecord> {
        self.records
    }
}

/// Maps generic locations to nearby descriptive streets.
#[derive(Debug, Clone, Default)]
pub struct LocationResolver {
    vocabulary: Vocabulary,
    scope: MappingScope,
    metric: DistanceMetric,
}

impl LocationResolver {
    #[must_use]
    pub const fn new(vocabulary: Vocabulary, scope: MappingScope, metric: DistanceMetric) -> Self {
        Self {
            vocabulary,
            scope,
            metric,
        }
    }

    /// Builds the mapping table for `records`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::LocationsNotFixed`] if `records` is empty.
    pub fn create_mappings(
        &self,
        records: &[IncidentRecord],
    ) -> Result<LocationMappings, ResolveError> {
        if records.is_empty() {
            return Err(ResolveError::LocationsNotFixed(
                "no records to build mappings from".to_string(),
            ));
        }

        Ok(mappings::build(
            records,
            &self.vocabulary,
            self.scope,
            self.metric,
        ))
    }

    /// Returns a copy of `records` with generic locations rewritten.
    ///
    /// A record at a generic location gets the mapped street as its
    /// `street_name`, the generic label as its `type_tag`, and a
    /// `pretty_name` of `"{generic} - {street} - {area}"`. Records resolved
    /// earlier are rewritten from their generic label again, so the result
    /// does not depend on what an earlier run mapped them to. Other records
    /// are copied unchanged, so fixing an already fixed set is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::LocationsNotFixed`] if `records` is empty.
    pub fn fix_locations(
        &self,
        records: &[IncidentRecord],
        mappings: &LocationMappings,
    ) -> Result<Vec<IncidentRecord>, ResolveError> {
        if records.is_empty() {
            return Err(ResolveError::LocationsNotFixed(
                "no records to fix".to_string(),
            ));
        }

        let mut missing = 0usize;
        let fixed = records
            .iter()
            .map(|record| {
                let published = record.published_street();
                if !self.vocabulary.is_generic(published) {
                    return record.clone();
                }
                let Some(entry) = mappings.for_record(record) else {
                    missing += 1;
                    return record.clone();
                };

                IncidentRecord {
                    pretty_name: format!(
                        "{published} - {} - {}",
                        entry.canonical_street, record.area_name
                    ),
                    street_name: entry.canonical_street.clone(),
                    type_tag: published.to_string(),
                    ..record.clone()
                }
            })
            .collect();

        if missing > 0 {
            log::warn!("{missing} generic locations had no mapping and were left unchanged");
        }

        Ok(fixed)
    }

    /// Runs both phases over `records`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::LocationsNotFixed`] if `records` is empty.
    pub fn resolve(&self, records: &[IncidentRecord]) -> Result<ResolvedIncidents, ResolveError> {
        let mappings = self.create_mappings(records)?;
        let records = self.fix_locations(records, &mappings)?;

        Ok(ResolvedIncidents { records, mappings })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use crime_hotspots_incident_models::{MonthToken, STREET_TYPE};

    use super::*;

    fn record(area: &str, lat: f64, lon: f64, street: &str) -> IncidentRecord {
        let month = MonthToken::new(2024, 1).unwrap();
        IncidentRecord {
            category: "burglary".to_string(),
            month,
            timestamp: chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            latitude: lat,
            longitude: lon,
            street_name: street.to_string(),
            pretty_name: format!("On or near {street} - {area}"),
            area_name: area.to_string(),
            type_tag: STREET_TYPE.to_string(),
            incident_id: None,
        }
    }

    fn resolved(area: &str, lat: f64, lon: f64, generic: &str, street: &str) -> IncidentRecord {
        IncidentRecord {
            street_name: street.to_string(),
            pretty_name: format!("{generic} - {street} - {area}"),
            type_tag: generic.to_string(),
            ..record(area, lat, lon, generic)
        }
    }

    #[test]
    fn maps_generic_location_to_nearest_street() {
        let records = vec![
            record("A", 0.0, 0.0, "Elm St"),
            record("A", 10.0, 10.0, "Oak Rd"),
            record("A", 1.0, 1.0, "Parking Area"),
        ];
        let resolved = LocationResolver::default().resolve(&records).unwrap();

        let entry = &resolved.mappings().entries()[0];
        assert_eq!(entry.canonical_street, "Elm St");
        assert!(entry.matched);

        let fixed = &resolved.records()[2];
        assert_eq!(fixed.street_name, "Elm St");
        assert_eq!(fixed.type_tag, "Parking Area");
        assert_eq!(fixed.pretty_name, "Parking Area - Elm St - A");
        assert_eq!(resolved.records()[0], records[0]);
    }

    #[test]
    fn no_descriptive_street_gives_sentinel() {
        let records = vec![
            record("A", 1.0, 1.0, "Parking Area"),
            record("A", 2.0, 2.0, "Supermarket"),
        ];
        let resolved = LocationResolver::default().resolve(&records).unwrap();

        assert_eq!(resolved.mappings().unmatched().count(), 2);
        assert!(resolved.records().iter().all(|r| r.street_name == SENTINEL));
        assert_eq!(resolved.records()[1].pretty_name, "Supermarket - DEADBEEF - A");
    }

    #[test]
    fn ties_go_to_first_street_seen() {
        let records = vec![
            record("A", 0.0, 2.0, "First St"),
            record("A", 0.0, -2.0, "Second St"),
            record("A", 0.0, 0.0, "Hospital"),
        ];
        let mappings = LocationResolver::default().create_mappings(&records).unwrap();
        assert_eq!(mappings.entries()[0].canonical_street, "First St");
    }

    #[test]
    fn groups_repeated_locations() {
        let records = vec![
            record("A", 0.0, 0.0, "Elm St"),
            record("A", 1.0, 1.0, "Parking Area"),
            record("A", 1.0, 1.0, "Parking Area"),
            record("A", 1.0, 1.0, "Supermarket"),
        ];
        let resolved = LocationResolver::default().resolve(&records).unwrap();

        assert_eq!(resolved.mappings().len(), 2);
        assert!(resolved.records()[1..].iter().all(|r| r.street_name == "Elm St"));
        assert_eq!(resolved.records()[3].type_tag, "Supermarket");
    }

    #[test]
    fn same_area_scope_ignores_other_areas() {
        let records = vec![
            record("B", 1.0, 1.0, "Near Rd"),
            record("A", 50.0, 50.0, "Far Rd"),
            record("A", 1.0, 1.0, "Parking Area"),
        ];

        let same_area = LocationResolver::default().resolve(&records).unwrap();
        assert_eq!(same_area.records()[2].street_name, "Far Rd");

        let global = LocationResolver::new(
            Vocabulary::default(),
            MappingScope::Global,
            DistanceMetric::Euclidean,
        )
        .resolve(&records)
        .unwrap();
        assert_eq!(global.records()[2].street_name, "Near Rd");
    }

    #[test]
    fn fixing_twice_changes_nothing() {
        let records = vec![
            record("A", 0.0, 0.0, "Elm St"),
            record("A", 1.0, 1.0, "Parking Area"),
            record("A", 5.0, 5.0, "Bus/Coach Station"),
        ];
        let resolver = LocationResolver::default();
        let resolved = resolver.resolve(&records).unwrap();

        let again = resolver
            .fix_locations(resolved.records(), resolved.mappings())
            .unwrap();
        assert_eq!(again, resolved.records());
    }

    #[test]
    fn empty_input_is_not_fixed() {
        let resolver = LocationResolver::default();
        assert!(matches!(
            resolver.create_mappings(&[]),
            Err(ResolveError::LocationsNotFixed(_))
        ));
        assert!(matches!(
            resolver.fix_locations(&[], &LocationMappings::default()),
            Err(ResolveError::LocationsNotFixed(_))
        ));
        assert!(resolver.resolve(&[]).is_err());
    }

    #[test]
    fn unmapped_generic_records_are_left_alone() {
        let records = vec![record("A", 1.0, 1.0, "Parking Area")];
        let fixed = LocationResolver::default()
            .fix_locations(&records, &LocationMappings::default())
            .unwrap();
        assert_eq!(fixed, records);
    }

    #[test]
    fn lookup_by_location() {
        let records = vec![
            record("A", 0.0, 0.0, "Elm St"),
            record("A", 1.0, 1.0, "Parking Area"),
        ];
        let mappings = LocationResolver::default().create_mappings(&records).unwrap();
        let entry = mappings.get("A", 1.0, 1.0, "Parking Area").unwrap();
        assert_eq!(entry.canonical_street, "Elm St");
        assert!(mappings.get("B", 1.0, 1.0, "Parking Area").is_none());
    }

    #[test]
    fn sentinel_rows_are_resolved_again() {
        let records = vec![
            resolved("A", 1.0, 1.0, "Parking Area", SENTINEL),
            record("A", 1.0, 1.0, "Parking Area"),
            record("A", 1.001, 1.0, "High Street"),
        ];
        let resolved = LocationResolver::default().resolve(&records).unwrap();

        assert_eq!(resolved.mappings().len(), 1);
        assert_eq!(resolved.mappings().entries()[0].canonical_street, "High Street");
        let fixed = &resolved.records()[0];
        assert_eq!(fixed.street_name, "High Street");
        assert_eq!(fixed.type_tag, "Parking Area");
        assert_eq!(fixed.pretty_name, "Parking Area - High Street - A");
        assert_eq!(resolved.records()[0], resolved.records()[1]);
    }

    #[test]
    fn resolved_streets_are_not_candidates() {
        let records = vec![
            resolved("A", 0.0, 0.0, "Supermarket", "Elm St"),
            record("A", 5.0, 5.0, "Oak Rd"),
            record("A", 0.1, 0.1, "Hospital"),
        ];
        let resolved = LocationResolver::default().resolve(&records).unwrap();

        assert_eq!(resolved.mappings().len(), 2);
        assert!(resolved.mappings().entries().iter().all(|e| e.canonical_street == "Oak Rd"));
        assert_eq!(resolved.records()[0].street_name, "Oak Rd");
        assert_eq!(resolved.records()[2].street_name, "Oak Rd");
    }
}
