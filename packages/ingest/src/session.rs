//! One fetch-resolve-store run over a set of areas.
//!
//! A [`Session`] moves through three states: empty, aggregated, and
//! resolved. Anything that hands records downstream (the resolved set, the
//! cache write, the CSV export) requires the resolved state and fails with
//! [`ResolveError::LocationsNotFixed`] before it. Aggregating again
//! discards an earlier resolution.

use std::path::Path;

use crime_hotspots_cache::{CacheStore, write_session};
use crime_hotspots_incident_models::UsageKind;
use crime_hotspots_resolver::{LocationResolver, ResolveError, ResolvedIncidents};
use crime_hotspots_source::IncidentFetcher;
use crime_hotspots_source::abort::AbortSignal;
use crime_hotspots_source::aggregate::{AggregateReport, AggregateRequest, aggregate};
use crime_hotspots_source::progress::ProgressCallback;

use crate::IngestError;
use crate::export;

/// Per-area outcome of a session, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaSummary {
    pub area_name: String,
    pub records: usize,
    /// Records whose street was rewritten by location resolution.
    pub resolved: usize,
    /// `404` responses.
    pub not_found: u32,
    /// Skipped rings or requests.
    pub failures: usize,
}

/// State of one run.
pub struct Session {
    request: AggregateRequest,
    usage: UsageKind,
    report: Option<AggregateReport>,
    resolved: Option<ResolvedIncidents>,
}

impl Session {
    #[must_use]
    pub const fn new(request: AggregateRequest, usage: UsageKind) -> Self {
        Self {
            request,
            usage,
            report: None,
            resolved: None,
        }
    }

    #[must_use]
    pub const fn report(&self) -> Option<&AggregateReport> {
        self.report.as_ref()
    }

    /// Fetches every unit of the request, reading from `store` when given.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Aggregate`] if the run is cancelled or fails
    /// under the abort policy.
    pub async fn aggregate(
        &mut self,
        fetcher: &dyn IncidentFetcher,
        store: Option<&dyn CacheStore>,
        progress: &dyn ProgressCallback,
        abort: &AbortSignal,
    ) -> Result<&AggregateReport, IngestError> {
        self.resolved = None;
        let report = aggregate(&self.request, fetcher, store, progress, abort).await?;
        Ok(self.report.insert(report))
    }

    /// Resolves generic locations in the aggregated records.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::LocationsNotFixed`] if nothing has been
    /// aggregated or the aggregate is empty.
    pub fn resolve(&mut self, resolver: &LocationResolver) -> Result<&ResolvedIncidents, IngestError> {
        let report = self.report.as_ref().ok_or_else(|| {
            ResolveError::LocationsNotFixed("no incidents have been aggregated".to_string())
        })?;

        let resolved = resolver.resolve(&report.records)?;
        let unmatched = resolved.mappings().unmatched().count();
        if unmatched > 0 {
            log::warn!("{unmatched} generic locations had no descriptive street nearby");
        }

        Ok(self.resolved.insert(resolved))
    }

    /// The resolved record set.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::LocationsNotFixed`] before [`Self::resolve`].
    pub fn resolved(&self) -> Result<&ResolvedIncidents, IngestError> {
        self.resolved.as_ref().ok_or_else(|| {
            ResolveError::LocationsNotFixed("locations have not been fixed yet".to_string()).into()
        })
    }

    /// Writes every complete unit's resolved records to `store`.
    ///
    /// Returns the number of artifacts written.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::LocationsNotFixed`] before
    /// [`Self::resolve`], or [`IngestError::Cache`] if a write fails.
    pub fn write_cache(&self, store: &dyn CacheStore) -> Result<usize, IngestError> {
        let resolved = self.resolved()?;
        let units = self
            .report
            .as_ref()
            .map_or(&[][..], |r| r.cacheable_units.as_slice());

        Ok(write_session(
            store,
            &self.request.location_type,
            self.usage,
            self.request.category.as_deref(),
            units,
            resolved.records(),
        )?)
    }

    /// Exports the resolved records to a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::LocationsNotFixed`] before
    /// [`Self::resolve`], or [`IngestError::Csv`] if writing fails.
    pub fn export_csv(&self, path: &Path) -> Result<usize, IngestError> {
        let resolved = self.resolved()?;
        Ok(export::export_csv(path, resolved.records())?)
    }

    /// Per-area counts in request order.
    #[must_use]
    pub fn summary(&self) -> Vec<AreaSummary> {
        let records = self
            .resolved
            .as_ref()
            .map(ResolvedIncidents::records)
            .or_else(|| self.report.as_ref().map(|r| r.records.as_slice()))
            .unwrap_or_default();

        self.request
            .areas
            .iter()
            .map(|area| {
                let in_area: Vec<_> = records
                    .iter()
                    .filter(|r| r.area_name == area.name)
                    .collect();
                AreaSummary {
                    area_name: area.name.clone(),
                    records: in_area.len(),
                    resolved: in_area.iter().filter(|r| r.is_resolved()).count(),
                    not_found: self
                        .report
                        .as_ref()
                        .map_or(0, |r| r.failed_months_for(&area.name)),
                    failures: self.report.as_ref().map_or(0, |r| {
                        r.failures.iter().filter(|f| f.area_name == area.name).count()
                    }),
                }
            })
            .collect()
    }
}
