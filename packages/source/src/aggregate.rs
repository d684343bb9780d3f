//! Fetches every area for every month of a window.
//!
//! Work is split into `(area, month)` units, the granularity of the cache.
//! Each unit reads its cache artifact first and only goes to the network
//! on a miss, requesting every ring of the area for that month. Units run
//! concurrently up to `max_concurrency` with ordered buffering, so the
//! records come back ordered by area, then month, then ring.
//!
//! Failures follow the request's [`FailurePolicy`]. `404` responses are
//! never failures: months with one are counted per area in
//! [`AggregateReport::failed_months`].

use std::collections::BTreeMap;

use crime_hotspots_cache::CacheStore;
use crime_hotspots_geography::{QueryError, query};
use crime_hotspots_incident_models::{Area, CacheKey, IncidentRecord, MonthToken};
use futures::StreamExt as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::abort::AbortSignal;
use crate::normalize::normalize_batch;
use crate::progress::ProgressCallback;
use crate::{FetchError, FetchOutcome, IncidentFetcher};

/// What to do when a ring cannot be queried or a request fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fire the abort signal and fail the whole run.
    Abort,
    /// Record the failure, leave the unit out of the cache, keep going.
    #[default]
    Skip,
}

/// Errors that end an aggregation run.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// A request failed under [`FailurePolicy::Abort`].
    #[error("{area_name} {month}: {source}")]
    Fetch {
        area_name: String,
        month: MonthToken,
        source: FetchError,
    },

    /// A ring's query was too long under [`FailurePolicy::Abort`].
    #[error("{area_name} ring {ring}: {source}")]
    BoundaryTooComplex {
        area_name: String,
        ring: usize,
        source: QueryError,
    },

    /// The run was aborted.
    #[error("Aggregation cancelled")]
    Cancelled,
}

/// Inputs to one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregateRequest {
    pub areas: Vec<Area>,
    /// Months to fetch, as planned by [`crate::window`].
    pub months: Vec<MonthToken>,
    /// Boundary kind, the first cache path segment.
    pub location_type: String,
    /// Crime category slug; ignored for stop and search.
    pub category: Option<String>,
    pub max_concurrency: usize,
    pub failure_policy: FailurePolicy,
}

/// A ring or unit skipped under [`FailurePolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub area_name: String,
    /// Ring index, when the failure was specific to one ring.
    pub ring: Option<usize>,
    /// Month, unless the failure affected every month.
    pub month: Option<MonthToken>,
    pub error: String,
}

/// Everything an aggregation run produced.
#[derive(Debug, Default)]
pub struct AggregateReport {
    /// Normalized records in area, month, ring order.
    pub records: Vec<IncidentRecord>,
    /// Number of months per area where at least one ring got a `404`.
    pub failed_months: BTreeMap<String, u32>,
    pub failures: Vec<UnitFailure>,
    /// Units whose records are complete and may be written to the cache.
    pub cacheable_units: Vec<(String, MonthToken)>,
    pub cache_hits: usize,
    /// Requests that reached the API.
    pub requests: usize,
    /// Incidents dropped for unusable coordinates.
    pub dropped_records: usize,
}

impl AggregateReport {
    /// Number of months with a `404` for `area_name`.
    #[must_use]
    pub fn failed_months_for(&self, area_name: &str) -> u32 {
        self.failed_months.get(area_name).copied().unwrap_or(0)
    }
}

struct UnitOutcome {
    area: usize,
    month: MonthToken,
    records: Vec<IncidentRecord>,
    from_cache: bool,
    complete: bool,
    not_found: bool,
    requests: usize,
    dropped: usize,
    failures: Vec<UnitFailure>,
}

/// Runs `request` against `fetcher`, reading from `store` when given.
///
/// # Errors
///
/// Returns [`AggregateError::Cancelled`] if `abort` fires, whatever the
/// failure policy. Under [`FailurePolicy::Abort`], returns the first
/// [`AggregateError::BoundaryTooComplex`] (before any request is sent) or
/// [`AggregateError::Fetch`], after firing `abort` so other in-flight
/// requests stop.
pub async fn aggregate(
    request: &AggregateRequest,
    fetcher: &dyn IncidentFetcher,
    store: Option<&dyn CacheStore>,
    progress: &dyn ProgressCallback,
    abort: &AbortSignal,
) -> Result<AggregateReport, AggregateError> {
    let mut report = AggregateReport::default();
    for area in &request.areas {
        report.failed_months.insert(area.name.clone(), 0);
    }

    let queries = build_queries(request, abort, &mut report)?;

    let units: Vec<(usize, MonthToken)> = (0..request.areas.len())
        .flat_map(|area| request.months.iter().map(move |month| (area, *month)))
        .collect();

    log::info!(
        "Aggregating {} areas x {} months ({} units, {} at a time)",
        request.areas.len(),
        request.months.len(),
        units.len(),
        request.max_concurrency.max(1),
    );
    progress.set_total(units.len() as u64);

    let mut outcomes = futures::stream::iter(units.into_iter().map(|(area, month)| {
        run_unit(request, &queries[area], area, month, fetcher, store, progress, abort)
    }))
    .buffered(request.max_concurrency.max(1));

    while let Some(outcome) = outcomes.next().await {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                abort.abort();
                return Err(e);
            }
        };

        let area_name = &request.areas[outcome.area].name;
        if outcome.from_cache {
            report.cache_hits += 1;
        }
        if outcome.complete {
            report.cacheable_units.push((area_name.clone(), outcome.month));
        }
        if outcome.not_found {
            if let Some(count) = report.failed_months.get_mut(area_name) {
                *count += 1;
            }
        }
        report.requests += outcome.requests;
        report.dropped_records += outcome.dropped;
        report.failures.extend(outcome.failures);
        report.records.extend(outcome.records);
    }

    for (area_name, count) in &report.failed_months {
        if *count > 0 {
            log::info!("{area_name}: {count} months found no data (404)");
        }
    }

    progress.finish(format!(
        "{} records ({} cached units, {} requests, {} failures)",
        report.records.len(),
        report.cache_hits,
        report.requests,
        report.failures.len(),
    ));

    Ok(report)
}

/// Builds every ring's query up front so oversized boundaries are caught
/// before any request goes out. Skipped rings are `None`.
fn build_queries(
    request: &AggregateRequest,
    abort: &AbortSignal,
    report: &mut AggregateReport,
) -> Result<Vec<Vec<Option<String>>>, AggregateError> {
    let mut queries = Vec::with_capacity(request.areas.len());

    for area in &request.areas {
        if area.rings.is_empty() {
            log::warn!("Skipping {}: no boundary rings", area.name);
            report.failures.push(UnitFailure {
                area_name: area.name.clone(),
                ring: None,
                month: None,
                error: "area has no boundary rings".to_string(),
            });
        }

        let mut area_queries = Vec::with_capacity(area.rings.len());
        for (ring, coords) in area.rings.iter().enumerate() {
            match query::build(coords) {
                Ok(q) => area_queries.push(Some(q)),
                Err(source) => match request.failure_policy {
                    FailurePolicy::Abort => {
                        abort.abort();
                        return Err(AggregateError::BoundaryTooComplex {
                            area_name: area.name.clone(),
                            ring,
                            source,
                        });
                    }
                    FailurePolicy::Skip => {
                        log::warn!("Skipping {} ring {ring}: {source}", area.name);
                        report.failures.push(UnitFailure {
                            area_name: area.name.clone(),
                            ring: Some(ring),
                            month: None,
                            error: source.to_string(),
                        });
                        area_queries.push(None);
                    }
                },
            }
        }
        queries.push(area_queries);
    }

    Ok(queries)
}

#[allow(clippy::too_many_arguments)]
async fn run_unit(
    request: &AggregateRequest,
    queries: &[Option<String>],
    area: usize,
    month: MonthToken,
    fetcher: &dyn IncidentFetcher,
    store: Option<&dyn CacheStore>,
    progress: &dyn ProgressCallback,
    abort: &AbortSignal,
) -> Result<UnitOutcome, AggregateError> {
    if abort.is_aborted() {
        return Err(AggregateError::Cancelled);
    }

    let area_name = &request.areas[area].name;
    let usage = fetcher.usage();
    let category = request.category.as_deref();

    let mut outcome = UnitOutcome {
        area,
        month,
        records: Vec::new(),
        from_cache: false,
        complete: !queries.is_empty(),
        not_found: false,
        requests: 0,
        dropped: 0,
        failures: Vec::new(),
    };

    if let Some(store) = store {
        let key = CacheKey::new(&request.location_type, area_name, usage, category, month);
        match store.get(&key) {
            Ok(Some(records)) => {
                log::debug!("{area_name} {month}: {} records from cache", records.len());
                outcome.records = records;
                outcome.from_cache = true;
                progress.inc(1);
                return Ok(outcome);
            }
            Ok(None) => {}
            Err(e) => log::warn!("{area_name} {month}: cache read failed, fetching instead: {e}"),
        }
    }

    progress.set_message(format!("{area_name} {month}"));

    for (ring, query) in queries.iter().enumerate() {
        let Some(query) = query else {
            outcome.complete = false;
            continue;
        };

        outcome.requests += 1;
        match fetcher.fetch(query, category, month).await {
            Ok(FetchOutcome::Batch(batch)) => {
                let (records, dropped) = normalize_batch(batch, area_name, usage, month);
                outcome.records.extend(records);
                outcome.dropped += dropped;
            }
            Ok(FetchOutcome::EmptyNotFound) => {
                log::debug!("{area_name} {month} ring {ring}: 404");
                outcome.not_found = true;
                outcome.complete = false;
            }
            Err(e) if e.is_cancellation() => return Err(AggregateError::Cancelled),
            Err(source) => match request.failure_policy {
                FailurePolicy::Abort => {
                    return Err(AggregateError::Fetch {
                        area_name: area_name.clone(),
                        month,
                        source,
                    });
                }
                FailurePolicy::Skip => {
                    log::warn!("Skipping {area_name} {month} ring {ring}: {source}");
                    outcome.failures.push(UnitFailure {
                        area_name: area_name.clone(),
                        ring: Some(ring),
                        month: Some(month),
                        error: source.to_string(),
                    });
                    outcome.complete = false;
                }
            },
        }
    }

    progress.inc(1);

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use crime_hotspots_cache::MemoryCacheStore;
    use crime_hotspots_incident_models::{Ring, STREET_TYPE, UsageKind};
    use serde_json::json;

    use super::*;
    use crate::RawIncident;
    use crate::progress::NullProgress;

    type Respond = dyn Fn(&str, MonthToken) -> Result<FetchOutcome, FetchError> + Send + Sync;

    struct ScriptedFetcher {
        respond: Box<Respond>,
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, MonthToken)>>,
    }

    impl ScriptedFetcher {
        fn new(
            respond: impl Fn(&str, MonthToken) -> Result<FetchOutcome, FetchError>
            + Send
            + Sync
            + 'static,
        ) -> Self {
            Self {
                respond: Box::new(respond),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IncidentFetcher for ScriptedFetcher {
        fn usage(&self) -> UsageKind {
            UsageKind::Crime
        }

        async fn fetch(
            &self,
            query: &str,
            _category: Option<&str>,
            month: MonthToken,
        ) -> Result<FetchOutcome, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((query.to_string(), month));
            (self.respond)(query, month)
        }
    }

    fn incidents(n: usize, street: &str) -> Vec<RawIncident> {
        (0..n)
            .map(|i| {
                serde_json::from_value(json!({
                    "category": "burglary",
                    "month": "2024-01",
                    "location": {
                        "latitude": format!("53.{i}"),
                        "longitude": "-1.5",
                        "street": { "id": 1, "name": format!("On or near {street}") }
                    },
                    "persistent_id": "",
                    "id": i
                }))
                .unwrap()
            })
            .collect()
    }

    fn square(offset: f64) -> Ring {
        Ring::new(vec![
            (-1.5 + offset, 53.8),
            (-1.4 + offset, 53.8),
            (-1.4 + offset, 53.9),
            (-1.5 + offset, 53.8),
        ])
    }

    fn huge_ring() -> Ring {
        Ring::new(vec![(-1.123_456_789, 53.123_456_789); 500])
    }

    fn area(name: &str, rings: Vec<Ring>) -> Area {
        Area {
            name: name.to_string(),
            usage: UsageKind::Crime,
            rings,
        }
    }

    fn months(n: u32) -> Vec<MonthToken> {
        let mut month = MonthToken::new(2021, 1).unwrap();
        let mut months = Vec::new();
        for _ in 0..n {
            months.push(month);
            month = month.succ();
        }
        months
    }

    fn request(areas: Vec<Area>, months: Vec<MonthToken>, policy: FailurePolicy) -> AggregateRequest {
        AggregateRequest {
            areas,
            months,
            location_type: "constituencies".to_string(),
            category: Some("burglary".to_string()),
            max_concurrency: 4,
            failure_policy: policy,
        }
    }

    fn index_of(months: &[MonthToken], month: MonthToken) -> usize {
        months.iter().position(|m| *m == month).unwrap()
    }

    #[tokio::test]
    async fn thirty_found_and_six_missing_months() {
        let window = months(36);
        let lookup = window.clone();
        let fetcher = ScriptedFetcher::new(move |_, month| {
            let i = index_of(&lookup, month);
            if i < 30 {
                Ok(FetchOutcome::Batch(incidents(i % 3 + 1, "High Street")))
            } else {
                Ok(FetchOutcome::EmptyNotFound)
            }
        });
        let expected: usize = (0..30).map(|i| i % 3 + 1).sum();

        let req = request(vec![area("Leeds Central", vec![square(0.0)])], window, FailurePolicy::Skip);
        let abort = AbortSignal::new();
        let report = aggregate(&req, &fetcher, None, &NullProgress, &abort)
            .await
            .unwrap();

        assert_eq!(report.failed_months_for("Leeds Central"), 6);
        assert_eq!(report.records.len(), expected);
        assert_eq!(report.requests, 36);
        assert_eq!(report.cacheable_units.len(), 30);
        assert!(report.failures.is_empty());
        assert!(!abort.is_aborted());

        let first = &report.records[0];
        assert_eq!(first.street_name, "High Street");
        assert_eq!(first.pretty_name, "On or near High Street - Leeds Central");
        assert_eq!(first.type_tag, STREET_TYPE);
    }

    #[tokio::test]
    async fn records_are_ordered_by_area_then_month() {
        let window = months(6);
        let fetcher = ScriptedFetcher::new(|_, month| {
            Ok(FetchOutcome::Batch(incidents(1, &month.to_string())))
        });
        let req = request(
            vec![area("A", vec![square(0.0)]), area("B", vec![square(1.0)])],
            window.clone(),
            FailurePolicy::Skip,
        );

        let report = aggregate(&req, &fetcher, None, &NullProgress, &AbortSignal::new())
            .await
            .unwrap();

        let order: Vec<(String, String)> = report
            .records
            .iter()
            .map(|r| (r.area_name.clone(), r.street_name.clone()))
            .collect();
        let expected: Vec<(String, String)> = ["A", "B"]
            .iter()
            .flat_map(|a| window.iter().map(move |m| ((*a).to_string(), m.to_string())))
            .collect();
        assert_eq!(order, expected);
    }

    #[tokio::test]
    async fn abort_policy_stops_on_first_http_error() {
        let window = months(12);
        let lookup = window.clone();
        let fetcher = ScriptedFetcher::new(move |_, month| {
            if index_of(&lookup, month) == 3 {
                Err(FetchError::Http {
                    code: 503,
                    url: "https://example.test".to_string(),
                })
            } else {
                Ok(FetchOutcome::Batch(incidents(1, "X")))
            }
        });
        let mut req = request(vec![area("A", vec![square(0.0)])], window, FailurePolicy::Abort);
        req.max_concurrency = 1;
        let abort = AbortSignal::new();

        let err = aggregate(&req, &fetcher, None, &NullProgress, &abort)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AggregateError::Fetch { source: FetchError::Http { code: 503, .. }, .. }
        ));
        assert!(abort.is_aborted());
        assert_eq!(fetcher.calls(), 4);
    }

    #[tokio::test]
    async fn skip_policy_records_the_failure() {
        let window = months(12);
        let lookup = window.clone();
        let failing = window[3];
        let fetcher = ScriptedFetcher::new(move |_, month| {
            if index_of(&lookup, month) == 3 {
                Err(FetchError::Http {
                    code: 500,
                    url: "https://example.test".to_string(),
                })
            } else {
                Ok(FetchOutcome::Batch(incidents(2, "X")))
            }
        });
        let req = request(vec![area("A", vec![square(0.0)])], window, FailurePolicy::Skip);
        let abort = AbortSignal::new();

        let report = aggregate(&req, &fetcher, None, &NullProgress, &abort)
            .await
            .unwrap();

        assert_eq!(report.records.len(), 22);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].month, Some(failing));
        assert_eq!(report.failures[0].ring, Some(0));
        assert!(!report.cacheable_units.contains(&("A".to_string(), failing)));
        assert_eq!(report.cacheable_units.len(), 11);
        assert!(!abort.is_aborted());
    }

    #[tokio::test]
    async fn cached_units_skip_the_network() {
        let window = months(2);
        let store = MemoryCacheStore::new();
        let cached = normalize_batch(incidents(3, "Cached Road"), "A", UsageKind::Crime, window[0]).0;
        let key = CacheKey::new("constituencies", "A", UsageKind::Crime, Some("burglary"), window[0]);
        store.put(&key, &cached).unwrap();

        let fetcher = ScriptedFetcher::new(|_, _| Ok(FetchOutcome::Batch(incidents(1, "Fresh Lane"))));
        let req = request(vec![area("A", vec![square(0.0)])], window.clone(), FailurePolicy::Skip);

        let report = aggregate(&req, &fetcher, Some(&store), &NullProgress, &AbortSignal::new())
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(fetcher.seen.lock().unwrap()[0].1, window[1]);
        assert_eq!(report.cache_hits, 1);
        assert_eq!(report.records.len(), 4);
        assert_eq!(report.records[0], cached[0]);
        assert_eq!(report.cacheable_units.len(), 2);
    }

    #[tokio::test]
    async fn multi_ring_areas_fetch_each_ring_once_per_month() {
        let window = months(3);
        let fetcher = ScriptedFetcher::new(|_, _| Ok(FetchOutcome::Batch(incidents(1, "X"))));
        let req = request(
            vec![area("Islands", vec![square(0.0), square(2.0)])],
            window,
            FailurePolicy::Skip,
        );

        let report = aggregate(&req, &fetcher, None, &NullProgress, &AbortSignal::new())
            .await
            .unwrap();

        assert_eq!(report.requests, 6);
        assert_eq!(report.records.len(), 6);
        assert_eq!(report.cacheable_units.len(), 3);

        let seen = fetcher.seen.lock().unwrap();
        assert_ne!(seen[0].0, seen[1].0);
        assert_eq!(seen[0].1, seen[1].1);
    }

    #[tokio::test]
    async fn missing_month_counts_once_across_rings() {
        let window = months(36);
        let lookup = window.clone();
        let fetcher = ScriptedFetcher::new(move |_, month| {
            if index_of(&lookup, month) < 30 {
                Ok(FetchOutcome::Batch(incidents(1, "X")))
            } else {
                Ok(FetchOutcome::EmptyNotFound)
            }
        });
        let req = request(
            vec![area("Islands", vec![square(0.0), square(2.0)])],
            window,
            FailurePolicy::Skip,
        );

        let report = aggregate(&req, &fetcher, None, &NullProgress, &AbortSignal::new())
            .await
            .unwrap();

        assert_eq!(report.requests, 72);
        assert_eq!(report.failed_months_for("Islands"), 6);
        assert_eq!(report.records.len(), 60);
        assert_eq!(report.cacheable_units.len(), 30);
    }

    #[tokio::test]
    async fn every_month_missing_never_exceeds_the_window() {
        let fetcher = ScriptedFetcher::new(|_, _| Ok(FetchOutcome::EmptyNotFound));
        let req = request(
            vec![area("Islands", vec![square(0.0), square(2.0)])],
            months(36),
            FailurePolicy::Skip,
        );

        let report = aggregate(&req, &fetcher, None, &NullProgress, &AbortSignal::new())
            .await
            .unwrap();

        assert_eq!(report.failed_months_for("Islands"), 36);
        assert!(report.cacheable_units.is_empty());
    }

    #[tokio::test]
    async fn area_without_rings_is_never_cached() {
        let fetcher = ScriptedFetcher::new(|_, _| Ok(FetchOutcome::Batch(incidents(1, "X"))));
        let req = request(
            vec![area("Empty", Vec::new()), area("A", vec![square(0.0)])],
            months(2),
            FailurePolicy::Skip,
        );

        let report = aggregate(&req, &fetcher, None, &NullProgress, &AbortSignal::new())
            .await
            .unwrap();

        assert_eq!(report.requests, 2);
        assert!(report.cacheable_units.iter().all(|(a, _)| a == "A"));
        assert_eq!(report.cacheable_units.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].area_name, "Empty");
        assert_eq!(report.failures[0].ring, None);
    }

    #[tokio::test]
    async fn oversized_ring_fails_before_any_request() {
        let fetcher = ScriptedFetcher::new(|_, _| Ok(FetchOutcome::Batch(Vec::new())));
        let req = request(
            vec![area("A", vec![square(0.0)]), area("B", vec![huge_ring()])],
            months(3),
            FailurePolicy::Abort,
        );

        let err = aggregate(&req, &fetcher, None, &NullProgress, &AbortSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AggregateError::BoundaryTooComplex { ref area_name, ring: 0, .. } if area_name == "B"
        ));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn oversized_ring_is_skipped_under_skip_policy() {
        let fetcher = ScriptedFetcher::new(|_, _| Ok(FetchOutcome::Batch(incidents(1, "X"))));
        let req = request(
            vec![area("A", vec![square(0.0)]), area("B", vec![huge_ring()])],
            months(3),
            FailurePolicy::Skip,
        );

        let report = aggregate(&req, &fetcher, None, &NullProgress, &AbortSignal::new())
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 3);
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].area_name, "B");
        assert_eq!(report.failures[0].month, None);
        assert!(report.cacheable_units.iter().all(|(a, _)| a == "A"));
    }

    #[tokio::test]
    async fn cancellation_is_fatal_under_skip() {
        let fetcher = ScriptedFetcher::new(|_, _| Err(FetchError::Cancelled));
        let req = request(vec![area("A", vec![square(0.0)])], months(3), FailurePolicy::Skip);

        let err = aggregate(&req, &fetcher, None, &NullProgress, &AbortSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AggregateError::Cancelled));
    }

    #[tokio::test]
    async fn fired_signal_stops_before_fetching() {
        let fetcher = ScriptedFetcher::new(|_, _| Ok(FetchOutcome::Batch(Vec::new())));
        let req = request(vec![area("A", vec![square(0.0)])], months(3), FailurePolicy::Skip);
        let abort = AbortSignal::new();
        abort.abort();

        let err = aggregate(&req, &fetcher, None, &NullProgress, &abort)
            .await
            .unwrap_err();

        assert!(matches!(err, AggregateError::Cancelled));
        assert_eq!(fetcher.calls(), 0);
    }
}
