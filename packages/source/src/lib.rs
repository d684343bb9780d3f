#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Police API acquisition for the crime hotspots pipeline.
//!
//! [`api::PoliceApiClient`] implements [`IncidentFetcher`] for one
//! [`UsageKind`], sending one request per ring and month through a shared
//! [`rate_limit::RateLimiter`] with retry on rate limiting and server
//! errors. [`aggregate::aggregate`] drives the fetcher over every area and
//! month of a [`window`], consulting the cache before the network and
//! normalizing what comes back.

pub mod abort;
pub mod aggregate;
pub mod api;
pub mod normalize;
pub mod progress;
pub mod rate_limit;
pub mod retry;
pub mod window;

use async_trait::async_trait;
use crime_hotspots_geography::QueryError;
use crime_hotspots_incident_models::{MonthToken, UsageKind};
use thiserror::Error;

pub use api::RawIncident;

/// Errors from a single police API request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The polygon query is longer than the API accepts.
    #[error(transparent)]
    BoundaryTooComplex(#[from] QueryError),

    /// The API answered with a status other than 200 or 404.
    #[error("HTTP {code} for {url}: {}", status_hint(*code))]
    Http {
        /// Response status code.
        code: u16,
        /// Request URL.
        url: String,
    },

    /// The request could not be sent or its body could not be read.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The run was aborted before this request was sent.
    #[error("Request cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether this error ends a run regardless of the failure policy.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

fn status_hint(code: u16) -> &'static str {
    match code {
        404 => "page not found",
        429 => "too many requests (https://data.police.uk/docs/api-call-limits/)",
        503 => "more than 10,000 results in the area, or the service is unavailable",
        _ => "unexpected response code",
    }
}

/// Result of a request that reached the API.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// `200`: the incidents published for the polygon and month (possibly
    /// none).
    Batch(Vec<RawIncident>),
    /// `404`: nothing published for this month. Counted, never fatal.
    EmptyNotFound,
}

/// Fetches one month of incidents inside one polygon.
///
/// Implemented by [`api::PoliceApiClient`]; tests substitute in-memory
/// fakes.
#[async_trait]
pub trait IncidentFetcher: Send + Sync {
    /// Dataset this fetcher queries.
    fn usage(&self) -> UsageKind;

    /// Fetches incidents for `query` (a `poly=` string) in `month`.
    ///
    /// `category` is the crime category slug; it is ignored for stop and
    /// search.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] for anything other than a `200` or `404`
    /// response.
    async fn fetch(
        &self,
        query: &str,
        category: Option<&str>,
        month: MonthToken,
    ) -> Result<FetchOutcome, FetchError>;
}
