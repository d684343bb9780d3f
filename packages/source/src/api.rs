//! Client for the UK police data API (<https://data.police.uk/docs/>).
//!
//! A [`PoliceApiClient`] is bound to one [`UsageKind`]: street-level
//! crimes (`crimes-street/{category}`) or stop and searches
//! (`stops-street`). Both take the same `poly` and `date` parameters and
//! return a bare JSON array of incidents with a nested `location` object.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crime_hotspots_geography::query;
use crime_hotspots_incident_models::{Category, MonthToken, UsageKind};
use serde::Deserialize;

use crate::abort::AbortSignal;
use crate::rate_limit::RateLimiter;
use crate::retry::{self, RetryPolicy};
use crate::{FetchError, FetchOutcome, IncidentFetcher};

/// Public police API base URL.
pub const DEFAULT_API_URL: &str = "https://data.police.uk/api/";

/// Category slug covering every street-level crime.
pub const ALL_CRIME: &str = "all-crime";

const USER_AGENT: &str = concat!("crime_hotspots/", env!("CARGO_PKG_VERSION"));

/// An incident exactly as the API returns it.
///
/// Crime and stop-and-search responses share the `location` shape but
/// differ elsewhere, so every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawIncident {
    /// Crime category slug (crimes only).
    pub category: Option<String>,
    /// Search type, e.g. `"Person search"` (stop and search only).
    #[serde(rename = "type")]
    pub search_type: Option<String>,
    /// Month published, `yyyy-mm` (crimes only).
    pub month: Option<String>,
    /// Full timestamp (stop and search only).
    pub datetime: Option<String>,
    /// Approximate location; stop and search may omit it.
    pub location: Option<RawLocation>,
    /// Stable crime identifier (crimes only, may be empty).
    pub persistent_id: Option<String>,
    /// Numeric API identifier (crimes only).
    pub id: Option<serde_json::Value>,
}

/// Location sub-object of a [`RawIncident`].
///
/// Coordinates arrive as strings (`"53.799"`) but are accepted as numbers
/// too.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLocation {
    pub latitude: Option<serde_json::Value>,
    pub longitude: Option<serde_json::Value>,
    pub street: Option<RawStreet>,
}

/// Street sub-object of a [`RawLocation`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStreet {
    /// Label such as `"On or near High Street"` or `"On or near Parking Area"`.
    pub name: Option<String>,
}

/// Connection settings for a [`PoliceApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, normally [`DEFAULT_API_URL`].
    pub base_url: String,
    /// Dataset to query.
    pub usage: UsageKind,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry behaviour for `429`, `5xx` and transport failures.
    pub retry: RetryPolicy,
}

impl ClientConfig {
    #[must_use]
    pub fn new(usage: UsageKind) -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            usage,
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

/// HTTP client for one police API dataset.
pub struct PoliceApiClient {
    client: reqwest::Client,
    base_url: String,
    usage: UsageKind,
    retry: RetryPolicy,
    limiter: Arc<RateLimiter>,
    abort: AbortSignal,
}

impl PoliceApiClient {
    /// Creates a client sharing `limiter` and `abort` with the rest of the
    /// run.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        config: ClientConfig,
        limiter: Arc<RateLimiter>,
        abort: AbortSignal,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let mut base_url = config.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            usage: config.usage,
            retry: config.retry,
            limiter,
            abort,
        })
    }

    /// Builds the request URL for one polygon and month.
    ///
    /// The polygon is inserted verbatim: its `,` and `:` separators are
    /// what the API expects, and escaping them would eat into the length
    /// budget.
    #[must_use]
    pub fn url_for(&self, query: &str, category: Option<&str>, month: MonthToken) -> String {
        incident_url(&self.base_url, self.usage, query, category, month)
    }

    /// Fetches the crime categories valid for `date` (latest if `None`).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails or returns anything but
    /// `200`.
    pub async fn categories(&self, date: Option<MonthToken>) -> Result<Vec<Category>, FetchError> {
        let mut url = format!("{}crime-categories", self.base_url);
        if let Some(date) = date {
            url.push_str(&format!("?date={date}"));
        }

        let response = retry::send(
            || self.client.get(&url),
            &self.retry,
            &self.limiter,
            &self.abort,
        )
        .await?;

        let code = response.status().as_u16();
        if code != 200 {
            return Err(FetchError::Http { code, url });
        }

        let categories: Vec<Category> = serde_json::from_str(&response.text().await?)?;
        log::info!("Loaded {} crime categories", categories.len());

        Ok(categories)
    }
}

#[async_trait]
impl IncidentFetcher for PoliceApiClient {
    fn usage(&self) -> UsageKind {
        self.usage
    }

    async fn fetch(
        &self,
        query: &str,
        category: Option<&str>,
        month: MonthToken,
    ) -> Result<FetchOutcome, FetchError> {
        query::check_len(query)?;

        if self.abort.is_aborted() {
            return Err(FetchError::Cancelled);
        }

        let url = self.url_for(query, category, month);
        log::debug!("GET {url}");

        let response = retry::send(
            || self.client.get(&url),
            &self.retry,
            &self.limiter,
            &self.abort,
        )
        .await?;

        let code = response.status().as_u16();
        let body = if code == 200 {
            response.text().await?
        } else {
            String::new()
        };

        classify(code, &body, &url)
    }
}

/// Builds an incident URL for `usage`.
///
/// Crime queries fall back to [`ALL_CRIME`] when no category is given.
#[must_use]
pub fn incident_url(
    base_url: &str,
    usage: UsageKind,
    query: &str,
    category: Option<&str>,
    month: MonthToken,
) -> String {
    match usage {
        UsageKind::Crime => format!(
            "{base_url}{usage}/{}?poly={query}&date={month}",
            category.unwrap_or(ALL_CRIME),
        ),
        UsageKind::StopSearch => format!("{base_url}{usage}?poly={query}&date={month}"),
    }
}

/// Maps a response status and body to a [`FetchOutcome`].
///
/// # Errors
///
/// Returns [`FetchError::Http`] for any status other than `200` or `404`,
/// or [`FetchError::Json`] if a `200` body is not a JSON array.
pub fn classify(code: u16, body: &str, url: &str) -> Result<FetchOutcome, FetchError> {
    match code {
        200 => {
            let batch: Vec<RawIncident> = serde_json::from_str(body)?;
            Ok(FetchOutcome::Batch(batch))
        }
        404 => Ok(FetchOutcome::EmptyNotFound),
        code => Err(FetchError::Http {
            code,
            url: url.to_string(),
        }),
    }
}
