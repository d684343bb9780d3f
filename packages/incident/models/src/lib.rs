#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared domain types for the crime hotspots pipeline.
//!
//! Areas and their boundary rings come in from the geography import,
//! [`MonthToken`]s from the window planner, and [`IncidentRecord`]s flow
//! through fetching, caching, and location resolution. Everything here
//! is plain data; behaviour lives in the crates that own each stage.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike as _, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter};

/// Type tag given to every record whose street name came straight from the
/// API, before location resolution rewrites generic labels.
pub const STREET_TYPE: &str = "Street";

/// Which police API dataset a session pulls from.
///
/// Drives both the request URL and the cache path segment, so a single
/// engine serves crime and stop-and-search data alike.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
)]
pub enum UsageKind {
    /// Street-level crimes (`crimes-street`).
    #[serde(rename = "crimes-street")]
    #[strum(serialize = "crimes-street")]
    Crime,
    /// Stop and searches by area (`stops-street`).
    #[serde(rename = "stops-street")]
    #[strum(serialize = "stops-street")]
    StopSearch,
}

impl UsageKind {
    /// Whether requests and cache paths for this dataset carry a category.
    #[must_use]
    pub const fn uses_category(self) -> bool {
        match self {
            Self::Crime => true,
            Self::StopSearch => false,
        }
    }
}

/// Returned when a usage selector is not one of the supported values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid usage {value:?}: expected \"crime\" or \"search\"")]
pub struct ConfigurationError {
    /// The rejected selector.
    pub value: String,
}

impl FromStr for UsageKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crime" | "crimes" | "crimes-street" => Ok(Self::Crime),
            "search" | "stop-search" | "stops" | "stops-street" => Ok(Self::StopSearch),
            _ => Err(ConfigurationError {
                value: s.to_string(),
            }),
        }
    }
}

/// A calendar month, written `yyyy-mm` on the wire and on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthToken {
    year: i32,
    month: u32,
}

/// Returned when a string is not a valid `yyyy-mm` month.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid month {value:?}: expected yyyy-mm")]
pub struct InvalidMonthError {
    /// The rejected input.
    pub value: String,
}

impl MonthToken {
    /// Creates a month token, or `None` if `month` is not in `1..=12`.
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Option<Self> {
        if month >= 1 && month <= 12 {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The month containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// First calendar day of this month.
    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Midnight UTC on the first day of this month.
    #[must_use]
    pub fn start_timestamp(self) -> DateTime<Utc> {
        self.first_day().and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// The following month.
    #[must_use]
    pub fn succ(self) -> Self {
        self.first_day()
            .checked_add_months(Months::new(1))
            .map_or(self, Self::from_date)
    }

    /// The preceding month.
    #[must_use]
    pub fn pred(self) -> Self {
        self.first_day()
            .checked_sub_months(Months::new(1))
            .map_or(self, Self::from_date)
    }
}

impl fmt::Display for MonthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthToken {
    type Err = InvalidMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidMonthError {
            value: s.to_string(),
        };

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;

        Self::new(year, month).ok_or_else(invalid)
    }
}

impl TryFrom<String> for MonthToken {
    type Error = InvalidMonthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthToken> for String {
    fn from(value: MonthToken) -> Self {
        value.to_string()
    }
}

/// A crime category as published by the `crime-categories` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Display name (e.g., "Anti-social behaviour").
    pub name: String,
    /// API slug (e.g., `"anti-social-behaviour"`).
    #[serde(rename = "url")]
    pub slug: String,
}

/// Finds a category by display name or slug, ignoring ASCII case.
#[must_use]
pub fn find_category<'a>(categories: &'a [Category], query: &str) -> Option<&'a Category> {
    let query = query.trim();
    categories
        .iter()
        .find(|c| c.slug.eq_ignore_ascii_case(query) || c.name.eq_ignore_ascii_case(query))
}

/// One closed boundary ring as `(longitude, latitude)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    pub coords: Vec<(f64, f64)>,
}

impl Ring {
    #[must_use]
    pub const fn new(coords: Vec<(f64, f64)>) -> Self {
        Self { coords }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

/// A named region made of one or more rings (islands and exclaves each get
/// their own ring).
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    /// Display name, unique within a dataset.
    pub name: String,
    /// Dataset this area is queried against.
    pub usage: UsageKind,
    /// Boundary rings in import order.
    pub rings: Vec<Ring>,
}

/// Identifies one cached month of records.
///
/// Every field is a path segment, so two keys address the same artifact
/// exactly when they are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    /// Kind of boundary the areas come from (e.g., `"constituencies"`).
    pub location_type: String,
    pub area_name: String,
    pub usage: UsageKind,
    /// Category slug; always `None` for stop and search.
    pub category: Option<String>,
    pub month: MonthToken,
}

impl CacheKey {
    /// Builds a key, dropping the category for datasets that don't use one.
    #[must_use]
    pub fn new(
        location_type: &str,
        area_name: &str,
        usage: UsageKind,
        category: Option<&str>,
        month: MonthToken,
    ) -> Self {
        Self {
            location_type: location_type.to_string(),
            area_name: area_name.to_string(),
            usage,
            category: category
                .filter(|_| usage.uses_category())
                .map(str::to_string),
            month,
        }
    }
}

/// A single incident after normalisation.
///
/// Field order is the column order of cache files and CSV exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    /// Crime category slug, or the search type for stop and search.
    pub category: String,
    /// Month the record was published under.
    pub month: MonthToken,
    /// When the incident happened, to the precision the API gives.
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Street label, without the `"On or near "` prefix.
    pub street_name: String,
    /// Display label combining street and area.
    pub pretty_name: String,
    pub area_name: String,
    /// [`STREET_TYPE`], or the generic label a resolved street replaced.
    pub type_tag: String,
    /// API identifier, when one was published.
    pub incident_id: Option<String>,
}

impl IncidentRecord {
    /// Column names in serialisation order.
    pub const COLUMNS: &'static [&'static str] = &[
        "category",
        "month",
        "timestamp",
        "latitude",
        "longitude",
        "street_name",
        "pretty_name",
        "area_name",
        "type_tag",
        "incident_id",
    ];

    /// Whether location resolution rewrote this record's street.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.type_tag != STREET_TYPE
    }

    /// The street label the API published, before any resolution.
    #[must_use]
    pub fn published_street(&self) -> &str {
        if self.is_resolved() {
            &self.type_tag
        } else {
            &self.street_name
        }
    }
}
