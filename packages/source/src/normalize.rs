//! Turns raw API incidents into [`IncidentRecord`]s.

use chrono::{DateTime, NaiveDateTime, Utc};
use crime_hotspots_incident_models::{IncidentRecord, MonthToken, STREET_TYPE, UsageKind};

use crate::RawIncident;

/// Prefix the API puts on every street label.
pub const NEAR_PREFIX: &str = "On or near ";

/// Normalizes one fetched batch for `area_name`.
///
/// Returns the records and the number of incidents dropped because their
/// coordinates were missing or not numeric.
#[must_use]
pub fn normalize_batch(
    batch: Vec<RawIncident>,
    area_name: &str,
    usage: UsageKind,
    month: MonthToken,
) -> (Vec<IncidentRecord>, usize) {
    let total = batch.len();
    let records: Vec<IncidentRecord> = batch
        .into_iter()
        .filter_map(|raw| normalize_one(raw, area_name, usage, month))
        .collect();
    let dropped = total - records.len();

    if dropped > 0 {
        log::debug!("{area_name} {month}: dropped {dropped} incidents without usable coordinates");
    }

    (records, dropped)
}

fn normalize_one(
    raw: RawIncident,
    area_name: &str,
    usage: UsageKind,
    month: MonthToken,
) -> Option<IncidentRecord> {
    let location = raw.location?;
    let latitude = coerce_coordinate(location.latitude.as_ref()?)?;
    let longitude = coerce_coordinate(location.longitude.as_ref()?)?;

    let raw_street = location
        .street
        .and_then(|s| s.name)
        .unwrap_or_default();
    let pretty_name = format!("{raw_street} - {area_name}");
    let street_name = raw_street.replace(NEAR_PREFIX, "");

    let category = match usage {
        UsageKind::Crime => raw.category,
        UsageKind::StopSearch => raw.search_type,
    }
    .unwrap_or_default();

    let record_month = raw
        .month
        .as_deref()
        .and_then(|m| m.parse::<MonthToken>().ok())
        .unwrap_or(month);

    let timestamp = raw
        .datetime
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(|| record_month.start_timestamp());

    let incident_id = raw
        .persistent_id
        .filter(|id| !id.is_empty())
        .or_else(|| raw.id.as_ref().and_then(id_text));

    Some(IncidentRecord {
        category,
        month: record_month,
        timestamp,
        latitude,
        longitude,
        street_name,
        pretty_name,
        area_name: area_name.to_string(),
        type_tag: STREET_TYPE.to_string(),
        incident_id,
    })
}

/// Reads a coordinate given as a JSON string or number.
fn coerce_coordinate(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        serde_json::Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

/// Accepts RFC 3339 timestamps and the offset-less form stop and search
/// sometimes uses.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.and_utc())
        })
}

fn id_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
