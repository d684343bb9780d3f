//! Builds the `poly=` parameter for police API street-level queries.
//!
//! The API takes a custom polygon format, `lat,lng:lat,lng:...`, and
//! rejects requests longer than 4094 characters. Coordinates are cut
//! (not rounded) to nine characters of text, which keeps roughly six
//! decimal places for UK coordinates.

use crime_hotspots_incident_models::Ring;
use thiserror::Error;

/// Longest polygon string the API accepts.
pub const MAX_QUERY_LEN: usize = 4094;

/// Characters kept from each formatted coordinate.
const COORD_CHARS: usize = 9;

/// Errors from building a polygon query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The ring has too many vertices to fit in one request.
    #[error("Boundary too complex: query is {length} characters (limit {MAX_QUERY_LEN})")]
    BoundaryTooComplex {
        /// Length of the query that would have been sent.
        length: usize,
    },
}

/// Serializes a ring into the API's polygon format.
///
/// # Errors
///
/// Returns [`QueryError::BoundaryTooComplex`] if the result would exceed
/// [`MAX_QUERY_LEN`].
pub fn build(ring: &Ring) -> Result<String, QueryError> {
    let query = ring
        .coords
        .iter()
        .map(|&(lon, lat)| format!("{},{}", truncate(lat), truncate(lon)))
        .collect::<Vec<_>>()
        .join(":");

    check_len(&query)?;

    Ok(query)
}

/// Verifies an already-built query is within [`MAX_QUERY_LEN`].
///
/// # Errors
///
/// Returns [`QueryError::BoundaryTooComplex`] if it is not.
pub const fn check_len(query: &str) -> Result<(), QueryError> {
    if query.len() > MAX_QUERY_LEN {
        return Err(QueryError::BoundaryTooComplex {
            length: query.len(),
        });
    }
    Ok(())
}

fn truncate(value: f64) -> String {
    let mut text = value.to_string();
    text.truncate(COORD_CHARS);
    text
}
