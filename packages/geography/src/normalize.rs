//! Normalizes boundary features into [`Area`] values.
//!
//! Every shape is canonicalized to a [`MultiPolygon`] so single-part and
//! multi-part boundaries are handled the same way downstream. Each
//! polygon's exterior becomes one [`Ring`]; holes are not queried.

use std::collections::BTreeMap;

use crime_hotspots_incident_models::{Area, Ring, UsageKind};
use geo::{MultiPolygon, Simplify as _};
use geojson::GeoJson;

use crate::GeographyError;

/// Default `GeoJSON` property holding the display name (2018 Westminster
/// constituency name in the ONS boundary files).
pub const DEFAULT_NAME_PROPERTY: &str = "pcon18nm";

/// Wraps a polygon in a singleton multipolygon; multipolygons pass through.
///
/// # Errors
///
/// Returns [`GeographyError::UnsupportedGeometry`] for any other geometry.
pub fn to_multi_polygon(
    name: &str,
    geometry: geo::Geometry<f64>,
) -> Result<MultiPolygon<f64>, GeographyError> {
    match geometry {
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        geo::Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        other => Err(GeographyError::UnsupportedGeometry {
            name: name.to_string(),
            kind: geometry_kind(&other).to_string(),
        }),
    }
}

/// Extracts the exterior ring of each polygon as `(lon, lat)` pairs.
#[must_use]
pub fn rings(multi_polygon: &MultiPolygon<f64>) -> Vec<Ring> {
    multi_polygon
        .0
        .iter()
        .map(|polygon| Ring::new(polygon.exterior().coords().map(|c| (c.x, c.y)).collect()))
        .filter(|ring| !ring.is_empty())
        .collect()
}

/// Builds an [`Area`] from one boundary geometry.
///
/// When `simplify_tolerance` is set, each polygon is simplified with
/// Ramer-Douglas-Peucker (in degrees) to keep vertex counts, and therefore
/// query lengths, bounded.
///
/// # Errors
///
/// Returns [`GeographyError::UnsupportedGeometry`] if the geometry is not
/// polygonal.
pub fn area_from_geometry(
    name: &str,
    usage: UsageKind,
    geometry: geo::Geometry<f64>,
    simplify_tolerance: Option<f64>,
) -> Result<Area, GeographyError> {
    let mut multi_polygon = to_multi_polygon(name, geometry)?;

    if let Some(tolerance) = simplify_tolerance.filter(|t| *t > 0.0) {
        let before = vertex_count(&multi_polygon);
        multi_polygon = multi_polygon.simplify(tolerance);
        log::debug!(
            "Simplified {name}: {before} -> {} vertices",
            vertex_count(&multi_polygon)
        );
    }

    Ok(Area {
        name: name.to_string(),
        usage,
        rings: rings(&multi_polygon),
    })
}

/// Lists every display name in a boundary feature collection.
///
/// # Errors
///
/// Returns [`GeographyError`] if the input is not a `GeoJSON` feature
/// collection.
pub fn area_names(geojson_str: &str, name_property: &str) -> Result<Vec<String>, GeographyError> {
    let collection = parse_collection(geojson_str)?;
    Ok(collection
        .features
        .iter()
        .filter_map(|f| feature_name(f, name_property))
        .collect())
}

/// Loads the requested areas from a boundary feature collection.
///
/// Areas are returned in the order of `names`. Features without a name or
/// geometry are skipped.
///
/// # Errors
///
/// Returns [`GeographyError::UnknownArea`] if a requested name is missing,
/// [`GeographyError::DuplicateArea`] if a requested name appears twice, or
/// any parsing error from the feature collection.
pub fn load_areas(
    geojson_str: &str,
    name_property: &str,
    names: &[String],
    usage: UsageKind,
    simplify_tolerance: Option<f64>,
) -> Result<Vec<Area>, GeographyError> {
    let collection = parse_collection(geojson_str)?;

    let mut found: BTreeMap<String, geo::Geometry<f64>> = BTreeMap::new();

    for feature in collection.features {
        let Some(name) = feature_name(&feature, name_property) else {
            log::debug!("Skipping boundary feature without a {name_property:?} property");
            continue;
        };
        if !names.contains(&name) {
            continue;
        }
        let Some(geometry) = feature.geometry else {
            log::warn!("Boundary feature {name:?} has no geometry");
            continue;
        };
        if found.contains_key(&name) {
            return Err(GeographyError::DuplicateArea(name));
        }
        let geometry: geo::Geometry<f64> = geometry.try_into()?;
        found.insert(name, geometry);
    }

    let mut areas = Vec::with_capacity(names.len());
    for name in names {
        let geometry = found
            .remove(name)
            .ok_or_else(|| GeographyError::UnknownArea(name.clone()))?;
        let area = area_from_geometry(name, usage, geometry, simplify_tolerance)?;
        log::info!("Loaded {name} ({} rings)", area.rings.len());
        areas.push(area);
    }

    Ok(areas)
}

fn parse_collection(geojson_str: &str) -> Result<geojson::FeatureCollection, GeographyError> {
    match geojson_str.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        _ => Err(GeographyError::NotFeatureCollection),
    }
}

fn feature_name(feature: &geojson::Feature, name_property: &str) -> Option<String> {
    feature
        .properties
        .as_ref()?
        .get(name_property)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn vertex_count(multi_polygon: &MultiPolygon<f64>) -> usize {
    multi_polygon.0.iter().map(|p| p.exterior().0.len()).sum()
}

const fn geometry_kind(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}
