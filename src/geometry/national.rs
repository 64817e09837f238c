//! National boundaries from the reference adm0 layer.

use geo::{BooleanOps, MultiPolygon};
use tracing::debug;

use super::adjust::{normalize, union_all};
use super::index::WaterIndex;
use crate::models::BoundaryLayer;

/// Country code column of the reference adm0 layer
pub const REFERENCE_ISO_FIELD: &str = "ISO_3";

/// Build the national boundary of a country, including disputed areas
/// assigned to it, with water bodies cut out.
///
/// `None` when the reference layer has no polygon for the country.
pub fn national_boundary(
    adm0: &BoundaryLayer,
    water: &WaterIndex,
    iso: &str,
) -> Option<MultiPolygon<f64>> {
    let parts: Vec<MultiPolygon<f64>> = adm0
        .filter_eq(REFERENCE_ISO_FIELD, iso)
        .filter_map(|f| f.polygons())
        .collect();
    if parts.is_empty() {
        return None;
    }
    debug!("{}: {} reference polygons", iso, parts.len());

    let country = union_all(parts);
    let lakes = water.candidates(&country);
    let boundary = if lakes.0.is_empty() {
        country
    } else {
        debug!("{}: cutting out {} water polygons", iso, lakes.0.len());
        // Overlapping lakes would cancel out as a single operand
        country.difference(&normalize(&lakes))
    };

    let boundary = normalize(&boundary);
    (!boundary.0.is_empty()).then_some(boundary)
}
