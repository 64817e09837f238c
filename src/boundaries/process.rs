//! Per-level processing of one country's boundaries.

use anyhow::Result;
use geo::{Geometry, MultiPolygon};
use tracing::{error, warn};

use super::fields::{calculate_fields, count_nulls};
use crate::config::AttributeMappings;
use crate::geometry::{clip_to_boundary, derive_centroids, dissolve};
use crate::models::{AdminLevel, BoundaryFeature, BoundaryLayer, Country};

/// Adjusted polygons of a country at one level, with their centroids
#[derive(Debug, Clone)]
pub struct LevelOutput {
    pub polygons: BoundaryLayer,
    pub points: BoundaryLayer,
}

/// Standardize attributes, dissolve, clip to the national boundary and
/// derive centroids.
pub fn process_level(
    source: BoundaryLayer,
    country: &Country,
    level: AdminLevel,
    national: &MultiPolygon<f64>,
    mappings: &AttributeMappings,
) -> Result<LevelOutput> {
    let iso = country.iso3.as_str();

    let layer = calculate_fields(source, country, level, mappings);
    let layer = dissolve(layer, &level.required_fields());

    let null_names = count_nulls(&layer, &level.ref_field());
    if null_names > 0 {
        warn!("{}: Found {} name null values at {}", iso, null_names, level);
    }
    let null_pcodes = count_nulls(&layer, &level.pcode_field());
    if null_pcodes > 0 {
        warn!("{}: Found {} pcode null values at {}", iso, null_pcodes, level);
    }

    let polygons = adjust_layer(layer, national, iso, &level.pcode_field());
    let points = derive_centroids(&polygons)?;

    Ok(LevelOutput { polygons, points })
}

/// Clip every feature to the national boundary, dropping what falls outside
fn adjust_layer(
    layer: BoundaryLayer,
    national: &MultiPolygon<f64>,
    iso: &str,
    pcode_field: &str,
) -> BoundaryLayer {
    layer
        .features
        .into_iter()
        .filter_map(|feature| {
            let Some(parts) = feature.polygons() else {
                error!("{}: Boundary found with no geometry", iso);
                return None;
            };
            match clip_to_boundary(&parts, national) {
                Some(clipped) => Some(BoundaryFeature::new(
                    feature.attributes,
                    Geometry::MultiPolygon(clipped),
                )),
                None => {
                    error!(
                        "{}: Boundary {} lies outside the national boundary",
                        iso,
                        feature.attribute_str(pcode_field).unwrap_or_default()
                    );
                    None
                }
            }
        })
        .collect()
}
