//! Representative points for boundary polygons.

use anyhow::{anyhow, Result};
use geo::{BoundingRect, Centroid, Contains, Geometry, InteriorPoint, MultiPolygon, Point};

use crate::models::{BoundaryFeature, BoundaryLayer};

/// A point inside the polygon set.
///
/// The area centroid when it falls inside, else an interior point, else the
/// center of the bounding box.
pub fn representative_point(geometry: &MultiPolygon<f64>) -> Option<Point<f64>> {
    if let Some(centroid) = geometry.centroid() {
        if geometry.contains(&centroid) {
            return Some(centroid);
        }
    }
    geometry
        .interior_point()
        .or_else(|| geometry.bounding_rect().map(|r| Point::from(r.center())))
}

/// One point feature per polygon feature, with the attributes copied.
///
/// Fails if a feature has no polygonal geometry, so the output always pairs
/// one-to-one with the input.
pub fn derive_centroids(polygons: &BoundaryLayer) -> Result<BoundaryLayer> {
    polygons
        .features
        .iter()
        .map(|feature| {
            let point = feature
                .polygons()
                .and_then(|mp| representative_point(&mp))
                .ok_or_else(|| {
                    anyhow!(
                        "No representative point for feature {:?}",
                        feature.attributes
                    )
                })?;
            Ok(BoundaryFeature::new(
                feature.attributes.clone(),
                Geometry::Point(point),
            ))
        })
        .collect()
}
