//! Polygon repair, union and clipping against the reference boundary.

use geo::{Area, BooleanOps, MultiPolygon};

/// Re-node a polygon set so self-intersections and overlaps are resolved.
///
/// Overlapping parts are merged, not cut into holes.
pub fn normalize(geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    union_all(std::iter::once(geometry.clone()))
}

/// Union of all parts.
///
/// The overlay fills each operand even-odd, so polygons are added one at a
/// time: two overlapping parts of one operand would otherwise cancel out.
pub fn union_all<I>(parts: I) -> MultiPolygon<f64>
where
    I: IntoIterator<Item = MultiPolygon<f64>>,
{
    parts
        .into_iter()
        .flat_map(|part| part.0)
        .fold(MultiPolygon::<f64>::new(vec![]), |acc, polygon| {
            acc.union(&MultiPolygon::new(vec![polygon]))
        })
}

/// Clip a unit to the national boundary.
///
/// `None` when nothing of the unit lies inside the boundary.
pub fn clip_to_boundary(
    geometry: &MultiPolygon<f64>,
    national: &MultiPolygon<f64>,
) -> Option<MultiPolygon<f64>> {
    let clipped = normalize(geometry).intersection(national);
    if clipped.0.is_empty() || clipped.unsigned_area() <= 0.0 {
        None
    } else {
        Some(clipped)
    }
}
