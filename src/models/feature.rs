//! Boundary features and layers.

use geo::{Geometry, MultiPolygon};
use serde_json::Value;

use super::admin::ALPHA_3_FIELD;

/// Attribute table row of a feature
pub type Attributes = serde_json::Map<String, Value>;

/// A single boundary feature: geometry plus attributes
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    pub attributes: Attributes,
    pub geometry: Geometry<f64>,
}

impl BoundaryFeature {
    pub fn new(attributes: Attributes, geometry: Geometry<f64>) -> Self {
        Self {
            attributes,
            geometry,
        }
    }

    /// Get an attribute as text. Numbers are rendered, null and missing are `None`.
    pub fn attribute_str(&self, field: &str) -> Option<String> {
        match self.attributes.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Country code of a subnational feature
    pub fn alpha_3(&self) -> Option<String> {
        self.attribute_str(ALPHA_3_FIELD)
    }

    /// Polygonal part of the geometry.
    ///
    /// Points and lines inside collections are dropped; `None` when nothing
    /// polygonal remains.
    pub fn polygons(&self) -> Option<MultiPolygon<f64>> {
        polygonal_parts(&self.geometry)
    }
}

/// Extract the polygonal parts of a geometry into a MultiPolygon
pub fn polygonal_parts(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    let mut polygons = Vec::new();
    collect_polygons(geometry, &mut polygons);
    if polygons.is_empty() {
        None
    } else {
        Some(MultiPolygon::new(polygons))
    }
}

fn collect_polygons(geometry: &Geometry<f64>, out: &mut Vec<geo::Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(p) => out.push(p.clone()),
        Geometry::MultiPolygon(mp) => out.extend(mp.0.iter().cloned()),
        Geometry::Rect(r) => out.push(r.to_polygon()),
        Geometry::Triangle(t) => out.push(t.to_polygon()),
        Geometry::GeometryCollection(gc) => {
            for g in gc.iter() {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

/// An ordered collection of boundary features
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryLayer {
    pub features: Vec<BoundaryFeature>,
}

impl BoundaryLayer {
    pub fn new(features: Vec<BoundaryFeature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features whose `field` equals `value` as text
    pub fn filter_eq<'a>(
        &'a self,
        field: &'a str,
        value: &'a str,
    ) -> impl Iterator<Item = &'a BoundaryFeature> + 'a {
        self.features
            .iter()
            .filter(move |f| f.attribute_str(field).as_deref() == Some(value))
    }

    /// Replace every feature of a country with `replacement`, then order by `sort_field`.
    ///
    /// The sort is stable, so features with equal keys keep their relative order.
    pub fn replace_country(
        &mut self,
        iso: &str,
        replacement: Vec<BoundaryFeature>,
        sort_field: &str,
    ) {
        self.features
            .retain(|f| f.alpha_3().as_deref() != Some(iso));
        self.features.extend(replacement);
        self.features
            .sort_by_cached_key(|f| f.attribute_str(sort_field).unwrap_or_default());
    }
}

impl FromIterator<BoundaryFeature> for BoundaryLayer {
    fn from_iter<I: IntoIterator<Item = BoundaryFeature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
