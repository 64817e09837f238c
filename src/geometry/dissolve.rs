//! Merging features that share the same key attributes.

use std::collections::BTreeMap;

use geo::Geometry;

use super::adjust::union_all;
use crate::models::{Attributes, BoundaryFeature, BoundaryLayer};

/// Merge features with identical values in `fields` into one feature whose
/// geometry is the union of the group.
///
/// Only `fields` are kept as attributes. Output is ordered by the key values;
/// features without polygonal geometry contribute attributes only.
pub fn dissolve(layer: BoundaryLayer, fields: &[String]) -> BoundaryLayer {
    let mut groups: BTreeMap<Vec<Option<String>>, (Attributes, Vec<_>)> = BTreeMap::new();

    for feature in layer.features {
        let key: Vec<Option<String>> = fields.iter().map(|f| feature.attribute_str(f)).collect();
        let entry = groups.entry(key).or_insert_with(|| {
            let attributes: Attributes = fields
                .iter()
                .filter_map(|f| feature.attributes.get(f).map(|v| (f.clone(), v.clone())))
                .collect();
            (attributes, Vec::new())
        });
        if let Some(parts) = feature.polygons() {
            entry.1.push(parts);
        }
    }

    groups
        .into_values()
        .map(|(attributes, parts)| {
            BoundaryFeature::new(attributes, Geometry::MultiPolygon(union_all(parts)))
        })
        .collect()
}
