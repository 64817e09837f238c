//! In-memory global layers, keyed by layer.

use std::collections::BTreeMap;

use crate::models::{AdminLevel, BoundaryLayer, LayerKey, ALPHA_3_FIELD};

use super::process::LevelOutput;

/// Global reference and output layers held for the run
#[derive(Debug, Default)]
pub struct BoundaryStore {
    layers: BTreeMap<LayerKey, BoundaryLayer>,
}

impl BoundaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: LayerKey, layer: BoundaryLayer) {
        self.layers.insert(key, layer);
    }

    pub fn get(&self, key: LayerKey) -> Option<&BoundaryLayer> {
        self.layers.get(&key)
    }

    pub fn contains(&self, key: LayerKey) -> bool {
        self.layers.contains_key(&key)
    }

    /// Swap a country's features at one level in both the polygon and point layers.
    ///
    /// Layers are kept sorted by the level's pcode.
    pub fn replace_country(&mut self, iso: &str, level: AdminLevel, output: LevelOutput) {
        let sort_field = level.pcode_field();
        self.layers
            .entry(LayerKey::polygon(level))
            .or_default()
            .replace_country(iso, output.polygons.features, &sort_field);
        self.layers
            .entry(LayerKey::point(level))
            .or_default()
            .replace_country(iso, output.points.features, &sort_field);
    }

    /// Number of features of a country in a layer
    pub fn country_count(&self, key: LayerKey, iso: &str) -> usize {
        self.get(key)
            .map_or(0, |layer| layer.filter_eq(ALPHA_3_FIELD, iso).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attributes, BoundaryFeature};
    use geo::point;
    use serde_json::json;

    fn feature(iso: &str, pcode: &str) -> BoundaryFeature {
        let mut attributes = Attributes::new();
        attributes.insert("alpha_3".into(), json!(iso));
        attributes.insert("ADM2_PCODE".into(), json!(pcode));
        BoundaryFeature::new(attributes, point!(x: 1.0, y: 2.0).into())
    }

    #[test]
    fn test_replace_country_updates_both_layers() {
        let mut store = BoundaryStore::new();
        store.insert(
            LayerKey::polygon(AdminLevel::Adm2),
            BoundaryLayer::new(vec![feature("SOM", "SO0101"), feature("AFG", "AF0101")]),
        );

        let output = LevelOutput {
            polygons: BoundaryLayer::new(vec![feature("AFG", "AF0102"), feature("AFG", "AF0103")]),
            points: BoundaryLayer::new(vec![feature("AFG", "AF0102"), feature("AFG", "AF0103")]),
        };
        store.replace_country("AFG", AdminLevel::Adm2, output);

        let polygon_key = LayerKey::polygon(AdminLevel::Adm2);
        assert_eq!(store.country_count(polygon_key, "AFG"), 2);
        assert_eq!(store.country_count(polygon_key, "SOM"), 1);
        assert_eq!(
            store.get(polygon_key).unwrap().features[0].attribute_str("ADM2_PCODE").as_deref(),
            Some("AF0102")
        );
        assert_eq!(store.country_count(LayerKey::point(AdminLevel::Adm2), "AFG"), 2);
    }
}
