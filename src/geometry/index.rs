//! Spatial index for reference water polygons.

use geo::{BoundingRect, MultiPolygon, Polygon};
use rstar::{RTree, RTreeObject, AABB};
use tracing::info;

use crate::models::BoundaryLayer;

/// Wrapper for R-tree indexing of polygons
#[derive(Debug, Clone)]
pub struct IndexedPolygon {
    pub polygon: Polygon<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedPolygon {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedPolygon {
    pub fn new(polygon: Polygon<f64>) -> Option<Self> {
        let rect = polygon.bounding_rect()?;
        Some(Self {
            envelope: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            polygon,
        })
    }
}

/// Water bodies cut out of national boundaries
pub struct WaterIndex {
    tree: RTree<IndexedPolygon>,
}

impl WaterIndex {
    /// Build the index from a water layer; non-polygonal features are ignored
    pub fn build(layer: &BoundaryLayer) -> Self {
        let indexed: Vec<IndexedPolygon> = layer
            .features
            .iter()
            .filter_map(|f| f.polygons())
            .flat_map(|mp| mp.0.into_iter())
            .filter_map(IndexedPolygon::new)
            .collect();

        let tree = RTree::bulk_load(indexed);
        info!("Water index built with {} polygons", tree.size());
        Self { tree }
    }

    pub fn empty() -> Self {
        Self { tree: RTree::new() }
    }

    /// Water polygons whose envelopes intersect the given geometry's envelope
    pub fn candidates(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        let Some(rect) = geometry.bounding_rect() else {
            return MultiPolygon::new(vec![]);
        };
        let envelope =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        MultiPolygon::new(
            self.tree
                .locate_in_envelope_intersecting(&envelope)
                .map(|ip| ip.polygon.clone())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
