//! Geometry processing: national boundaries, clipping, dissolve and centroids.

mod adjust;
mod centroid;
mod dissolve;
mod index;
mod national;

pub use self::adjust::{clip_to_boundary, normalize, union_all};
pub use self::centroid::{derive_centroids, representative_point};
pub use self::dissolve::dissolve;
pub use self::index::{IndexedPolygon, WaterIndex};
pub use self::national::{national_boundary, REFERENCE_ISO_FIELD};
