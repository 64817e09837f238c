//! Core data models for the boundary pipeline.

pub mod admin;
pub mod country;
pub mod feature;

pub use admin::{AdminLevel, GeometryKind, LayerKey, ADM0_REF_FIELD, ALPHA_3_FIELD};
pub use country::Country;
pub use feature::{polygonal_parts, Attributes, BoundaryFeature, BoundaryLayer};
