//! cod-boundaries - Subnational boundary harmonization for the humanitarian data catalog
//!
//! Downloads COD administrative boundaries, clips them to the UN international
//! boundaries, derives centroids and publishes global polygon and point layers.

pub mod boundaries;
pub mod catalog;
pub mod config;
pub mod countries;
pub mod geometry;
pub mod layer;
pub mod models;
pub mod pipeline;

pub use models::{AdminLevel, BoundaryFeature, BoundaryLayer, Country, LayerKey};
pub use pipeline::{run_update, RunPlan, RunSummary};
