//! GeoJSON reading and writing for boundary layers.

use anyhow::{anyhow, Context, Result};
use geojson::{Feature, FeatureCollection, GeoJson};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

use crate::models::{BoundaryFeature, BoundaryLayer};

/// Load a GeoJSON FeatureCollection file
pub fn read_geojson(path: &Path) -> Result<BoundaryLayer> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {}", path.display()))?;
    parse_geojson(BufReader::new(file))
        .with_context(|| format!("Failed to load GeoJSON file: {}", path.display()))
}

/// Parse a GeoJSON FeatureCollection. Features without geometry are skipped.
pub fn parse_geojson<R: Read>(reader: R) -> Result<BoundaryLayer> {
    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut features = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;

    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };
        let geometry: geo::Geometry<f64> = geometry
            .value
            .try_into()
            .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

        features.push(BoundaryFeature::new(
            feature.properties.unwrap_or_default(),
            geometry,
        ));
    }

    if skipped > 0 {
        debug!("Skipped {} features without geometry", skipped);
    }

    Ok(BoundaryLayer::new(features))
}

/// Serialize a layer as a GeoJSON FeatureCollection
pub fn to_geojson(layer: &BoundaryLayer) -> GeoJson {
    let features = layer
        .features
        .iter()
        .map(|f| Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&f.geometry))),
            id: None,
            properties: Some(f.attributes.clone()),
            foreign_members: None,
        })
        .collect();

    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Write a layer to a GeoJSON file
pub fn write_geojson(layer: &BoundaryLayer, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create GeoJSON file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(to_geojson(layer).to_string().as_bytes())?;
    writer.flush()?;
    debug!("Wrote {} features to {}", layer.len(), path.display());
    Ok(())
}
