//! Writing global layers and replacing the catalog resources.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use super::store::BoundaryStore;
use crate::catalog::{CatalogClient, Dataset};
use crate::config::UnBoundariesConfig;
use crate::layer::write_geojson;
use crate::models::{AdminLevel, LayerKey};

/// Write the polygon and point layers of a level into `folder` under their
/// resource names. Returns `(resource name, file)` pairs.
pub fn write_level(
    store: &BoundaryStore,
    resources: &UnBoundariesConfig,
    level: AdminLevel,
    folder: &Path,
) -> Result<Vec<(String, PathBuf)>> {
    [LayerKey::polygon(level), LayerKey::point(level)]
        .into_iter()
        .map(|key| {
            let name = resources
                .resource_name(key)
                .ok_or_else(|| anyhow!("No resource configured for layer {}", key))?;
            let layer = store
                .get(key)
                .ok_or_else(|| anyhow!("Layer {} was never loaded", key))?;
            let path = folder.join(name);
            write_geojson(layer, &path)?;
            info!("Wrote {} features of {} to {}", layer.len(), key, path.display());
            Ok((name.to_string(), path))
        })
        .collect()
}

/// Upload written files into the dataset's resources of the same name
pub async fn upload_files(
    client: &CatalogClient,
    dataset: &Dataset,
    files: &[(String, PathBuf)],
) -> Result<()> {
    for (name, path) in files {
        let resource = dataset
            .resource(name)
            .ok_or_else(|| anyhow!("Resource {} not found in dataset {}", name, dataset.name))?;
        client
            .upload_resource(resource, path)
            .await
            .with_context(|| format!("Could not update resource {}", name))?;
    }
    Ok(())
}
