//! Reading and writing boundary layers (GeoJSON, shapefile, zipped shapefile).

mod archive;
mod geojson_file;
mod projection;
mod shp;

pub use self::archive::{extract_zip, find_shapefile, list_shapefiles, select_shapefile, ShapefileChoice};
pub use self::geojson_file::{parse_geojson, read_geojson, to_geojson, write_geojson};
pub use self::projection::{read_projection, Projection, Reprojector};
pub use self::shp::read_shapefile;
#[cfg(test)]
pub(crate) use self::shp::tests::write_adm1_shapefile;

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::models::BoundaryLayer;

/// Read a downloaded layer file, choosing the reader by extension.
///
/// Zip archives must contain exactly one shapefile.
pub fn read_layer(path: &Path, scratch: &Path) -> Result<BoundaryLayer> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| anyhow!("Layer file has no extension: {}", path.display()))?;

    match extension.as_str() {
        "json" | "geojson" => read_geojson(path),
        "shp" => read_shapefile(path),
        "zip" => {
            let dir = extract_zip(path, scratch)?
                .ok_or_else(|| anyhow!("Not a zip archive: {}", path.display()))?;
            let shapefiles = list_shapefiles(&dir)?;
            match shapefiles.as_slice() {
                [single] => read_shapefile(&dir.join(single)),
                [] => Err(anyhow!("No shapefile in {}", path.display())),
                _ => Err(anyhow!(
                    "{} shapefiles in {}, expected one",
                    shapefiles.len(),
                    path.display()
                )),
            }
        }
        _ => Err(anyhow!("Unsupported layer format: {}", extension)),
    }
}
