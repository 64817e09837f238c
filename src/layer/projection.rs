//! Shapefile coordinate systems and reprojection to WGS 84 lon/lat.

use anyhow::{anyhow, Context, Result};
use geo::{Coord, MapCoords};
use proj4rs::proj::Proj;
use std::fs;
use std::path::Path;

use crate::models::{BoundaryFeature, BoundaryLayer};

const WGS84_LONLAT: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Coordinate reference system declared by a shapefile's `.prj`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// No `.prj` next to the shapefile; treated as WGS 84
    Undeclared,
    /// Geographic lon/lat (`GEOGCS`)
    Geographic { name: String, wkt: String },
    /// Projected coordinates (`PROJCS`)
    Projected { name: String, wkt: String },
}

impl Projection {
    pub fn parse(wkt: &str) -> Self {
        let wkt = wkt.trim().to_string();
        let name = wkt.split('"').nth(1).unwrap_or_default().to_string();
        if wkt.to_ascii_uppercase().starts_with("PROJCS") {
            Projection::Projected { name, wkt }
        } else {
            Projection::Geographic { name, wkt }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Projection::Undeclared => "undeclared",
            Projection::Geographic { name, .. } | Projection::Projected { name, .. } => name,
        }
    }

    /// Coordinates can be used as they are
    pub fn is_wgs84(&self) -> bool {
        match self {
            Projection::Undeclared => true,
            Projection::Geographic { name, .. } => {
                let name = name.to_ascii_uppercase().replace(['_', ' '], "");
                name.contains("WGS84") || name.contains("WGS1984")
            }
            Projection::Projected { .. } => false,
        }
    }
}

/// Inspect the `.prj` sidecar of a shapefile
pub fn read_projection(shp_path: &Path) -> Result<Projection> {
    let prj = shp_path.with_extension("prj");
    if !prj.exists() {
        return Ok(Projection::Undeclared);
    }
    let wkt = fs::read_to_string(&prj)
        .with_context(|| format!("Failed to read projection file: {}", prj.display()))?;
    Ok(Projection::parse(&wkt))
}

/// Transform from a declared coordinate system to WGS 84 lon/lat
pub struct Reprojector {
    source: Proj,
    target: Proj,
    /// Source coordinates are degrees, which the transform takes as radians
    geographic: bool,
}

impl Reprojector {
    /// `None` when the layer is already WGS 84
    pub fn new(projection: &Projection) -> Result<Option<Self>> {
        if projection.is_wgs84() {
            return Ok(None);
        }
        let (wkt, geographic) = match projection {
            Projection::Undeclared => return Ok(None),
            Projection::Geographic { wkt, .. } => (wkt, true),
            Projection::Projected { wkt, .. } => (wkt, false),
        };

        let definition = proj4wkt::wkt_to_projstring(wkt)
            .map_err(|e| anyhow!("Unsupported projection {}: {:?}", projection.name(), e))?;
        let source = Proj::from_proj_string(&definition)
            .map_err(|e| anyhow!("Invalid projection '{}': {:?}", definition, e))?;
        let target = Proj::from_proj_string(WGS84_LONLAT)
            .map_err(|e| anyhow!("Invalid projection '{}': {:?}", WGS84_LONLAT, e))?;

        Ok(Some(Self {
            source,
            target,
            geographic,
        }))
    }

    pub fn coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = if self.geographic {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        proj4rs::transform::transform(&self.source, &self.target, &mut point)
            .map_err(|e| anyhow!("Failed to reproject ({}, {}): {:?}", coord.x, coord.y, e))?;
        Ok(Coord {
            x: point.0.to_degrees(),
            y: point.1.to_degrees(),
        })
    }

    pub fn layer(&self, layer: BoundaryLayer) -> Result<BoundaryLayer> {
        let features = layer
            .features
            .into_iter()
            .map(|feature| {
                let geometry = feature.geometry.try_map_coords(|c| self.coord(c))?;
                Ok(BoundaryFeature::new(feature.attributes, geometry))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(BoundaryLayer::new(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, BoundingRect, Geometry};

    const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

    const UTM_42N_PRJ: &str = r#"PROJCS["WGS 84 / UTM zone 42N",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]],PROJECTION["Transverse_Mercator"],PARAMETER["latitude_of_origin",0],PARAMETER["central_meridian",69],PARAMETER["scale_factor",0.9996],PARAMETER["false_easting",500000],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],AUTHORITY["EPSG","32642"]]"#;

    #[test]
    fn test_parse_projection() {
        let wgs84 = Projection::parse(WGS84_PRJ);
        assert_eq!(wgs84.name(), "GCS_WGS_1984");
        assert!(wgs84.is_wgs84());
        assert!(Reprojector::new(&wgs84).unwrap().is_none());

        let utm = Projection::parse(UTM_42N_PRJ);
        assert!(matches!(utm, Projection::Projected { .. }));
        assert_eq!(utm.name(), "WGS 84 / UTM zone 42N");
        assert!(!utm.is_wgs84());
    }

    #[test]
    fn test_missing_prj_is_undeclared() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("afg_admbnda_adm1.shp");
        assert_eq!(read_projection(&shp).unwrap(), Projection::Undeclared);
        assert!(Projection::Undeclared.is_wgs84());
    }

    #[test]
    fn test_reproject_utm() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("afg_admbnda_adm1.shp");
        fs::write(shp.with_extension("prj"), UTM_42N_PRJ).unwrap();

        let projection = read_projection(&shp).unwrap();
        let reprojector = Reprojector::new(&projection).unwrap().unwrap();

        // On the central meridian of zone 42N
        let coord = reprojector
            .coord(Coord { x: 500_000.0, y: 3_800_000.0 })
            .unwrap();
        assert!((coord.x - 69.0).abs() < 1e-6);
        assert!(coord.y > 34.0 && coord.y < 34.6);

        let square: Geometry<f64> = polygon![
            (x: 490_000.0, y: 3_790_000.0),
            (x: 510_000.0, y: 3_790_000.0),
            (x: 510_000.0, y: 3_810_000.0),
            (x: 490_000.0, y: 3_810_000.0),
        ]
        .into();
        let layer = BoundaryLayer::new(vec![BoundaryFeature::new(Default::default(), square)]);
        let reprojected = reprojector.layer(layer).unwrap();
        let bounds = reprojected.features[0].geometry.bounding_rect().unwrap();
        assert!(bounds.min().x > 68.8 && bounds.max().x < 69.2);
        assert!(bounds.min().y > 34.0 && bounds.max().y < 34.6);
    }
}
