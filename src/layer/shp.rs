//! ESRI shapefile reading.

use anyhow::{anyhow, Context, Result};
use geo::{Geometry, MultiPolygon};
use serde_json::{Number, Value};
use shapefile::dbase::FieldValue;
use shapefile::{Reader, Shape};
use std::path::Path;
use tracing::{debug, warn};

use crate::models::{Attributes, BoundaryFeature, BoundaryLayer};

/// Load the polygons and attribute table of a shapefile
pub fn read_shapefile(path: &Path) -> Result<BoundaryLayer> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {}", path.display()))?;

    let mut features = Vec::new();
    let mut skipped = 0usize;

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let geometry: MultiPolygon<f64> = match shape {
            Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => {
                skipped += 1;
                continue;
            }
        };

        let mut attributes = Attributes::new();
        for (name, value) in record {
            attributes.insert(name, field_to_json(value));
        }

        features.push(BoundaryFeature::new(
            attributes,
            Geometry::MultiPolygon(geometry),
        ));
    }

    if skipped > 0 {
        warn!(
            "Skipped {} non-polygon shapes in {}",
            skipped,
            path.display()
        );
    }
    debug!("Read {} features from {}", features.len(), path.display());

    Ok(BoundaryLayer::new(features))
}

fn field_to_json(value: FieldValue) -> Value {
    let number = |n: f64| Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null);
    match value {
        FieldValue::Character(Some(s)) => Value::String(s.trim_end().to_string()),
        FieldValue::Memo(s) => Value::String(s),
        FieldValue::Numeric(Some(n)) => number(n),
        FieldValue::Float(Some(n)) => number(f64::from(n)),
        FieldValue::Double(n) => number(n),
        FieldValue::Currency(n) => number(n),
        FieldValue::Integer(n) => Value::from(n),
        FieldValue::Logical(Some(b)) => Value::Bool(b),
        _ => Value::Null,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use shapefile::dbase::{FieldName, Record, TableWriterBuilder};
    use shapefile::{Point, Polygon, PolygonRing, Writer};

    /// Clockwise outer ring of an axis-aligned rectangle
    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::new(PolygonRing::Outer(vec![
            Point::new(x0, y0),
            Point::new(x0, y1),
            Point::new(x1, y1),
            Point::new(x1, y0),
            Point::new(x0, y0),
        ]))
    }

    /// Write an adm1 shapefile with `ADM1_PCODE`/`ADM1_EN` columns
    pub(crate) fn write_adm1_shapefile(path: &Path, units: &[(&str, &str, [f64; 4])]) {
        let table = TableWriterBuilder::new()
            .add_character_field(FieldName::try_from("ADM1_PCODE").unwrap(), 20)
            .add_character_field(FieldName::try_from("ADM1_EN").unwrap(), 50);
        let mut writer = Writer::from_path(path, table).unwrap();
        for (pcode, name, [x0, y0, x1, y1]) in units {
            let mut record = Record::default();
            record.insert(
                "ADM1_PCODE".to_string(),
                FieldValue::Character(Some(pcode.to_string())),
            );
            record.insert(
                "ADM1_EN".to_string(),
                FieldValue::Character(Some(name.to_string())),
            );
            writer
                .write_shape_and_record(&rect(*x0, *y0, *x1, *y1), &record)
                .unwrap();
        }
    }

    #[test]
    fn test_read_shapefile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xyz_admbnda_adm1.shp");
        write_adm1_shapefile(
            &path,
            &[
                ("XY01", "West", [0.0, 0.0, 5.0, 10.0]),
                ("XY02", "East", [5.0, 0.0, 11.0, 10.0]),
            ],
        );

        let layer = read_shapefile(&path).unwrap();
        assert_eq!(layer.len(), 2);
        let west = &layer.features[0];
        assert_eq!(west.attribute_str("ADM1_PCODE").as_deref(), Some("XY01"));
        assert_eq!(west.attribute_str("ADM1_EN").as_deref(), Some("West"));
        let area = geo::Area::unsigned_area(&west.polygons().unwrap());
        assert!((area - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_field_values() {
        assert_eq!(
            field_to_json(FieldValue::Character(Some("AF01  ".into()))),
            Value::String("AF01".into())
        );
        assert_eq!(field_to_json(FieldValue::Character(None)), Value::Null);
        assert_eq!(field_to_json(FieldValue::Numeric(Some(12.0))), serde_json::json!(12.0));
        assert_eq!(field_to_json(FieldValue::Numeric(None)), Value::Null);
    }
}
