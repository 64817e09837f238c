//! Mapping source attribute tables onto the standard COD fields.

use hashbrown::HashSet;
use serde_json::Value;
use tracing::warn;

use crate::config::AttributeMappings;
use crate::models::{
    AdminLevel, Attributes, BoundaryFeature, BoundaryLayer, Country, ADM0_REF_FIELD, ALPHA_3_FIELD,
};

/// Source columns chosen for one level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSources {
    pub depth: u8,
    pub pcode: Option<String>,
    pub name: Option<String>,
}

/// Column names of a layer in first-seen order
pub fn column_names(layer: &BoundaryLayer) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut columns = Vec::new();
    for feature in &layer.features {
        for key in feature.attributes.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// First candidate (in priority order) present among `columns`, compared case-insensitively
fn find_column(columns: &[String], preferred: &str, candidates: &[String]) -> Option<String> {
    if let Some(exact) = columns.iter().find(|c| *c == preferred) {
        return Some(exact.clone());
    }
    candidates.iter().find_map(|candidate| {
        columns
            .iter()
            .find(|c| c.to_uppercase() == *candidate)
            .cloned()
    })
}

/// Pick the pcode and name source columns for every level down to `level`
pub fn resolve_sources(
    columns: &[String],
    level: AdminLevel,
    mappings: &AttributeMappings,
) -> Vec<FieldSources> {
    (1..=level.depth())
        .map(|depth| FieldSources {
            depth,
            pcode: find_column(
                columns,
                &format!("ADM{}_PCODE", depth),
                &mappings.pcode_candidates(depth),
            ),
            name: find_column(
                columns,
                &format!("ADM{}_EN", depth),
                &mappings.name_candidates(depth),
            ),
        })
        .collect()
}

/// Pcodes are text; numeric codes lose any fractional part
fn pcode_value(value: &Value) -> Value {
    match value {
        Value::Number(n) => {
            let code = n
                .as_i64()
                .map(|i| i.to_string())
                .or_else(|| n.as_u64().map(|u| u.to_string()))
                .or_else(|| n.as_f64().map(|f| format!("{}", f.trunc() as i64)))
                .unwrap_or_default();
            Value::String(code)
        }
        other => other.clone(),
    }
}

/// Replace each feature's attributes with the standard fields of `level`.
///
/// Sets `alpha_3` and `ADM0_REF` from the country, and the pcode and name of
/// every level from the configured candidate columns. A missing source
/// column yields empty strings. Every other attribute is dropped.
pub fn calculate_fields(
    layer: BoundaryLayer,
    country: &Country,
    level: AdminLevel,
    mappings: &AttributeMappings,
) -> BoundaryLayer {
    let sources = resolve_sources(&column_names(&layer), level, mappings);
    for source in &sources {
        if source.name.is_none() {
            warn!("{}: Could not map name field for adm{}", country.iso3, source.depth);
        }
        if source.pcode.is_none() {
            warn!("{}: Could not map pcode field for adm{}", country.iso3, source.depth);
        }
    }

    layer
        .features
        .into_iter()
        .map(|feature| {
            let mut attributes = Attributes::new();
            attributes.insert(ALPHA_3_FIELD.into(), Value::String(country.iso3.clone()));
            attributes.insert(ADM0_REF_FIELD.into(), Value::String(country.name.clone()));

            for source in &sources {
                let lookup = |column: &Option<String>| -> Option<Value> {
                    column
                        .as_ref()
                        .map(|c| feature.attributes.get(c).cloned().unwrap_or(Value::Null))
                };
                let pcode = lookup(&source.pcode)
                    .map(|v| pcode_value(&v))
                    .unwrap_or_else(|| Value::String(String::new()));
                let name = lookup(&source.name).unwrap_or_else(|| Value::String(String::new()));

                attributes.insert(format!("ADM{}_PCODE", source.depth), pcode);
                attributes.insert(format!("ADM{}_REF", source.depth), name);
            }

            BoundaryFeature::new(attributes, feature.geometry)
        })
        .collect()
}

/// Number of features whose `field` is null or missing
pub fn count_nulls(layer: &BoundaryLayer, field: &str) -> usize {
    layer
        .features
        .iter()
        .filter(|f| f.attributes.get(field).map_or(true, Value::is_null))
        .count()
}
