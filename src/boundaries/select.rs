//! Picking catalog resources by name and file type.

use anyhow::Result;
use regex::Regex;

use crate::catalog::{Dataset, Resource};
use crate::models::AdminLevel;

const SHAPEFILE_TYPES: [&str; 2] = ["shp", "zipped shapefile"];

/// Shapefile resources of a country dataset for one level.
///
/// Keeps resources whose name matches `pattern`; several matches are
/// narrowed to names carrying the level (`adm2`, `admin 02`, ...).
pub fn select_resources<'a>(
    dataset: &'a Dataset,
    pattern: &str,
    level: AdminLevel,
) -> Result<Vec<&'a Resource>> {
    let name_regex = Regex::new(&format!("(?i)^.*{}.*", pattern))?;
    let mut selected: Vec<&Resource> = dataset
        .resources
        .iter()
        .filter(|r| SHAPEFILE_TYPES.contains(&r.file_type().as_str()))
        .filter(|r| name_regex.is_match(&r.name))
        .collect();

    if selected.len() > 1 {
        let level_regex = Regex::new(&format!(r"(?i)^.*adm(in)?(\s)?(0)?{}.*", level.depth()))?;
        selected.retain(|r| level_regex.is_match(&r.name));
    }
    Ok(selected)
}

/// Level of a global boundary resource named like `polbnda_adm2_...`
pub fn reference_resource_level(name: &str) -> Option<AdminLevel> {
    let regex = Regex::new(r"^polbnd[ap]_adm(\d)").ok()?;
    let depth = regex.captures(name)?.get(1)?.as_str().parse().ok()?;
    AdminLevel::from_depth(depth)
}

/// Whether a reference resource is needed for the requested levels
pub fn is_reference_needed(name: &str, levels: &[AdminLevel]) -> bool {
    match reference_resource_level(name) {
        Some(level) => levels.contains(&level),
        None => true,
    }
}
