//! Zip extraction and shapefile discovery.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::models::AdminLevel;

/// Why no single shapefile could be picked from an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapefileChoice {
    Found(PathBuf),
    NotAZip,
    NoShapefile,
    Ambiguous(Vec<PathBuf>),
}

/// Extract a zip archive into a fresh uuid-named folder under `parent`.
///
/// Returns `Ok(None)` when the file is not a zip archive.
pub fn extract_zip(archive: &Path, parent: &Path) -> Result<Option<PathBuf>> {
    let file = File::open(archive)
        .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
    let mut zip = match zip::ZipArchive::new(file) {
        Ok(z) => z,
        Err(zip::result::ZipError::InvalidArchive(_))
        | Err(zip::result::ZipError::UnsupportedArchive(_)) => return Ok(None),
        Err(e) => return Err(e).context("Failed to read archive"),
    };

    let target = parent.join(Uuid::new_v4().to_string());
    std::fs::create_dir_all(&target)?;
    zip.extract(&target)
        .with_context(|| format!("Failed to extract {}", archive.display()))?;

    debug!(
        "Extracted {} entries from {} into {}",
        zip.len(),
        archive.display(),
        target.display()
    );
    Ok(Some(target))
}

/// All `.shp` files below `dir`, sorted, as paths relative to `dir`
pub fn list_shapefiles(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_shp = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("shp"));
        if is_shp {
            if let Ok(relative) = path.strip_prefix(dir) {
                found.push(relative.to_path_buf());
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Pick the boundary shapefile for a level among candidates.
///
/// Several candidates are narrowed to names like `admbnda_adm2`, then
/// simplified variants are dropped.
pub fn select_shapefile(candidates: Vec<PathBuf>, level: AdminLevel) -> Result<ShapefileChoice> {
    if candidates.is_empty() {
        return Ok(ShapefileChoice::NoShapefile);
    }

    let mut candidates = candidates;

    if candidates.len() > 1 {
        let level_regex = Regex::new(&format!(
            r"(?i)^.*admbnda.*adm(in)?(0)?{}.*",
            level.depth()
        ))?;
        let matching: Vec<PathBuf> = candidates
            .iter()
            .filter(|p| level_regex.is_match(&p.to_string_lossy()))
            .cloned()
            .collect();
        if !matching.is_empty() {
            candidates = matching;
        }
    }

    if candidates.len() > 1 {
        let simplified = Regex::new(r"(?i)simplified")?;
        let full: Vec<PathBuf> = candidates
            .iter()
            .filter(|p| !simplified.is_match(&p.to_string_lossy()))
            .cloned()
            .collect();
        if full.len() < candidates.len() {
            candidates = full;
        }
    }

    Ok(match candidates.len() {
        0 => ShapefileChoice::NoShapefile,
        1 => ShapefileChoice::Found(candidates.remove(0)),
        _ => ShapefileChoice::Ambiguous(candidates),
    })
}

/// Extract an archive and pick the boundary shapefile for a level
pub fn find_shapefile(archive: &Path, parent: &Path, level: AdminLevel) -> Result<ShapefileChoice> {
    let Some(dir) = extract_zip(archive, parent)? else {
        return Ok(ShapefileChoice::NotAZip);
    };
    let candidates = list_shapefiles(&dir)?;
    Ok(match select_shapefile(candidates, level)? {
        ShapefileChoice::Found(relative) => ShapefileChoice::Found(dir.join(relative)),
        other => other,
    })
}
