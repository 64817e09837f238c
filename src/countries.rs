//! Country list loader for HXL-tagged CSV files.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;
use url::Url;

use crate::catalog::CatalogClient;
use crate::models::Country;

const ISO3_TAG: &str = "#country+code+v_iso3";
const NAME_TAG: &str = "#country+name+preferred";

/// Load countries from an HXL CSV (optionally gzipped), keyed by ISO3
pub fn load_countries(path: &Path) -> Result<BTreeMap<String, Country>> {
    info!("Loading countries from {}", path.display());

    let file = File::open(path).context("Failed to open countries file")?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let countries = parse_countries(reader)?;
    info!("Loaded {} countries", countries.len());
    Ok(countries)
}

/// Parse an HXL CSV.
///
/// The hashtag row is either the header row itself or the first data row
/// (the usual HXL layout: human headers, then tags).
pub fn parse_countries<R: Read>(reader: R) -> Result<BTreeMap<String, Country>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = csv_reader.records();
    let mut columns = None;

    // Look for the hashtag row in the first two rows
    for _ in 0..2 {
        let Some(record) = records.next() else {
            break;
        };
        let record = record?;
        let iso_idx = record.iter().position(|h| h.trim() == ISO3_TAG);
        let name_idx = record.iter().position(|h| h.trim() == NAME_TAG);
        if let (Some(iso_idx), Some(name_idx)) = (iso_idx, name_idx) {
            columns = Some((iso_idx, name_idx));
            break;
        }
    }

    let (iso_idx, name_idx) = columns.with_context(|| {
        format!(
            "Countries file has no '{}' and '{}' hashtags",
            ISO3_TAG, NAME_TAG
        )
    })?;

    let mut countries = BTreeMap::new();
    for result in records {
        let record = result?;
        let (Some(iso), Some(name)) = (record.get(iso_idx), record.get(name_idx)) else {
            continue;
        };
        if iso.trim().is_empty() {
            continue;
        }
        let country = Country::new(iso, name);
        countries.insert(country.iso3.clone(), country);
    }

    Ok(countries)
}

/// Load the country list from a local path or an http(s) URL.
///
/// URLs are downloaded into `folder` first.
pub async fn fetch_countries(
    client: &CatalogClient,
    source: &str,
    folder: &Path,
) -> Result<BTreeMap<String, Country>> {
    let path = match Url::parse(source) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            let file_name = url
                .path_segments()
                .and_then(|mut s| s.next_back())
                .filter(|s| !s.is_empty())
                .unwrap_or("countries.csv")
                .to_string();
            client
                .download_url(source, &file_name, folder)
                .await
                .with_context(|| format!("Could not download countries from {}", source))?
        }
        _ => Path::new(source).to_path_buf(),
    };
    load_countries(&path)
}

/// Countries to process: every country, or only the requested codes.
///
/// Requested codes must all be known.
pub fn select_countries(
    all: &BTreeMap<String, Country>,
    requested: Option<&[String]>,
) -> Result<Vec<Country>> {
    let Some(requested) = requested else {
        return Ok(all.values().cloned().collect());
    };
    requested
        .iter()
        .map(|code| {
            let code = code.trim().to_ascii_uppercase();
            all.get(&code)
                .cloned()
                .with_context(|| format!("Unknown country code '{}'", code))
        })
        .collect()
}
