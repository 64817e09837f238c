//! Subnational boundary processing against the UN reference boundaries.
//!
//! [`Boundaries`] holds the global layers for the run: it loads the
//! reference dataset, replaces countries' features level by level, and
//! publishes the results back into the reference dataset.

mod fields;
mod process;
mod publish;
mod select;
mod store;

pub use self::fields::{calculate_fields, column_names, count_nulls, resolve_sources, FieldSources};
pub use self::process::{process_level, LevelOutput};
pub use self::publish::{upload_files, write_level};
pub use self::select::{is_reference_needed, reference_resource_level, select_resources};
pub use self::store::BoundaryStore;

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogClient, Dataset, Resource};
use crate::config::ProjectConfig;
use crate::geometry::{national_boundary, WaterIndex};
use crate::layer::{
    find_shapefile, read_layer, read_projection, read_shapefile, Reprojector, ShapefileChoice,
};
use crate::models::{AdminLevel, BoundaryLayer, Country, LayerKey};

/// What happened to one country
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryOutcome {
    /// Levels whose features were replaced
    Processed(Vec<AdminLevel>),
    Skipped,
}

/// Global boundary layers and the processing steps over them
pub struct Boundaries<'a> {
    client: &'a CatalogClient,
    config: &'a ProjectConfig,
    temp_folder: PathBuf,
    store: BoundaryStore,
    water: WaterIndex,
}

impl<'a> Boundaries<'a> {
    pub fn new(client: &'a CatalogClient, config: &'a ProjectConfig, temp_folder: &Path) -> Self {
        Self {
            client,
            config,
            temp_folder: temp_folder.to_path_buf(),
            store: BoundaryStore::new(),
            water: WaterIndex::empty(),
        }
    }

    pub fn store(&self) -> &BoundaryStore {
        &self.store
    }

    /// Download the reference layers and the current global layers of the requested levels
    pub async fn download_boundary_inputs(&mut self, levels: &[AdminLevel]) -> Result<()> {
        info!("Downloading boundaries");
        let un = &self.config.un_boundaries;
        let dataset = self
            .client
            .read_dataset(&un.dataset)
            .await
            .with_context(|| format!("Could not read reference dataset {}", un.dataset))?;

        for resource in &dataset.resources {
            let Some(key) = un.resources.get(&resource.name).copied() else {
                continue;
            };
            if !is_reference_needed(&resource.name, levels) {
                debug!("Skipping {}: level not requested", resource.name);
                continue;
            }

            let path = self
                .client
                .download_resource(resource, &self.temp_folder)
                .await
                .with_context(|| format!("Could not download {}", resource.name))?;
            let layer = read_layer(&path, &self.temp_folder)
                .with_context(|| format!("Could not read {}", resource.name))?;
            info!("Loaded {} ({} features) as {}", resource.name, layer.len(), key);
            self.store.insert(key, layer);
        }

        if !self.store.contains(LayerKey::polygon(AdminLevel::Adm0)) {
            bail!("Reference dataset {} has no adm0 polygon layer", un.dataset);
        }
        match self.store.get(LayerKey::Water) {
            Some(water) => self.water = WaterIndex::build(water),
            None => warn!("Reference dataset {} has no water layer", un.dataset),
        }
        Ok(())
    }

    /// Replace a country's features at every requested level.
    ///
    /// With `strict`, a country without a boundary dataset is an error
    /// instead of a skip.
    pub async fn update_subnational_boundaries(
        &mut self,
        country: &Country,
        levels: &[AdminLevel],
        strict: bool,
    ) -> Result<CountryOutcome> {
        let iso = country.iso3.as_str();
        if self.config.do_not_process.iter().any(|c| c.eq_ignore_ascii_case(iso)) {
            warn!("{}: Not processing for now", iso);
            return Ok(CountryOutcome::Skipped);
        }

        let level_names: Vec<&str> = levels.iter().map(|l| l.as_str()).collect();
        info!("{}: Processing {} boundaries", iso, level_names.join(","));

        let Some(dataset) = self.find_country_dataset(country).await? else {
            if strict {
                bail!("{}: Could not find boundary dataset", iso);
            }
            error!("{}: Could not find boundary dataset", iso);
            return Ok(CountryOutcome::Skipped);
        };

        let adm0 = self
            .store
            .get(LayerKey::polygon(AdminLevel::Adm0))
            .ok_or_else(|| anyhow!("Reference adm0 layer not loaded"))?;
        let Some(national) = national_boundary(adm0, &self.water, iso) else {
            error!("{}: No reference national boundary", iso);
            return Ok(CountryOutcome::Skipped);
        };

        let mut processed = Vec::new();
        for &level in levels {
            let Some(source) = self.load_country_level(country, &dataset, level).await? else {
                continue;
            };
            let output = process_level(
                source,
                country,
                level,
                &national,
                &self.config.shapefile_attribute_mappings,
            )
            .with_context(|| format!("{}: Could not process {} boundaries", iso, level))?;

            info!(
                "{}: {} {} units adjusted",
                iso,
                output.polygons.len(),
                level
            );
            self.store.replace_country(iso, level, output);
            processed.push(level);
            info!("{}: Finished processing {} boundaries", iso, level);
        }

        if processed.is_empty() {
            warn!("{}: No level could be processed", iso);
            return Ok(CountryOutcome::Skipped);
        }
        Ok(CountryOutcome::Processed(processed))
    }

    /// Write and upload the global polygon and point layers of every level
    pub async fn update_subnational_resources(&self, levels: &[AdminLevel]) -> Result<()> {
        let un = &self.config.un_boundaries;
        let dataset = self
            .client
            .read_dataset(&un.dataset)
            .await
            .with_context(|| format!("Could not read reference dataset {}", un.dataset))?;

        for &level in levels {
            info!("Updating catalog datasets at {}", level);
            let files = write_level(&self.store, un, level, &self.temp_folder)?;
            upload_files(self.client, &dataset, &files).await?;
        }
        Ok(())
    }

    /// `cod-em` (or the configured exception) first, then `cod-ab`
    async fn find_country_dataset(&self, country: &Country) -> Result<Option<Dataset>> {
        let primary = self.config.dataset_name(&country.iso3);
        if let Some(dataset) = self.client.find_dataset(&primary).await? {
            return Ok(Some(dataset));
        }
        let fallback = format!("cod-ab-{}", country.iso3_lower());
        debug!("{}: {} not found, trying {}", country.iso3, primary, fallback);
        Ok(self.client.find_dataset(&fallback).await?)
    }

    /// Locate, download and read the boundary shapefile of a level.
    ///
    /// Gaps in the country's data are logged and give `None`.
    async fn load_country_level(
        &self,
        country: &Country,
        dataset: &Dataset,
        level: AdminLevel,
    ) -> Result<Option<BoundaryLayer>> {
        let iso = country.iso3.as_str();

        let resources = select_resources(dataset, self.config.resource_pattern(iso), level)?;
        let resource: &Resource = match resources.as_slice() {
            [] => {
                warn!("{}: Could not find boundary resource at {}", iso, level);
                return Ok(None);
            }
            [single] => *single,
            _ => {
                error!("{}: Could not distinguish between resources for {}", iso, level);
                return Ok(None);
            }
        };

        let archive = match self.client.download_resource(resource, &self.temp_folder).await {
            Ok(path) => path,
            Err(e) if e.is_not_found() => {
                error!("{}: Could not download {} resource: {}", iso, level, e);
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("{}: Could not download {}", iso, resource.name))
            }
        };

        let shapefile = match find_shapefile(&archive, &self.temp_folder, level)? {
            ShapefileChoice::Found(path) => path,
            ShapefileChoice::NotAZip => {
                error!("{}: Could not unzip {} file - it might not be a zip!", iso, level);
                return Ok(None);
            }
            ShapefileChoice::NoShapefile => {
                error!("{}: Did not find an {} shapefile!", iso, level);
                return Ok(None);
            }
            ShapefileChoice::Ambiguous(candidates) => {
                error!(
                    "{}: Could not distinguish between {} downloaded shapefiles: {:?}",
                    iso, level, candidates
                );
                return Ok(None);
            }
        };

        let projection = read_projection(&shapefile)?;
        let reprojector = match Reprojector::new(&projection) {
            Ok(reprojector) => reprojector,
            Err(e) => {
                error!("{}: Cannot reproject {} shapefile: {:#}", iso, level, e);
                return Ok(None);
            }
        };

        let layer = match read_shapefile(&shapefile) {
            Ok(layer) => layer,
            Err(e) => {
                error!("{}: Could not read {} shapefile: {:#}", iso, level, e);
                return Ok(None);
            }
        };

        let Some(reprojector) = reprojector else {
            return Ok(Some(layer));
        };
        info!("{}: Reprojecting {} from {}", iso, level, projection.name());
        match reprojector.layer(layer) {
            Ok(layer) => Ok(Some(layer)),
            Err(e) => {
                error!("{}: Could not reproject {} shapefile: {:#}", iso, level, e);
                Ok(None)
            }
        }
    }
}
