//! Project configuration and catalog credentials.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::models::{AdminLevel, LayerKey};

/// Default location of the project configuration, relative to the working directory
pub const DEFAULT_PROJECT_CONFIG: &str = "config/project_configuration.toml";
/// Credentials file name in the user's home directory
pub const CREDENTIALS_FILE_NAME: &str = ".hdx_configuration.toml";

pub const ENV_USER_AGENT: &str = "USER_AGENT";
pub const ENV_HDX_KEY: &str = "HDX_KEY";
pub const ENV_HDX_SITE: &str = "HDX_SITE";

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectConfig {
    /// Levels processed when none are given on the command line
    pub levels: Vec<AdminLevel>,

    /// ISO3 codes that are never processed
    #[serde(default)]
    pub do_not_process: Vec<String>,

    /// HXL country list: local path or http(s) URL
    pub countries: String,

    #[serde(rename = "UN_boundaries")]
    pub un_boundaries: UnBoundariesConfig,

    /// ISO3 -> boundary dataset name, overriding `cod-em-<iso3>`
    #[serde(default)]
    pub dataset_exceptions: HashMap<String, String>,

    /// ISO3 -> resource name pattern, overriding `adm`
    #[serde(default)]
    pub resource_exceptions: HashMap<String, String>,

    pub shapefile_attribute_mappings: AttributeMappings,

    #[serde(default)]
    pub catalog: CatalogTuning,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UnBoundariesConfig {
    /// Dataset holding the reference boundaries and the published global layers
    pub dataset: String,

    /// Resource name -> layer key
    pub resources: BTreeMap<String, LayerKey>,
}

impl UnBoundariesConfig {
    /// Resource name that holds a given layer
    pub fn resource_name(&self, key: LayerKey) -> Option<&str> {
        self.resources
            .iter()
            .find(|(_, k)| **k == key)
            .map(|(name, _)| name.as_str())
    }
}

/// Candidate attribute names, `#` standing for the level depth
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AttributeMappings {
    pub pcode: Vec<String>,
    pub name: Vec<String>,
}

impl AttributeMappings {
    /// Upper-case pcode candidates for a depth, in priority order
    pub fn pcode_candidates(&self, depth: u8) -> Vec<String> {
        expand_patterns(&self.pcode, depth)
    }

    /// Upper-case name candidates for a depth, in priority order
    pub fn name_candidates(&self, depth: u8) -> Vec<String> {
        expand_patterns(&self.name, depth)
    }
}

fn expand_patterns(patterns: &[String], depth: u8) -> Vec<String> {
    patterns
        .iter()
        .map(|p| p.replace('#', &depth.to_string()).to_uppercase())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogTuning {
    /// Minimum delay between two catalog calls
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_rate_limit_ms() -> u64 {
    100
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for CatalogTuning {
    fn default() -> Self {
        Self {
            rate_limit_ms: default_rate_limit_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProjectConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ProjectConfig =
            toml::from_str(content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Check that levels are subnational and that every level has both output resources.
    pub fn validate_levels(&self, levels: &[AdminLevel]) -> Result<()> {
        if levels.is_empty() {
            anyhow::bail!("No admin levels to process");
        }
        for level in levels {
            if !level.is_subnational() {
                anyhow::bail!("{} is not a subnational level", level);
            }
            for key in [LayerKey::polygon(*level), LayerKey::point(*level)] {
                if self.un_boundaries.resource_name(key).is_none() {
                    anyhow::bail!("No resource configured for layer {}", key);
                }
            }
        }
        Ok(())
    }

    /// Boundary dataset name for a country, before the `cod-ab` fallback
    pub fn dataset_name(&self, iso3: &str) -> String {
        self.dataset_exceptions
            .get(iso3)
            .cloned()
            .unwrap_or_else(|| format!("cod-em-{}", iso3.to_ascii_lowercase()))
    }

    /// Resource name pattern for a country
    pub fn resource_pattern(&self, iso3: &str) -> &str {
        self.resource_exceptions
            .get(iso3)
            .map(String::as_str)
            .unwrap_or("adm")
    }
}

/// Catalog deployment to talk to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSite {
    Prod,
    Stage,
    Feature,
    Demo,
    Dev,
    Custom(Url),
}

impl CatalogSite {
    pub fn parse(site: &str) -> Result<Self> {
        let site = site.trim();
        Ok(match site.to_ascii_lowercase().as_str() {
            "prod" => CatalogSite::Prod,
            "stage" => CatalogSite::Stage,
            "feature" => CatalogSite::Feature,
            "demo" => CatalogSite::Demo,
            "dev" => CatalogSite::Dev,
            s if s.starts_with("http://") || s.starts_with("https://") => {
                CatalogSite::Custom(Url::parse(site).context("Invalid catalog site URL")?)
            }
            _ => anyhow::bail!("Unknown catalog site '{}'", site),
        })
    }

    pub fn base_url(&self) -> Result<Url> {
        let url = match self {
            CatalogSite::Prod => "https://data.humdata.org",
            CatalogSite::Stage => "https://stage.data-humdata-org.ahconu.org",
            CatalogSite::Feature => "https://feature.data-humdata-org.ahconu.org",
            CatalogSite::Demo => "https://demo.data-humdata-org.ahconu.org",
            CatalogSite::Dev => "https://dev.data-humdata-org.ahconu.org",
            CatalogSite::Custom(url) => return Ok(url.clone()),
        };
        Ok(Url::parse(url)?)
    }
}

/// Contents of the user credentials file. Every field may be overridden by the environment.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CredentialsFile {
    pub user_agent: Option<String>,
    pub hdx_key: Option<String>,
    pub hdx_site: Option<String>,
}

impl CredentialsFile {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read credentials file")?;
        toml::from_str(&content).context("Failed to parse credentials file")
    }
}

/// Resolved catalog credentials
#[derive(Clone)]
pub struct Credentials {
    pub user_agent: String,
    pub api_key: String,
    pub site: CatalogSite,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_agent", &self.user_agent)
            .field("api_key", &"<redacted>")
            .field("site", &self.site)
            .finish()
    }
}

impl Credentials {
    /// Load from the credentials file (home directory unless `path` is given) and the environment.
    ///
    /// A missing default file is fine when the environment carries everything.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => CredentialsFile::load_from_file(p)?,
            None => match default_credentials_path() {
                Some(p) if p.exists() => CredentialsFile::load_from_file(&p)?,
                other => {
                    debug!(?other, "credentials file not found, using environment only");
                    CredentialsFile::default()
                }
            },
        };
        Self::resolve(file, |name| std::env::var(name).ok())
    }

    /// Merge file values with environment lookups; the environment wins.
    pub fn resolve<F>(file: CredentialsFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |var: &str, fallback: Option<String>| {
            env(var)
                .filter(|v| !v.trim().is_empty())
                .or(fallback)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let user_agent = pick(ENV_USER_AGENT, file.user_agent)
            .with_context(|| format!("No user agent configured. Set {}", ENV_USER_AGENT))?;
        let api_key = pick(ENV_HDX_KEY, file.hdx_key)
            .with_context(|| format!("No catalog API key configured. Set {}", ENV_HDX_KEY))?;
        let site = match pick(ENV_HDX_SITE, file.hdx_site) {
            Some(s) => CatalogSite::parse(&s)?,
            None => CatalogSite::Stage,
        };

        Ok(Self {
            user_agent,
            api_key,
            site,
        })
    }
}

/// `~/.hdx_configuration.toml`
pub fn default_credentials_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CREDENTIALS_FILE_NAME))
}

/// Project configuration shared by unit tests across the crate
#[cfg(test)]
pub(crate) const SAMPLE_CONFIG: &str = r#"
levels = ["adm1", "adm2"]
do_not_process = ["ATA"]
countries = "config/countries.csv"

[UN_boundaries]
dataset = "unmap-international-boundaries-geojson"

[UN_boundaries.resources]
"wrl_polbnda_int_1m_uncs.geojson" = "adm0_polygon"
"wrl_lakes_uncs.geojson" = "water"
"polbnda_adm1_1m_ocha.geojson" = "adm1_polygon"
"polbndp_adm1_1m_ocha.geojson" = "adm1_point"
"polbnda_adm2_1m_ocha.geojson" = "adm2_polygon"
"polbndp_adm2_1m_ocha.geojson" = "adm2_point"

[dataset_exceptions]
COL = "cod-ab-colombia"

[resource_exceptions]
NGA = "boundaries"

[shapefile_attribute_mappings]
pcode = ["ADM#_PCODE", "ADM#_CODE", "PCODE_#"]
name = ["ADM#_EN", "ADM#_NAME", "NAME_#"]
"#;
