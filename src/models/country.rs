//! Country reference data.

use serde::{Deserialize, Serialize};

/// A country or territory that may carry subnational boundaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// ISO 3166-1 alpha-3 code, upper case
    pub iso3: String,

    /// Preferred English name, written to `ADM0_REF`
    pub name: String,
}

impl Country {
    pub fn new(iso3: &str, name: &str) -> Self {
        Self {
            iso3: iso3.trim().to_ascii_uppercase(),
            name: name.trim().to_string(),
        }
    }

    /// Lower-case code used in catalog dataset names (`cod-ab-afg`)
    pub fn iso3_lower(&self) -> String {
        self.iso3.to_ascii_lowercase()
    }
}
