//! Administrative level and layer key types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// COD admin level, from the national boundary (adm0) down to adm4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AdminLevel {
    /// National boundary
    Adm0,
    /// First-order subdivision (state / province / region)
    Adm1,
    /// Second-order subdivision (district)
    Adm2,
    /// Third-order subdivision
    Adm3,
    /// Fourth-order subdivision
    Adm4,
}

impl AdminLevel {
    /// Convert a numeric depth to an AdminLevel
    pub fn from_depth(depth: u8) -> Option<Self> {
        match depth {
            0 => Some(AdminLevel::Adm0),
            1 => Some(AdminLevel::Adm1),
            2 => Some(AdminLevel::Adm2),
            3 => Some(AdminLevel::Adm3),
            4 => Some(AdminLevel::Adm4),
            _ => None,
        }
    }

    /// Numeric depth of the level (adm2 -> 2)
    pub fn depth(&self) -> u8 {
        match self {
            AdminLevel::Adm0 => 0,
            AdminLevel::Adm1 => 1,
            AdminLevel::Adm2 => 2,
            AdminLevel::Adm3 => 3,
            AdminLevel::Adm4 => 4,
        }
    }

    pub fn is_subnational(&self) -> bool {
        *self != AdminLevel::Adm0
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminLevel::Adm0 => "adm0",
            AdminLevel::Adm1 => "adm1",
            AdminLevel::Adm2 => "adm2",
            AdminLevel::Adm3 => "adm3",
            AdminLevel::Adm4 => "adm4",
        }
    }

    /// Name of the pcode attribute at this level, e.g. `ADM2_PCODE`
    pub fn pcode_field(&self) -> String {
        format!("ADM{}_PCODE", self.depth())
    }

    /// Name of the reference name attribute at this level, e.g. `ADM2_REF`
    pub fn ref_field(&self) -> String {
        format!("ADM{}_REF", self.depth())
    }

    /// Attributes every processed feature at this level carries, in output order.
    pub fn required_fields(&self) -> Vec<String> {
        let mut fields = vec![ALPHA_3_FIELD.to_string(), ADM0_REF_FIELD.to_string()];
        for depth in 1..=self.depth() {
            if let Some(level) = AdminLevel::from_depth(depth) {
                fields.push(level.pcode_field());
                fields.push(level.ref_field());
            }
        }
        fields
    }
}

/// Country code attribute on subnational features
pub const ALPHA_3_FIELD: &str = "alpha_3";
/// Country name attribute on subnational features
pub const ADM0_REF_FIELD: &str = "ADM0_REF";

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        lower
            .strip_prefix("adm")
            .and_then(|d| d.parse::<u8>().ok())
            .and_then(AdminLevel::from_depth)
            .ok_or_else(|| anyhow::anyhow!("Unknown admin level '{}'", s))
    }
}

/// Geometry representation of a global layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeometryKind {
    Polygon,
    Point,
}

impl GeometryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Polygon => "polygon",
            GeometryKind::Point => "point",
        }
    }
}

/// Key of a global layer held in the boundary store.
///
/// Serialized as `water` or `{level}_{kind}` (e.g. `adm1_point`), the form used
/// in the project configuration's resource mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKey {
    Water,
    Boundary { level: AdminLevel, kind: GeometryKind },
}

impl LayerKey {
    pub fn polygon(level: AdminLevel) -> Self {
        LayerKey::Boundary {
            level,
            kind: GeometryKind::Polygon,
        }
    }

    pub fn point(level: AdminLevel) -> Self {
        LayerKey::Boundary {
            level,
            kind: GeometryKind::Point,
        }
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKey::Water => f.write_str("water"),
            LayerKey::Boundary { level, kind } => write!(f, "{}_{}", level, kind.as_str()),
        }
    }
}

impl FromStr for LayerKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "water" {
            return Ok(LayerKey::Water);
        }
        let (level, kind) = s
            .split_once('_')
            .ok_or_else(|| anyhow::anyhow!("Unknown layer key '{}'", s))?;
        let kind = match kind {
            "polygon" => GeometryKind::Polygon,
            "point" => GeometryKind::Point,
            _ => anyhow::bail!("Unknown geometry kind in layer key '{}'", s),
        };
        Ok(LayerKey::Boundary {
            level: level.parse()?,
            kind,
        })
    }
}

impl<'de> Deserialize<'de> for LayerKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
