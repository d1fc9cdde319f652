use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maritime Mobile Service Identity, the stable vessel identifier.
pub type Mmsi = u32;

/// Outcome of matching a point against a boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Jurisdiction {
    /// Two-letter jurisdiction code, e.g. `FI`.
    Code(String),
    /// The point matched a boundary whose owner could not be resolved.
    Unresolved,
}

impl Jurisdiction {
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Code(code) => Some(code),
            Self::Unresolved => None,
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => f.write_str(code),
            Self::Unresolved => f.write_str("unknown"),
        }
    }
}

/// Axis-aligned lon/lat region, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub const BALTIC: BoundingBox = BoundingBox {
        min_lon: 17.0,
        max_lon: 30.3,
        min_lat: 58.5,
        max_lat: 66.0,
    };

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::BALTIC
    }
}

/// One observed vessel state as stored in the `vessel_positions` table.
/// Every column is serialized, `null` included, so bulk inserts share one key set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    pub mmsi: Mmsi,
    pub longitude: f64,
    pub latitude: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sog: Option<f64>,
    #[serde(default)]
    pub cog: Option<f64>,
    #[serde(default)]
    pub heading: Option<u16>,
    #[serde(default)]
    pub nav_status: Option<u8>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ship_type: Option<u8>,
    /// Resolved jurisdiction code, `None` when unmatched or unresolved.
    pub territorial_country: Option<String>,
    /// True whenever some boundary matched, even an unresolved one.
    pub in_territorial_waters: bool,
}

impl PositionReport {
    pub fn attribute(&mut self, jurisdiction: Option<&Jurisdiction>) {
        self.in_territorial_waters = jurisdiction.is_some();
        self.territorial_country = jurisdiction.and_then(|j| j.code()).map(str::to_string);
    }
}

/// Projection used by the retention pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionRow {
    pub mmsi: Mmsi,
    pub longitude: f64,
    pub latitude: f64,
}

/// Row count plus the oldest/newest timestamps in the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreStats {
    pub total_rows: u64,
    pub unique_vessels: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}
