//! Boundary dataset loading: GeoJSON feature collections into `geo` shapes.

use crate::utils::error::{GeometryError, LoadError};
use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATASET_CANDIDATES: [&str; 3] = [
    "territorial_waters_baltic_formatted.geojson",
    "territorial_waters_baltic.geojson",
    "baltic_maritime_boundaries.geojson",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// Enclosed waters, tested by containment.
    Area,
    /// Open-sea boundary line, tested by proximity.
    Line,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryGeometry {
    Area(MultiPolygon<f64>),
    Line(MultiLineString<f64>),
}

impl BoundaryGeometry {
    pub fn kind(&self) -> BoundaryKind {
        match self {
            Self::Area(_) => BoundaryKind::Area,
            Self::Line(_) => BoundaryKind::Line,
        }
    }
}

/// One usable entry of the dataset, in file order.
#[derive(Debug, Clone)]
pub struct DatasetFeature {
    /// Position of the feature in the source file.
    pub index: usize,
    pub geometry: BoundaryGeometry,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

/// Returns the first candidate that exists under `dir`.
pub fn locate_dataset<S: AsRef<str>>(dir: &Path, candidates: &[S]) -> Result<PathBuf, LoadError> {
    candidates
        .iter()
        .map(|name| dir.join(name.as_ref()))
        .find(|path| path.is_file())
        .ok_or_else(|| LoadError::NotFound {
            tried: candidates
                .iter()
                .map(|name| dir.join(name.as_ref()).display().to_string())
                .collect(),
        })
}

pub fn read_dataset(path: &Path) -> Result<Vec<DatasetFeature>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_dataset(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a feature collection. Entries without a supported geometry are
/// skipped; only a document that is not a collection at all is an error.
pub fn parse_dataset(content: &str) -> Result<Vec<DatasetFeature>, serde_json::Error> {
    let collection: RawCollection = serde_json::from_str(content)?;
    let mut features = Vec::with_capacity(collection.features.len());

    for (index, raw) in collection.features.into_iter().enumerate() {
        let Some(geometry) = raw.geometry else {
            tracing::debug!("feature #{} has no geometry, skipping", index);
            continue;
        };

        match convert_geometry(&geometry) {
            Ok(Some(converted)) => features.push(DatasetFeature {
                index,
                geometry: converted,
                properties: raw.properties.unwrap_or_default(),
            }),
            Ok(None) => {
                tracing::debug!(
                    "feature #{} has unsupported geometry type {}, skipping",
                    index,
                    geometry.kind
                );
            }
            Err(e) => {
                tracing::warn!("feature #{} skipped: {}", index, e);
            }
        }
    }

    Ok(features)
}

fn convert_geometry(raw: &RawGeometry) -> Result<Option<BoundaryGeometry>, GeometryError> {
    let geometry = match raw.kind.as_str() {
        "Polygon" => BoundaryGeometry::Area(MultiPolygon(vec![polygon(&raw.coordinates)?])),
        "MultiPolygon" => BoundaryGeometry::Area(MultiPolygon(
            array(&raw.coordinates, "MultiPolygon")?
                .iter()
                .map(polygon)
                .collect::<Result<Vec<_>, GeometryError>>()?,
        )),
        "LineString" => {
            BoundaryGeometry::Line(MultiLineString(vec![line_string(&raw.coordinates)?]))
        }
        "MultiLineString" => BoundaryGeometry::Line(MultiLineString(
            array(&raw.coordinates, "MultiLineString")?
                .iter()
                .map(line_string)
                .collect::<Result<Vec<_>, GeometryError>>()?,
        )),
        _ => return Ok(None),
    };
    Ok(Some(geometry))
}

fn array<'a>(value: &'a Value, kind: &str) -> Result<&'a Vec<Value>, GeometryError> {
    value.as_array().ok_or_else(|| GeometryError::Coordinates {
        kind: kind.to_string(),
        reason: "expected an array".to_string(),
    })
}

fn coord(value: &Value) -> Result<Coord<f64>, GeometryError> {
    let position = array(value, "Position")?;
    let axis = |i: usize| position.get(i).and_then(Value::as_f64);
    match (axis(0), axis(1)) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err(GeometryError::Coordinates {
            kind: "Position".to_string(),
            reason: format!("expected [lon, lat], got {}", value),
        }),
    }
}

fn line_string(value: &Value) -> Result<LineString<f64>, GeometryError> {
    let coords = array(value, "LineString")?
        .iter()
        .map(coord)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LineString::new(coords))
}

fn polygon(value: &Value) -> Result<Polygon<f64>, GeometryError> {
    let mut rings = array(value, "Polygon")?
        .iter()
        .map(line_string)
        .collect::<Result<Vec<_>, _>>()?
        .into_iter();
    let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
    Ok(Polygon::new(exterior, rings.collect()))
}
