//! Point → jurisdiction attribution against a fixed set of boundaries.

use crate::core::geometry::{self, BoundaryGeometry, BoundaryKind, DatasetFeature};
use crate::core::jurisdiction::resolve_code;
use crate::domain::model::Jurisdiction;
use crate::utils::error::{GeometryError, LoadError};
use geo::{BoundingRect, Contains, Coord, CoordsIter, EuclideanDistance, Point, Rect};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Distance in degrees under which a point counts as inside a line boundary's
/// waters. Roughly 12 nautical miles at Baltic latitudes.
pub const PROXIMITY_THRESHOLD_DEG: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct JurisdictionBoundary {
    /// Position of the feature in the source dataset.
    pub index: usize,
    pub code: Option<String>,
    pub geometry: BoundaryGeometry,
    envelope: Result<Rect<f64>, GeometryError>,
}

impl JurisdictionBoundary {
    pub fn new(index: usize, code: Option<String>, geometry: BoundaryGeometry) -> Self {
        let envelope = envelope(index, &geometry);
        Self {
            index,
            code,
            geometry,
            envelope,
        }
    }

    pub fn kind(&self) -> BoundaryKind {
        self.geometry.kind()
    }

    pub fn jurisdiction(&self) -> Jurisdiction {
        match &self.code {
            Some(code) => Jurisdiction::Code(code.clone()),
            None => Jurisdiction::Unresolved,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.envelope.is_err()
    }

    /// Containment for areas, proximity for lines. The envelope check only
    /// rejects points the exact test would reject as well.
    pub fn matches(&self, point: Point<f64>) -> Result<bool, GeometryError> {
        let envelope = self.envelope.as_ref().map_err(|e| e.clone())?;
        let (min, max) = (envelope.min(), envelope.max());
        if point.x() < min.x || point.x() > max.x || point.y() < min.y || point.y() > max.y {
            return Ok(false);
        }
        Ok(self.exact_match(point))
    }

    fn exact_match(&self, point: Point<f64>) -> bool {
        match &self.geometry {
            BoundaryGeometry::Area(area) => area.contains(&point),
            BoundaryGeometry::Line(lines) => lines
                .0
                .iter()
                .any(|line| point.euclidean_distance(line) < PROXIMITY_THRESHOLD_DEG),
        }
    }
}

fn envelope(index: usize, geometry: &BoundaryGeometry) -> Result<Rect<f64>, GeometryError> {
    let (finite, rect) = match geometry {
        BoundaryGeometry::Area(area) => (
            area.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()),
            area.bounding_rect(),
        ),
        BoundaryGeometry::Line(lines) => (
            lines.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()),
            lines.bounding_rect().map(|r| {
                let pad = PROXIMITY_THRESHOLD_DEG;
                Rect::new(
                    Coord { x: r.min().x - pad, y: r.min().y - pad },
                    Coord { x: r.max().x + pad, y: r.max().y + pad },
                )
            }),
        ),
    };

    if !finite {
        return Err(GeometryError::NonFinite { index });
    }
    rect.ok_or(GeometryError::Empty { index })
}

/// Counts reported after a dataset is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundarySummary {
    pub areas: usize,
    pub lines: usize,
    pub unresolved: usize,
    pub degenerate: usize,
}

/// Immutable boundary set, queried in dataset order with first match winning.
#[derive(Debug, Clone, Default)]
pub struct BoundaryClassifier {
    boundaries: Vec<JurisdictionBoundary>,
    source: Option<PathBuf>,
}

impl BoundaryClassifier {
    /// Loads the first dataset among `candidates` found in `dir`.
    pub fn load<S: AsRef<str>>(dir: &Path, candidates: &[S]) -> Result<Self, LoadError> {
        let path = geometry::locate_dataset(dir, candidates)?;
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let features = geometry::read_dataset(path)?;
        let mut classifier = Self::from_features(features);
        classifier.source = Some(path.to_path_buf());

        let summary = classifier.summary();
        tracing::info!(
            "🗺️ Loaded {} boundaries from {} ({} areas, {} lines, {} unresolved)",
            classifier.len(),
            path.display(),
            summary.areas,
            summary.lines,
            summary.unresolved
        );
        if summary.degenerate > 0 {
            tracing::warn!(
                "{} degenerate boundaries will never match",
                summary.degenerate
            );
        }
        Ok(classifier)
    }

    pub fn from_features(features: Vec<DatasetFeature>) -> Self {
        let boundaries = features
            .into_iter()
            .map(|feature| {
                let code = resolve_code(&feature.properties);
                if code.is_none() {
                    tracing::debug!("feature #{} has no resolvable jurisdiction", feature.index);
                }
                JurisdictionBoundary::new(feature.index, code, feature.geometry)
            })
            .collect();
        Self::from_boundaries(boundaries)
    }

    pub fn from_boundaries(boundaries: Vec<JurisdictionBoundary>) -> Self {
        Self {
            boundaries,
            source: None,
        }
    }

    /// Jurisdiction of the first boundary matching the point, or `None`.
    pub fn classify(&self, lon: f64, lat: f64) -> Option<Jurisdiction> {
        if !lon.is_finite() || !lat.is_finite() {
            tracing::debug!("{}", GeometryError::InvalidPoint { lon, lat });
            return None;
        }

        let point = Point::new(lon, lat);
        for boundary in &self.boundaries {
            match boundary.matches(point) {
                Ok(true) => return Some(boundary.jurisdiction()),
                Ok(false) => {}
                Err(e) => tracing::trace!("skipping boundary: {}", e),
            }
        }
        None
    }

    pub fn boundaries(&self) -> &[JurisdictionBoundary] {
        &self.boundaries
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    pub fn summary(&self) -> BoundarySummary {
        self.boundaries
            .iter()
            .fold(BoundarySummary::default(), |mut summary, boundary| {
                match boundary.kind() {
                    BoundaryKind::Area => summary.areas += 1,
                    BoundaryKind::Line => summary.lines += 1,
                }
                if boundary.code.is_none() {
                    summary.unresolved += 1;
                }
                if boundary.is_degenerate() {
                    summary.degenerate += 1;
                }
                summary
            })
    }
}

/// Loads the boundary set on first use. A failed load is logged once and
/// every later query answers "no match".
#[derive(Debug)]
pub struct LazyClassifier {
    directory: PathBuf,
    candidates: Vec<String>,
    cell: OnceLock<Option<BoundaryClassifier>>,
}

impl LazyClassifier {
    pub fn new(directory: impl Into<PathBuf>, candidates: Vec<String>) -> Self {
        Self {
            directory: directory.into(),
            candidates,
            cell: OnceLock::new(),
        }
    }

    pub fn preloaded(classifier: BoundaryClassifier) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Some(classifier));
        Self {
            directory: PathBuf::new(),
            candidates: Vec::new(),
            cell,
        }
    }

    pub fn get(&self) -> Option<&BoundaryClassifier> {
        self.cell
            .get_or_init(|| {
                match BoundaryClassifier::load(&self.directory, &self.candidates) {
                    Ok(classifier) => Some(classifier),
                    Err(e) => {
                        tracing::warn!(
                            "⚠️ Territorial lookup disabled, positions stay unattributed: {}",
                            e
                        );
                        None
                    }
                }
            })
            .as_ref()
    }

    pub fn classify(&self, lon: f64, lat: f64) -> Option<Jurisdiction> {
        self.get().and_then(|classifier| classifier.classify(lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, MultiLineString, MultiPolygon, Polygon};
    use tempfile::TempDir;

    fn square(min_x: f64, min_y: f64, size: f64) -> BoundaryGeometry {
        BoundaryGeometry::Area(MultiPolygon(vec![Polygon::new(
            LineString::from(vec![
                (min_x, min_y),
                (min_x + size, min_y),
                (min_x + size, min_y + size),
                (min_x, min_y + size),
                (min_x, min_y),
            ]),
            vec![],
        )]))
    }

    fn line(points: Vec<(f64, f64)>) -> BoundaryGeometry {
        BoundaryGeometry::Line(MultiLineString(vec![LineString::from(points)]))
    }

    fn code(c: &str) -> Jurisdiction {
        Jurisdiction::Code(c.to_string())
    }

    fn classifier(entries: Vec<(Option<&str>, BoundaryGeometry)>) -> BoundaryClassifier {
        BoundaryClassifier::from_boundaries(
            entries
                .into_iter()
                .enumerate()
                .map(|(i, (c, g))| JurisdictionBoundary::new(i, c.map(str::to_string), g))
                .collect(),
        )
    }

    #[test]
    fn test_point_inside_polygon_gets_its_code() {
        let c = classifier(vec![(Some("FI"), square(20.0, 60.0, 2.0))]);
        assert_eq!(c.classify(21.0, 61.0), Some(code("FI")));
        assert_eq!(c.classify(19.0, 61.0), None);
    }

    #[test]
    fn test_first_match_wins_for_overlapping_areas() {
        let c = classifier(vec![
            (Some("A"), square(0.0, 0.0, 10.0)),
            (Some("B"), square(5.0, 5.0, 10.0)),
        ]);
        assert_eq!(c.classify(7.0, 7.0), Some(code("A")));
        assert_eq!(c.classify(12.0, 12.0), Some(code("B")));

        let reversed = classifier(vec![
            (Some("B"), square(5.0, 5.0, 10.0)),
            (Some("A"), square(0.0, 0.0, 10.0)),
        ]);
        assert_eq!(reversed.classify(7.0, 7.0), Some(code("B")));
    }

    #[test]
    fn test_line_boundary_uses_proximity_threshold() {
        let c = classifier(vec![(Some("EE"), line(vec![(24.0, 59.0), (26.0, 59.0)]))]);
        assert_eq!(c.classify(25.0, 59.1), Some(code("EE")));
        assert_eq!(c.classify(25.0, 58.85), Some(code("EE")));
        assert_eq!(c.classify(25.0, 59.3), None);
        // Beyond the segment end, distance is measured to the end point.
        assert_eq!(c.classify(26.15, 59.0), Some(code("EE")));
        assert_eq!(c.classify(26.25, 59.0), None);
    }

    #[test]
    fn test_unresolved_boundary_still_matches() {
        let c = classifier(vec![
            (None, square(0.0, 0.0, 1.0)),
            (Some("SE"), square(0.0, 0.0, 5.0)),
        ]);
        assert_eq!(c.classify(0.5, 0.5), Some(Jurisdiction::Unresolved));
        assert_eq!(c.classify(3.0, 3.0), Some(code("SE")));
        assert_eq!(c.summary().unresolved, 1);
    }

    #[test]
    fn test_degenerate_boundaries_are_skipped() {
        let empty = BoundaryGeometry::Area(MultiPolygon(vec![]));
        let nan = line(vec![(f64::NAN, 0.0), (1.0, 1.0)]);
        let c = classifier(vec![
            (Some("X"), empty),
            (Some("Y"), nan),
            (Some("LV"), square(0.0, 0.0, 2.0)),
        ]);

        assert_eq!(c.classify(1.0, 1.0), Some(code("LV")));
        assert_eq!(c.summary().degenerate, 2);
        assert!(c.boundaries()[0].matches(Point::new(1.0, 1.0)).is_err());
    }

    #[test]
    fn test_non_finite_point_is_unmatched() {
        let c = classifier(vec![(Some("FI"), square(0.0, 0.0, 2.0))]);
        assert_eq!(c.classify(f64::NAN, 1.0), None);
        assert_eq!(c.classify(1.0, f64::INFINITY), None);
    }

    #[test]
    fn test_envelope_rejection_agrees_with_exact_test() {
        let c = classifier(vec![
            (Some("A"), square(1.0, 1.0, 3.0)),
            (Some("B"), line(vec![(0.0, 6.0), (3.0, 8.0), (6.0, 6.0)])),
        ]);

        for xi in -10..=80 {
            for yi in -10..=100 {
                let point = Point::new(xi as f64 / 10.0, yi as f64 / 10.0);
                for boundary in c.boundaries() {
                    assert_eq!(
                        boundary.matches(point).unwrap(),
                        boundary.exact_match(point),
                        "mismatch at {:?}",
                        point
                    );
                }
            }
        }
    }

    #[test]
    fn test_load_resolves_codes_from_dataset() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("baltic_maritime_boundaries.geojson"),
            r#"{"type": "FeatureCollection", "features": [
                {"properties": {"TERRITORY1": "Finland"},
                 "geometry": {"type": "Polygon", "coordinates": [[[20,60],[22,60],[22,62],[20,62],[20,60]]]}},
                {"properties": {"Country": "Estonia"},
                 "geometry": {"type": "LineString", "coordinates": [[23,59],[28,59.5]]}}
            ]}"#,
        )
        .unwrap();

        let c = BoundaryClassifier::load(dir.path(), &geometry::DEFAULT_DATASET_CANDIDATES).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c.classify(21.0, 61.0), Some(code("FI")));
        assert_eq!(c.classify(25.0, 59.3), Some(code("EE")));
        assert_eq!(c.source(), Some(dir.path().join("baltic_maritime_boundaries.geojson").as_path()));
    }

    #[test]
    fn test_lazy_classifier_degrades_to_no_match() {
        let dir = TempDir::new().unwrap();
        let lazy = LazyClassifier::new(dir.path(), vec!["missing.geojson".to_string()]);

        assert_eq!(lazy.classify(21.0, 61.0), None);
        assert!(lazy.get().is_none());

        // A file appearing later is not picked up; the failure is sticky.
        std::fs::write(
            dir.path().join("missing.geojson"),
            r#"{"features": [{"properties": {"iso_ter1": "FIN"},
                "geometry": {"type": "Polygon", "coordinates": [[[20,60],[22,60],[22,62],[20,62],[20,60]]]}}]}"#,
        )
        .unwrap();
        assert_eq!(lazy.classify(21.0, 61.0), None);
    }

    #[test]
    fn test_lazy_classifier_loads_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("territorial_waters_baltic.geojson");
        std::fs::write(
            &path,
            r#"{"features": [{"properties": {"iso_ter1": "FIN"},
                "geometry": {"type": "Polygon", "coordinates": [[[20,60],[22,60],[22,62],[20,62],[20,60]]]}}]}"#,
        )
        .unwrap();

        let lazy = LazyClassifier::new(
            dir.path(),
            geometry::DEFAULT_DATASET_CANDIDATES.iter().map(|s| s.to_string()).collect(),
        );
        assert_eq!(lazy.classify(21.0, 61.0), Some(code("FI")));

        std::fs::remove_file(&path).unwrap();
        assert_eq!(lazy.classify(21.0, 61.0), Some(code("FI")));
    }
}
