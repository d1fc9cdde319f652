//! One collection run: fetch the live feed, keep the region, attribute each
//! position, persist it and write display snapshots.

use crate::adapters::digitraffic::{AisFeedClient, LocationFeed};
use crate::core::territory::LazyClassifier;
use crate::domain::model::{BoundingBox, PositionReport};
use crate::domain::ports::{Pipeline, PositionStore, Storage};
use crate::utils::error::{AisError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

pub const LATEST_SNAPSHOT: &str = "latest.json";

#[derive(Debug)]
pub struct CollectedFeed {
    pub collected_at: DateTime<Utc>,
    pub feed: LocationFeed,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub collected_at: DateTime<Utc>,
    pub bbox: BoundingBox,
    pub reports: Vec<PositionReport>,
}

#[derive(Serialize)]
struct SnapshotFile<'a> {
    timestamp: DateTime<Utc>,
    vessel_count: usize,
    bbox: &'a BoundingBox,
    vessels: &'a [PositionReport],
}

impl Snapshot {
    /// `<YYYY-MM-DD>/<HH-MM>.json`
    pub fn file_name(&self) -> String {
        format!(
            "{}/{}.json",
            self.day_dir(),
            self.collected_at.format("%H-%M")
        )
    }

    pub fn summary_file_name(&self) -> String {
        format!("{}/summary.csv", self.day_dir())
    }

    fn day_dir(&self) -> String {
        self.collected_at.format("%Y-%m-%d").to_string()
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        let file = SnapshotFile {
            timestamp: self.collected_at,
            vessel_count: self.reports.len(),
            bbox: &self.bbox,
            vessels: &self.reports,
        };
        Ok(serde_json::to_vec_pretty(&file)?)
    }
}

pub struct CollectorPipeline<S: Storage> {
    feed: AisFeedClient,
    classifier: LazyClassifier,
    region: BoundingBox,
    store: Option<Box<dyn PositionStore>>,
    export: Option<S>,
}

impl<S: Storage> CollectorPipeline<S> {
    pub fn new(feed: AisFeedClient, classifier: LazyClassifier, region: BoundingBox) -> Self {
        Self {
            feed,
            classifier,
            region,
            store: None,
            export: None,
        }
    }

    pub fn with_store(mut self, store: Box<dyn PositionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_export(mut self, storage: S) -> Self {
        self.export = Some(storage);
        self
    }

    async fn append_summary(&self, storage: &S, snapshot: &Snapshot) -> Result<()> {
        let path = snapshot.summary_file_name();
        let mut content = if storage.exists(&path).await {
            storage.read_file(&path).await?
        } else {
            Vec::new()
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        if content.is_empty() {
            writer.write_record(["timestamp", "vessel_count"])?;
        }
        writer.write_record([
            snapshot.collected_at.to_rfc3339(),
            snapshot.reports.len().to_string(),
        ])?;
        let row = writer
            .into_inner()
            .map_err(|e| AisError::IoError(e.into_error()))?;

        content.extend_from_slice(&row);
        storage.write_file(&path, &content).await
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for CollectorPipeline<S> {
    type Raw = CollectedFeed;
    type Transformed = Snapshot;

    async fn extract(&self) -> Result<CollectedFeed> {
        let collected_at = Utc::now();
        tracing::info!("Fetching vessel locations from {}", self.feed.endpoint());
        let feed = self.feed.fetch_locations().await?;
        tracing::info!("Received {} vessel locations", feed.features.len());
        Ok(CollectedFeed { collected_at, feed })
    }

    async fn transform(&self, data: CollectedFeed) -> Result<Snapshot> {
        let mut reports = Vec::new();
        let mut skipped = 0usize;
        let mut per_jurisdiction: BTreeMap<String, usize> = BTreeMap::new();

        for feature in &data.feed.features {
            let Some(mut report) = feature.to_report(data.collected_at) else {
                skipped += 1;
                continue;
            };
            if !self.region.contains(report.longitude, report.latitude) {
                continue;
            }

            let jurisdiction = self.classifier.classify(report.longitude, report.latitude);
            report.attribute(jurisdiction.as_ref());
            if let Some(j) = &jurisdiction {
                *per_jurisdiction.entry(j.to_string()).or_default() += 1;
            }
            reports.push(report);
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} features without id or position", skipped);
        }
        tracing::info!(
            "Found {} vessels in region, by jurisdiction: {:?}",
            reports.len(),
            per_jurisdiction
        );

        Ok(Snapshot {
            collected_at: data.collected_at,
            bbox: self.region,
            reports,
        })
    }

    async fn load(&self, snapshot: Snapshot) -> Result<String> {
        if let Some(store) = &self.store {
            store.insert_positions(&snapshot.reports).await?;
            tracing::info!("Stored {} positions", snapshot.reports.len());
        }

        let Some(storage) = &self.export else {
            return Ok(format!("{} positions stored", snapshot.reports.len()));
        };

        let json = snapshot.to_json()?;
        let file_name = snapshot.file_name();
        storage.write_file(&file_name, &json).await?;
        storage.write_file(LATEST_SNAPSHOT, &json).await?;
        self.append_summary(storage, &snapshot).await?;

        tracing::info!("Saved {} vessels to {}", snapshot.reports.len(), file_name);
        Ok(file_name)
    }
}
