//! Full-history retention pass: which vessels crossed between jurisdictions.
//!
//! The pass reads every `(mmsi, lon, lat)` row from the store, attributes each
//! position, and keeps a vessel only when its whole history touches at least
//! two distinct jurisdiction codes. Everything else is planned for deletion.
//!
//! Deletion is a separate step gated by a [`Confirmation`]. Batches are applied
//! one after another without rollback: an interrupted run leaves some flagged
//! vessels already removed and others still present. Running the pass again
//! recovers, because each vessel's decision only depends on its own rows.

use crate::core::territory::BoundaryClassifier;
use crate::domain::model::{Mmsi, PositionRow};
use crate::domain::ports::PositionStore;
use crate::utils::error::{AisError, Result};
use std::collections::{BTreeMap, BTreeSet};

pub const PAGE_SIZE: usize = 1000;
pub const DELETE_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupingStrategy {
    /// Materialize the whole history, then group. Fine for small stores.
    Buffered,
    /// Single pass over pages sorted by vessel; per-vessel state only.
    #[default]
    Streaming,
}

/// Distinct jurisdiction codes seen so far, capped at "two or more".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VisitState {
    #[default]
    Nowhere,
    Within(String),
    Crossed,
}

impl VisitState {
    pub fn visit(&mut self, code: &str) {
        match self {
            Self::Nowhere => *self = Self::Within(code.to_string()),
            Self::Within(seen) if seen != code => *self = Self::Crossed,
            _ => {}
        }
    }

    pub fn merge(&mut self, other: VisitState) {
        match other {
            Self::Nowhere => {}
            Self::Within(code) => self.visit(&code),
            Self::Crossed => *self = Self::Crossed,
        }
    }

    pub fn crossed(&self) -> bool {
        matches!(self, Self::Crossed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct VesselTally {
    visits: VisitState,
    rows: u64,
}

impl VesselTally {
    fn record(&mut self, classifier: &BoundaryClassifier, row: &PositionRow) {
        self.rows += 1;
        // The outcome cannot change once two codes are known.
        if self.visits.crossed() {
            return;
        }
        if let Some(code) = classifier
            .classify(row.longitude, row.latitude)
            .as_ref()
            .and_then(|j| j.code())
        {
            self.visits.visit(code);
        }
    }

    fn merge(&mut self, other: VesselTally) {
        self.rows += other.rows;
        self.visits.merge(other.visits);
    }
}

/// Single-pass group-by over rows sorted by vessel. Rows arriving out of
/// order are merged into the vessel's earlier tally instead of being lost.
#[derive(Debug, Default)]
pub struct StreamingAggregator {
    finished: BTreeMap<Mmsi, VesselTally>,
    current: Option<(Mmsi, VesselTally)>,
    out_of_order: usize,
}

impl StreamingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, classifier: &BoundaryClassifier, row: &PositionRow) {
        if let Some((mmsi, tally)) = &mut self.current {
            if *mmsi == row.mmsi {
                tally.record(classifier, row);
                return;
            }
        }

        self.flush();
        let mut tally = match self.finished.remove(&row.mmsi) {
            Some(previous) => {
                self.out_of_order += 1;
                previous
            }
            None => VesselTally::default(),
        };
        tally.record(classifier, row);
        self.current = Some((row.mmsi, tally));
    }

    fn flush(&mut self) {
        if let Some((mmsi, tally)) = self.current.take() {
            self.finished.entry(mmsi).or_default().merge(tally);
        }
    }

    pub fn finish(mut self) -> VesselPartition {
        self.flush();
        if self.out_of_order > 0 {
            tracing::warn!(
                "⚠️ {} vessel runs arrived out of order; merged by vessel id",
                self.out_of_order
            );
        }
        VesselPartition::from_tallies(self.finished)
    }
}

/// Disjoint keep/delete sets covering every vessel that was read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VesselPartition {
    pub keep: BTreeSet<Mmsi>,
    pub delete: BTreeSet<Mmsi>,
    pub rows_kept: u64,
    pub rows_to_delete: u64,
}

impl VesselPartition {
    fn from_tallies(tallies: BTreeMap<Mmsi, VesselTally>) -> Self {
        let mut partition = Self::default();
        for (mmsi, tally) in tallies {
            if tally.visits.crossed() {
                partition.keep.insert(mmsi);
                partition.rows_kept += tally.rows;
            } else {
                partition.delete.insert(mmsi);
                partition.rows_to_delete += tally.rows;
            }
        }
        partition
    }

    pub fn total_vessels(&self) -> usize {
        self.keep.len() + self.delete.len()
    }

    pub fn total_rows(&self) -> u64 {
        self.rows_kept + self.rows_to_delete
    }

    /// Share of stored rows that belong to vessels planned for deletion.
    pub fn estimated_freed_percent(&self) -> f64 {
        match self.total_rows() {
            0 => 0.0,
            total => self.rows_to_delete as f64 / total as f64 * 100.0,
        }
    }
}

/// Reads the store page by page until a short page comes back.
#[derive(Debug)]
pub struct PositionPager<'a, S: PositionStore + ?Sized> {
    store: &'a S,
    page_size: usize,
    offset: usize,
    done: bool,
}

impl<'a, S: PositionStore + ?Sized> PositionPager<'a, S> {
    pub fn new(store: &'a S, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            offset: 0,
            done: false,
        }
    }

    /// Next non-empty page, or `None` once the history is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<PositionRow>>> {
        if self.done {
            return Ok(None);
        }

        let page = self
            .store
            .fetch_page(self.offset, self.page_size)
            .await
            .map_err(|e| AisError::read(self.offset, e))?;

        if page.len() < self.page_size {
            self.done = true;
        }
        self.offset += page.len();

        Ok(if page.is_empty() { None } else { Some(page) })
    }

    pub fn rows_read(&self) -> usize {
        self.offset
    }
}

/// Decides keep/delete per vessel from the full position history.
#[derive(Debug)]
pub struct RetentionClassifier<'a> {
    classifier: &'a BoundaryClassifier,
    strategy: GroupingStrategy,
    page_size: usize,
}

impl<'a> RetentionClassifier<'a> {
    pub fn new(classifier: &'a BoundaryClassifier) -> Self {
        Self {
            classifier,
            strategy: GroupingStrategy::default(),
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_strategy(mut self, strategy: GroupingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Pages through the whole store and partitions the vessels. A read
    /// failure aborts the analysis; a partial history must not be judged.
    pub async fn analyze<S: PositionStore + ?Sized>(&self, store: &S) -> Result<VesselPartition> {
        tracing::info!(
            "Fetching ALL positions from the store ({:?} grouping, page size {})",
            self.strategy,
            self.page_size
        );
        let mut pager = PositionPager::new(store, self.page_size);

        let partition = match self.strategy {
            GroupingStrategy::Buffered => {
                let mut rows = Vec::new();
                while let Some(page) = pager.next_page().await? {
                    rows.extend(page);
                    tracing::debug!("  Fetched {} positions so far...", rows.len());
                }
                self.partition_buffered(rows)
            }
            GroupingStrategy::Streaming => {
                let mut aggregator = StreamingAggregator::new();
                while let Some(page) = pager.next_page().await? {
                    for row in &page {
                        aggregator.push(self.classifier, row);
                    }
                    tracing::debug!("  Processed {} positions so far...", pager.rows_read());
                }
                aggregator.finish()
            }
        };

        tracing::info!(
            "Analysis complete: {} positions, {} vessels crossed boundaries, {} to delete",
            pager.rows_read(),
            partition.keep.len(),
            partition.delete.len()
        );
        Ok(partition)
    }

    /// Partitions rows already in memory using the configured strategy.
    pub fn partition_rows(&self, rows: Vec<PositionRow>) -> VesselPartition {
        match self.strategy {
            GroupingStrategy::Buffered => self.partition_buffered(rows),
            GroupingStrategy::Streaming => {
                let mut aggregator = StreamingAggregator::new();
                for row in &rows {
                    aggregator.push(self.classifier, row);
                }
                aggregator.finish()
            }
        }
    }

    fn partition_buffered(&self, rows: Vec<PositionRow>) -> VesselPartition {
        let mut vessels: BTreeMap<Mmsi, Vec<PositionRow>> = BTreeMap::new();
        for row in rows {
            vessels.entry(row.mmsi).or_default().push(row);
        }
        tracing::info!("Analyzing {} unique vessels...", vessels.len());

        let tallies = vessels
            .into_iter()
            .enumerate()
            .map(|(i, (mmsi, positions))| {
                if (i + 1) % 100 == 0 {
                    tracing::debug!("  Processed {} vessels...", i + 1);
                }
                let mut tally = VesselTally::default();
                for position in &positions {
                    tally.record(self.classifier, position);
                }
                (mmsi, tally)
            })
            .collect();
        VesselPartition::from_tallies(tallies)
    }
}

/// Side-effect-free description of what a confirmed deletion would do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionPlan {
    pub vessels: Vec<Mmsi>,
    pub batch_size: usize,
    pub vessels_kept: usize,
    pub estimated_rows: u64,
    pub total_rows: u64,
}

impl DeletionPlan {
    pub fn batches(&self) -> std::slice::Chunks<'_, Mmsi> {
        self.vessels.chunks(self.batch_size.max(1))
    }

    pub fn batch_count(&self) -> usize {
        self.vessels.len().div_ceil(self.batch_size.max(1))
    }

    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty()
    }

    pub fn estimated_freed_percent(&self) -> f64 {
        match self.total_rows {
            0 => 0.0,
            total => self.estimated_rows as f64 / total as f64 * 100.0,
        }
    }
}

pub fn plan_deletion(partition: &VesselPartition) -> DeletionPlan {
    DeletionPlan {
        vessels: partition.delete.iter().copied().collect(),
        batch_size: DELETE_BATCH_SIZE,
        vessels_kept: partition.keep.len(),
        estimated_rows: partition.rows_to_delete,
        total_rows: partition.total_rows(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl Confirmation {
    pub fn from_flag(confirmed: bool) -> Self {
        if confirmed {
            Self::Confirmed
        } else {
            Self::Declined
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeletionReport {
    pub executed: bool,
    pub batches_applied: usize,
    pub vessels_deleted: usize,
    pub rows_deleted: u64,
}

/// Applies the plan batch by batch. Declined plans touch nothing; the first
/// failing batch stops the run and later batches are never sent.
pub async fn execute_deletion<S: PositionStore + ?Sized>(
    store: &S,
    plan: &DeletionPlan,
    confirmation: Confirmation,
) -> Result<DeletionReport> {
    if confirmation == Confirmation::Declined {
        tracing::info!("Deletion declined, nothing removed");
        return Ok(DeletionReport::default());
    }

    let mut report = DeletionReport {
        executed: true,
        ..DeletionReport::default()
    };
    if plan.is_empty() {
        tracing::info!("No vessels to delete");
        return Ok(report);
    }

    let total_batches = plan.batch_count();
    for (i, batch) in plan.batches().enumerate() {
        let removed = store
            .delete_vessels(batch)
            .await
            .map_err(|e| AisError::delete(i + 1, batch.to_vec(), e))?;

        report.batches_applied += 1;
        report.vessels_deleted += batch.len();
        report.rows_deleted += removed;
        tracing::info!(
            "🗑️ Deleted batch {}/{} ({} vessels, {} rows)",
            i + 1,
            total_batches,
            batch.len(),
            removed
        );
    }

    tracing::info!(
        "✅ Deleted ALL records for {} vessels ({} rows)",
        report.vessels_deleted,
        report.rows_deleted
    );
    Ok(report)
}
