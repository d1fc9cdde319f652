use crate::core::retention::{PositionPager, PAGE_SIZE};
use crate::domain::model::{Mmsi, StoreStats};
use crate::domain::ports::PositionStore;
use crate::utils::error::Result;
use std::collections::HashSet;

/// Row count, distinct vessels (full paged scan) and timestamp range of the store.
pub async fn collect_stats<S: PositionStore + ?Sized>(store: &S) -> Result<StoreStats> {
    let total_rows = store.count_rows().await?;

    let mut vessels: HashSet<Mmsi> = HashSet::new();
    let mut pager = PositionPager::new(store, PAGE_SIZE);
    while let Some(page) = pager.next_page().await? {
        vessels.extend(page.iter().map(|row| row.mmsi));
    }
    tracing::debug!("Scanned {} rows for distinct vessels", pager.rows_read());

    let (oldest, newest) = store.timestamp_bounds().await?;

    Ok(StoreStats {
        total_rows,
        unique_vessels: vessels.len(),
        oldest,
        newest,
    })
}
