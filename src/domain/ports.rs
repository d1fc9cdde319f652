use crate::domain::model::{Mmsi, PositionReport, PositionRow};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

/// Persistence collaborator holding the vessel position history.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Rows `offset..offset + limit`, ordered by vessel identifier.
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<PositionRow>>;

    /// Removes every row of the given vessels and returns how many rows went away.
    async fn delete_vessels(&self, vessels: &[Mmsi]) -> Result<u64>;

    async fn insert_positions(&self, positions: &[PositionReport]) -> Result<()>;

    async fn count_rows(&self) -> Result<u64>;

    /// Oldest and newest stored timestamps.
    async fn timestamp_bounds(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Raw: Send;
    type Transformed: Send;

    async fn extract(&self) -> Result<Self::Raw>;
    async fn transform(&self, data: Self::Raw) -> Result<Self::Transformed>;
    async fn load(&self, result: Self::Transformed) -> Result<String>;
}
