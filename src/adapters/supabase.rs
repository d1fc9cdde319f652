//! `PositionStore` over the Supabase (PostgREST) REST interface.

use crate::domain::model::{Mmsi, PositionReport, PositionRow};
use crate::domain::ports::PositionStore;
use crate::utils::error::{AisError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Inserts are sent in chunks of this many rows.
const INSERT_CHUNK_SIZE: usize = 500;

/// Vessel runs stay contiguous; the primary key breaks ties between rows
/// stored twice for the same vessel and timestamp, keeping offsets stable.
const READ_ORDER: &str = "mmsi.asc,timestamp.asc,id.asc";

pub struct SupabaseStore {
    client: Client,
    base_url: String,
    key: String,
    table: String,
}

#[derive(Debug, Deserialize)]
struct TimestampRow {
    timestamp: DateTime<Utc>,
}

impl SupabaseStore {
    pub fn new(base_url: &str, key: &str, table: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            table: table.to_string(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.table_url())
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AisError::ApiStatus {
            status: status.as_u16(),
            body,
        })
    }

    /// Total from a `Content-Range: 0-9/42` or `*/42` header.
    fn content_range_total(response: &Response) -> Option<u64> {
        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|total| total.parse().ok())
    }

    async fn boundary_timestamp(&self, ascending: bool) -> Result<Option<DateTime<Utc>>> {
        let order = if ascending {
            "timestamp.asc"
        } else {
            "timestamp.desc"
        };
        let response = self
            .request(Method::GET)
            .query(&[("select", "timestamp"), ("order", order), ("limit", "1")])
            .send()
            .await?;
        let rows: Vec<TimestampRow> = Self::check(response).await?.json().await?;
        Ok(rows.into_iter().next().map(|row| row.timestamp))
    }
}

#[async_trait]
impl PositionStore for SupabaseStore {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<PositionRow>> {
        let response = self
            .request(Method::GET)
            .query(&[
                ("select", "mmsi,longitude,latitude".to_string()),
                ("order", READ_ORDER.to_string()),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        // Past the end some PostgREST versions answer 416 instead of [].
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Vec::new());
        }
        let rows: Vec<PositionRow> = Self::check(response).await?.json().await?;
        tracing::trace!("fetched {} rows at offset {}", rows.len(), offset);
        Ok(rows)
    }

    async fn delete_vessels(&self, vessels: &[Mmsi]) -> Result<u64> {
        if vessels.is_empty() {
            return Ok(0);
        }
        let ids = vessels
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .request(Method::DELETE)
            .query(&[("mmsi", format!("in.({})", ids))])
            .header("Prefer", "return=minimal,count=exact")
            .send()
            .await?;
        let response = Self::check(response).await?;

        let removed = Self::content_range_total(&response).unwrap_or_else(|| {
            tracing::debug!("delete response carried no row count");
            0
        });
        Ok(removed)
    }

    async fn insert_positions(&self, positions: &[PositionReport]) -> Result<()> {
        for chunk in positions.chunks(INSERT_CHUNK_SIZE) {
            let response = self
                .request(Method::POST)
                .header("Prefer", "return=minimal")
                .json(chunk)
                .send()
                .await?;
            Self::check(response).await?;
            tracing::debug!("inserted {} positions", chunk.len());
        }
        Ok(())
    }

    async fn count_rows(&self) -> Result<u64> {
        let response = self
            .request(Method::GET)
            .query(&[("select", "mmsi"), ("limit", "1")])
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = Self::check(response).await?;

        Self::content_range_total(&response).ok_or_else(|| AisError::ApiStatus {
            status: response.status().as_u16(),
            body: "missing Content-Range total".to_string(),
        })
    }

    async fn timestamp_bounds(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let oldest = self.boundary_timestamp(true).await?;
        let newest = self.boundary_timestamp(false).await?;
        Ok((oldest, newest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn store(server: &MockServer) -> SupabaseStore {
        SupabaseStore::new(&server.base_url(), "test-key", "vessel_positions", Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_page_requests_projection_order_and_range() {
        let server = MockServer::start();
        let page_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/vessel_positions")
                .header("apikey", "test-key")
                .header("Authorization", "Bearer test-key")
                .query_param("select", "mmsi,longitude,latitude")
                .query_param("order", "mmsi.asc,timestamp.asc,id.asc")
                .query_param("offset", "2000")
                .query_param("limit", "1000");
            then.status(200).json_body(serde_json::json!([
                {"mmsi": 1, "longitude": 24.9, "latitude": 60.1},
                {"mmsi": 2, "longitude": 21.0, "latitude": 59.0}
            ]));
        });

        let rows = store(&server).fetch_page(2000, 1000).await.unwrap();

        page_mock.assert();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].mmsi, 2);
    }

    #[tokio::test]
    async fn test_fetch_page_past_end_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/vessel_positions");
            then.status(416);
        });

        assert!(store(&server).fetch_page(5000, 1000).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_page_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/vessel_positions");
            then.status(401).body("{\"message\":\"Invalid API key\"}");
        });

        match store(&server).fetch_page(0, 1000).await {
            Err(AisError::ApiStatus { status, .. }) => assert_eq!(status, 401),
            other => panic!("expected ApiStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_vessels_filters_by_id_list_and_reads_count() {
        let server = MockServer::start();
        let delete_mock = server.mock(|when, then| {
            when.method(DELETE)
                .path("/rest/v1/vessel_positions")
                .query_param("mmsi", "in.(230145000,265000001)")
                .header("Prefer", "return=minimal,count=exact");
            then.status(204).header("Content-Range", "*/37");
        });

        let removed = store(&server)
            .delete_vessels(&[230_145_000, 265_000_001])
            .await
            .unwrap();

        delete_mock.assert();
        assert_eq!(removed, 37);
    }

    #[tokio::test]
    async fn test_delete_empty_list_sends_nothing() {
        let server = MockServer::start();
        let delete_mock = server.mock(|when, then| {
            when.method(DELETE);
            then.status(204);
        });

        assert_eq!(store(&server).delete_vessels(&[]).await.unwrap(), 0);
        delete_mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_count_rows_reads_content_range() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/vessel_positions")
                .header("Prefer", "count=exact");
            then.status(206)
                .header("Content-Range", "0-0/123456")
                .json_body(serde_json::json!([{"mmsi": 1}]));
        });

        assert_eq!(store(&server).count_rows().await.unwrap(), 123_456);
    }

    #[tokio::test]
    async fn test_timestamp_bounds() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/vessel_positions")
                .query_param("order", "timestamp.asc");
            then.status(200)
                .json_body(serde_json::json!([{"timestamp": "2024-01-01T00:00:00+00:00"}]));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/vessel_positions")
                .query_param("order", "timestamp.desc");
            then.status(200).json_body(serde_json::json!([]));
        });

        let (oldest, newest) = store(&server).timestamp_bounds().await.unwrap();
        assert_eq!(oldest.map(|t| t.timestamp()), Some(1_704_067_200));
        assert_eq!(newest, None);
    }

    #[tokio::test]
    async fn test_insert_positions_posts_json() {
        let server = MockServer::start();
        let insert_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/vessel_positions")
                .header("Prefer", "return=minimal")
                .body_contains("\"territorial_country\":\"FI\"");
            then.status(201);
        });

        let report = PositionReport {
            mmsi: 230_145_000,
            longitude: 24.95,
            latitude: 60.15,
            timestamp: Utc::now(),
            sog: Some(10.0),
            cog: None,
            heading: None,
            nav_status: None,
            name: None,
            ship_type: None,
            territorial_country: Some("FI".to_string()),
            in_territorial_waters: true,
        };
        store(&server).insert_positions(&[report]).await.unwrap();

        insert_mock.assert();
    }

    fn report(mmsi: Mmsi, sog: Option<f64>, heading: Option<u16>) -> PositionReport {
        PositionReport {
            mmsi,
            longitude: 21.0,
            latitude: 60.0,
            timestamp: Utc::now(),
            sog,
            cog: None,
            heading,
            nav_status: None,
            name: None,
            ship_type: None,
            territorial_country: None,
            in_territorial_waters: false,
        }
    }

    #[test]
    fn test_insert_chunk_rows_share_one_key_set() {
        let chunk = vec![
            report(1, Some(1.0), None),
            report(2, None, Some(90)),
            report(3, None, None),
        ];
        let body = serde_json::to_value(&chunk).unwrap();

        let key_sets: Vec<Vec<String>> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|row| {
                let mut keys: Vec<String> = row.as_object().unwrap().keys().cloned().collect();
                keys.sort();
                keys
            })
            .collect();
        assert!(key_sets.iter().all(|keys| keys == &key_sets[0]));
        assert!(key_sets[0].contains(&"sog".to_string()));
        assert!(key_sets[0].contains(&"heading".to_string()));
        assert_eq!(body[1]["sog"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_insert_sends_nulls_for_missing_fields() {
        let server = MockServer::start();
        let insert_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/vessel_positions")
                .body_contains("\"sog\":1.0")
                .body_contains("\"sog\":null")
                .body_contains("\"heading\":null");
            then.status(201);
        });

        store(&server)
            .insert_positions(&[report(1, Some(1.0), Some(45)), report(2, None, None)])
            .await
            .unwrap();

        insert_mock.assert();
    }
}
