//! Live vessel location feed (Digitraffic marine AIS API).

use crate::domain::model::{Mmsi, PositionReport};
use crate::utils::error::{AisError, Result};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationFeed {
    #[serde(rename = "dataUpdatedTime", default, skip_serializing_if = "Option::is_none")]
    pub data_updated_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub features: Vec<LocationFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFeature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mmsi: Option<Mmsi>,
    pub geometry: PointGeometry,
    #[serde(default)]
    pub properties: LocationProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mmsi: Option<Mmsi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sog: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cog: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav_stat: Option<u8>,
    /// Milliseconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_external: Option<i64>,
    /// Fields passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LocationFeature {
    pub fn mmsi(&self) -> Option<Mmsi> {
        self.mmsi.or(self.properties.mmsi)
    }

    /// `(lon, lat)` when the point carries both axes.
    pub fn lon_lat(&self) -> Option<(f64, f64)> {
        match self.geometry.coordinates.as_slice() {
            [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some((*lon, *lat)),
            _ => None,
        }
    }

    /// Unattributed report; `fallback_time` is used when the feed has no timestamp.
    pub fn to_report(&self, fallback_time: DateTime<Utc>) -> Option<PositionReport> {
        let mmsi = self.mmsi()?;
        let (longitude, latitude) = self.lon_lat()?;
        let timestamp = self
            .properties
            .timestamp_external
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or(fallback_time);

        Some(PositionReport {
            mmsi,
            longitude,
            latitude,
            timestamp,
            sog: self.properties.sog,
            cog: self.properties.cog,
            heading: self.properties.heading,
            nav_status: self.properties.nav_stat,
            name: self
                .properties
                .extra
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
            ship_type: self
                .properties
                .extra
                .get("shipType")
                .and_then(Value::as_u64)
                .and_then(|t| u8::try_from(t).ok()),
            territorial_country: None,
            in_territorial_waters: false,
        })
    }
}

pub struct AisFeedClient {
    client: Client,
    endpoint: String,
}

impl AisFeedClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn fetch_locations(&self) -> Result<LocationFeed> {
        tracing::debug!("Making API request to: {}", self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("API response status: {}", status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AisError::ApiStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn feed_json() -> serde_json::Value {
        serde_json::json!({
            "type": "FeatureCollection",
            "dataUpdatedTime": "2024-05-01T12:00:00Z",
            "features": [
                {
                    "mmsi": 230_145_000,
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [24.95, 60.15]},
                    "properties": {
                        "mmsi": 230_145_000,
                        "sog": 12.3,
                        "cog": 254.1,
                        "navStat": 0,
                        "rot": 0,
                        "posAcc": true,
                        "heading": 253,
                        "timestampExternal": 1_714_564_800_000_i64
                    }
                },
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [10.0]},
                    "properties": {"mmsi": 265_000_001}
                }
            ]
        })
    }

    #[tokio::test]
    async fn test_fetch_locations_parses_feed() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/api/ais/v1/locations");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(feed_json());
        });

        let client =
            AisFeedClient::new(server.url("/api/ais/v1/locations"), Duration::from_secs(5)).unwrap();
        let feed = client.fetch_locations().await.unwrap();

        api_mock.assert();
        assert_eq!(feed.features.len(), 2);
        let first = &feed.features[0];
        assert_eq!(first.mmsi(), Some(230_145_000));
        assert_eq!(first.lon_lat(), Some((24.95, 60.15)));
        assert_eq!(first.properties.nav_stat, Some(0));
        assert_eq!(first.properties.extra.get("rot"), Some(&serde_json::json!(0)));
        assert_eq!(feed.features[1].mmsi(), Some(265_000_001));
        assert_eq!(feed.features[1].lon_lat(), None);
    }

    #[tokio::test]
    async fn test_fetch_locations_reports_http_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/locations");
            then.status(502).body("bad gateway");
        });

        let client = AisFeedClient::new(server.url("/locations"), Duration::from_secs(5)).unwrap();
        match client.fetch_locations().await {
            Err(AisError::ApiStatus { status, body }) => {
                assert_eq!(status, 502);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("expected ApiStatus, got {:?}", other),
        }
    }

    #[test]
    fn test_to_report_uses_feed_timestamp() {
        let feed: LocationFeed = serde_json::from_value(feed_json()).unwrap();
        let fallback = Utc::now();

        let report = feed.features[0].to_report(fallback).unwrap();
        assert_eq!(report.timestamp.timestamp_millis(), 1_714_564_800_000);
        assert_eq!(report.sog, Some(12.3));
        assert_eq!(report.heading, Some(253));
        assert!(report.territorial_country.is_none());

        assert!(feed.features[1].to_report(fallback).is_none());
    }
}
