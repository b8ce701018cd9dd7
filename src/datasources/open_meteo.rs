use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::datasources::geocoding::ResolvedCoords;
use crate::error::{AgrometError, Result};
use crate::logic::assembler::{self, Field, RawSegment, SegmentKind, SegmentPlan};
use crate::models::{DateRange, GeoKey, Series, SeriesMeta};

const MAX_FETCH_ATTEMPTS: u32 = 3;

pub struct OpenMeteoClient {
    client: reqwest::Client,
    config: ProviderConfig,
}

// Open-Meteo API response structure; the hourly block is the
// parallel-array segment the assembler consumes.
#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    hourly: Option<RawSegment>,
}

impl OpenMeteoClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Fetch and assemble an hourly series for the key and range. The
    /// range is split at today: history goes to the archive endpoint,
    /// today onward to the forecast endpoint, and the segments merge into
    /// one chronologically ordered series.
    pub async fn hourly_series(
        &self,
        key: &GeoKey,
        range: DateRange,
        fields: &[Field],
        coords: &ResolvedCoords,
    ) -> Result<Series> {
        let plans = assembler::plan_segments(&range, Utc::now().date_naive())?;
        let params = assembler::provider_params(fields);

        let mut segments = Vec::new();
        let mut tz_from_data: Option<String> = None;
        for plan in &plans {
            let response = self.fetch_segment(plan, coords, &params).await?;
            if tz_from_data.is_none() {
                tz_from_data = response.timezone;
            }
            if let Some(hourly) = response.hourly {
                segments.push(hourly);
            }
        }

        let meta = SeriesMeta {
            source: "open-meteo".into(),
            timezone: coords
                .timezone
                .clone()
                .or(tz_from_data)
                .unwrap_or_else(|| "UTC".into()),
            lat: Some(coords.lat),
            lon: Some(coords.lon),
            altitude: coords.altitude,
        };

        assembler::assemble(key.clone(), range, &segments, fields, meta)
    }

    /// Probe the forecast endpoint with a minimal request.
    pub async fn test_connection(&self, coords: &ResolvedCoords) -> Result<bool> {
        let response = self
            .client
            .get(&self.config.forecast_url)
            .query(&[
                ("latitude", format!("{:.4}", coords.lat)),
                ("longitude", format!("{:.4}", coords.lon)),
                ("hourly", "temperature_2m".to_string()),
                ("forecast_days", "1".to_string()),
            ])
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    async fn fetch_segment(
        &self,
        plan: &SegmentPlan,
        coords: &ResolvedCoords,
        params: &[&str],
    ) -> Result<OpenMeteoResponse> {
        let base = match plan.kind {
            SegmentKind::Archive => &self.config.archive_url,
            SegmentKind::Forecast => &self.config.forecast_url,
        };
        let query = [
            ("latitude", format!("{:.4}", coords.lat)),
            ("longitude", format!("{:.4}", coords.lon)),
            ("hourly", params.join(",")),
            ("start_date", plan.from.to_string()),
            ("end_date", plan.to.to_string()),
            ("timezone", "UTC".to_string()),
            ("temperature_unit", "celsius".to_string()),
            ("windspeed_unit", "ms".to_string()),
            ("precipitation_unit", "mm".to_string()),
        ];

        let mut last_error = String::new();
        for attempt in 0..MAX_FETCH_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(200 * 2u64.pow(attempt - 1))).await;
            }
            match self.try_fetch(base, &query).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!("segment fetch attempt {} failed: {}", attempt + 1, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(AgrometError::UpstreamFetch(format!(
            "{} after {} attempts: {}",
            base, MAX_FETCH_ATTEMPTS, last_error
        )))
    }

    async fn try_fetch(
        &self,
        base: &str,
        query: &[(&str, String)],
    ) -> Result<OpenMeteoResponse> {
        let response = self.client.get(base).query(query).send().await?;
        if !response.status().is_success() {
            return Err(AgrometError::UpstreamFetch(format!(
                "{} returned {}",
                base,
                response.status()
            )));
        }
        response.json().await.map_err(AgrometError::Http)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = OpenMeteoClient::new(ProviderConfig::default());
        assert!(client.config.forecast_url.contains("open-meteo"));
    }

    #[test]
    fn hourly_block_decodes_parallel_arrays() {
        let body = r#"{
            "timezone": "UTC",
            "hourly": {
                "time": ["2025-01-01T00:00", "2025-01-01T01:00"],
                "precipitation": [0.0, null],
                "temperature_2m": [21.5, 20.9]
            }
        }"#;
        let response: OpenMeteoResponse = serde_json::from_str(body).unwrap();
        let hourly = response.hourly.unwrap();
        assert_eq!(hourly.time.len(), 2);
        assert_eq!(hourly.values["precipitation"], vec![Some(0.0), None]);
        assert_eq!(hourly.values["temperature_2m"][1], Some(20.9));
    }
}
