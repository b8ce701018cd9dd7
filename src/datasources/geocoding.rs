use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::error::{AgrometError, Result};
use crate::models::GeoKey;

const MAX_GEOCODING_ATTEMPTS: u32 = 3;

/// Coordinates resolved for a geographic key.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCoords {
    pub lat: f64,
    pub lon: f64,
    pub altitude: Option<f64>,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingHit>,
}

#[derive(Debug, Deserialize)]
struct GeocodingHit {
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
    timezone: Option<String>,
}

pub struct Geocoder {
    client: reqwest::Client,
    config: Config,
}

impl Geocoder {
    pub fn new(config: Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Resolve a key to coordinates, retrying transient failures with
    /// exponential backoff. A lookup that stays unavailable falls back to
    /// approximate coordinates; the caller always gets a location.
    pub async fn resolve(&self, key: &GeoKey) -> ResolvedCoords {
        let query = key.query();

        for attempt in 0..MAX_GEOCODING_ATTEMPTS {
            match self.lookup(query).await {
                Ok(Some(coords)) => return coords,
                // The provider answered but had no match; go straight to
                // the fallback table.
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("geocoding attempt {} failed: {}", attempt + 1, e);
                    if attempt + 1 < MAX_GEOCODING_ATTEMPTS {
                        tokio::time::sleep(Duration::from_millis(200 * 2u64.pow(attempt))).await;
                    }
                }
            }
        }

        tracing::warn!("using fallback coordinates for '{}'", query);
        self.fallback(key)
    }

    async fn lookup(&self, query: &str) -> Result<Option<ResolvedCoords>> {
        let mut params = vec![
            ("name", query.to_string()),
            ("count", "1".to_string()),
            ("language", self.config.provider.language.clone()),
            ("format", "json".to_string()),
        ];
        if let Some(ref country) = self.config.provider.country_code {
            params.push(("country_code", country.clone()));
        }

        let response = self
            .client
            .get(&self.config.provider.geocoding_url)
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgrometError::UpstreamFetch(format!(
                "geocoding returned {}",
                response.status()
            )));
        }

        let body: GeocodingResponse = response.json().await.map_err(AgrometError::Http)?;
        Ok(body.results.into_iter().next().map(|hit| ResolvedCoords {
            lat: hit.latitude,
            lon: hit.longitude,
            altitude: hit.elevation,
            timezone: hit.timezone,
        }))
    }

    /// Approximate coordinates: the fallback table by locality, then by
    /// region, then the configured representative location.
    pub fn fallback(&self, key: &GeoKey) -> ResolvedCoords {
        let entry = key
            .locality
            .as_deref()
            .and_then(|name| self.fallback_entry(name))
            .or_else(|| self.fallback_entry(&key.region));

        let timezone = self.config.location.timezone.clone();
        match entry {
            Some(entry) => ResolvedCoords {
                lat: entry.lat,
                lon: entry.lon,
                altitude: entry.altitude,
                timezone,
            },
            None => ResolvedCoords {
                lat: self.config.location.lat.unwrap_or(4.711),
                lon: self.config.location.lon.unwrap_or(-74.072),
                altitude: None,
                timezone,
            },
        }
    }

    fn fallback_entry(&self, name: &str) -> Option<&crate::config::FallbackEntry> {
        let normalized = normalize_key(name);
        self.config
            .fallback_coords
            .iter()
            .find(|entry| normalize_key(&entry.name) == normalized)
    }
}

fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}
