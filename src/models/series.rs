use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AgrometError, Result};

/// Geographic subject of a series: a region plus an optional locality.
/// A missing locality means "region-level, use representative coordinates".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoKey {
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
}

impl GeoKey {
    pub fn new(region: impl Into<String>, locality: Option<String>) -> Self {
        Self {
            region: region.into(),
            locality: locality.filter(|l| !l.is_empty()),
        }
    }

    /// Query string for geocoding lookups; the locality wins when present.
    pub fn query(&self) -> &str {
        self.locality.as_deref().unwrap_or(&self.region)
    }
}

/// Inclusive date range. The constructor normalizes swapped bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { from: a, to: b }
        } else {
            Self { from: b, to: a }
        }
    }

    pub fn parse(from: &str, to: &str) -> Result<Self> {
        Ok(Self::new(parse_date(from)?, parse_date(to)?))
    }

    /// Inclusive length in days.
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    pub fn is_entirely_future(&self, today: NaiveDate) -> bool {
        self.from > today
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    // Full timestamps are accepted; only the date part matters.
    value
        .parse::<DateTime<Utc>>()
        .map(|dt| dt.date_naive())
        .map_err(|_| AgrometError::InvalidRange(format!("unparsable date '{}'", value)))
}

/// One hour of observation or forecast. Fields are optional; absence means
/// "not requested or not available", never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation_rate_mm_h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_humidity_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed_m_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solar_radiation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_kpa: Option<f64>,
    /// Forecast-only probability of rain, 0.0-1.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain_probability: Option<f64>,
}

impl HourlyPoint {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            precipitation_mm: None,
            precipitation_rate_mm_h: None,
            temperature_c: None,
            relative_humidity_pct: None,
            wind_speed_m_s: None,
            solar_radiation: None,
            pressure_kpa: None,
            rain_probability: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMeta {
    pub source: String,
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

/// An assembled hourly series. `hourly` is ascending by timestamp with no
/// duplicates; gaps are legal and represent missing data, not zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub key: GeoKey,
    pub range: DateRange,
    pub hourly: Vec<HourlyPoint>,
    pub meta: SeriesMeta,
}
