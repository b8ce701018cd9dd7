use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{DateRange, Series};

/// Which daily value the trend is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    /// Rain accumulated over the day (mm).
    AccumulatedRain,
    /// The day's peak hourly intensity (mm/h).
    PeakIntensity,
}

impl TrendMetric {
    pub fn from_name(name: &str) -> Option<TrendMetric> {
        match name {
            "accumulated" => Some(TrendMetric::AccumulatedRain),
            "intensity" => Some(TrendMetric::PeakIntensity),
            _ => None,
        }
    }
}

/// Canned dashboard ranges with their fixed smoothing windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePreset {
    ThreeMonths,
    OneYear,
    FiveYears,
    Future,
}

impl RangePreset {
    pub fn from_name(name: &str) -> Option<RangePreset> {
        match name {
            "three-months" => Some(RangePreset::ThreeMonths),
            "one-year" => Some(RangePreset::OneYear),
            "five-years" => Some(RangePreset::FiveYears),
            "future" => Some(RangePreset::Future),
            _ => None,
        }
    }

    pub fn window(&self) -> usize {
        match self {
            RangePreset::ThreeMonths => 7,
            RangePreset::OneYear => 30,
            RangePreset::FiveYears => 60,
            RangePreset::Future => 7,
        }
    }

    /// Span in days used when building the range from "today".
    pub fn days(&self) -> i64 {
        match self {
            RangePreset::ThreeMonths => 90,
            RangePreset::OneYear => 365,
            RangePreset::FiveYears => 365 * 5,
            RangePreset::Future => 14,
        }
    }

    pub fn is_future(&self) -> bool {
        matches!(self, RangePreset::Future)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoothing {
    Ma,
    Ema,
}

impl Smoothing {
    pub fn from_name(name: &str) -> Option<Smoothing> {
        match name {
            "ma" => Some(Smoothing::Ma),
            "ema" => Some(Smoothing::Ema),
            _ => None,
        }
    }
}

/// One day of the aggregated presentation series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyValue {
    pub date: NaiveDate,
    pub value: f64,
}

/// One defined point of a smoothed trend line, indexed into the daily
/// aggregation it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub index: usize,
    pub value: f64,
}

/// Collapse an hourly series into one value per calendar day (UTC).
/// A day appears once it has any hourly record, even when the metric's
/// field is absent for every hour of it.
pub fn aggregate_daily(series: &Series, metric: TrendMetric) -> Vec<DailyValue> {
    let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    for point in &series.hourly {
        let day = point.timestamp.date_naive();
        let bucket = buckets.entry(day).or_insert(0.0);
        match metric {
            TrendMetric::AccumulatedRain => {
                if let Some(rain) = point.precipitation_mm {
                    *bucket += rain;
                }
            }
            TrendMetric::PeakIntensity => {
                if let Some(rate) = point.precipitation_rate_mm_h {
                    if rate > *bucket {
                        *bucket = rate;
                    }
                }
            }
        }
    }

    buckets
        .into_iter()
        .map(|(date, value)| DailyValue { date, value })
        .collect()
}

/// Trailing moving average; undefined before the first full window.
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out[i] = Some(sum / window as f64);
        }
    }
    out
}

/// Exponential moving average with alpha = 2/(window+1), seeded from the
/// first raw value; defined at every index.
pub fn exponential_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    let alpha = 2.0 / (window as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = first;
    out.push(prev);
    for &value in &values[1..] {
        prev = alpha * value + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// Smoothing window inferred from a custom range's inclusive day count.
pub fn window_for_custom_range(range: &DateRange) -> usize {
    let days = range.days().max(1);
    if days <= 120 {
        7
    } else if days <= 550 {
        30
    } else {
        60
    }
}

/// Smooth a daily aggregation. Returns `None` for ranges entirely in the
/// future: a forecast has no historical trend.
pub fn compute_trend(
    daily: &[DailyValue],
    range: &DateRange,
    preset: Option<RangePreset>,
    smoothing: Smoothing,
    today: NaiveDate,
) -> Option<Vec<TrendPoint>> {
    if preset.is_some_and(|p| p.is_future()) || range.is_entirely_future(today) {
        return None;
    }
    if daily.is_empty() {
        return None;
    }

    let window = preset
        .map(|p| p.window())
        .unwrap_or_else(|| window_for_custom_range(range));
    if window <= 1 {
        return Some(Vec::new());
    }

    let values: Vec<f64> = daily.iter().map(|d| d.value).collect();
    let points = match smoothing {
        Smoothing::Ma => moving_average(&values, window)
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| value.map(|value| TrendPoint { index, value }))
            .collect(),
        Smoothing::Ema => exponential_moving_average(&values, window)
            .into_iter()
            .enumerate()
            .map(|(index, value)| TrendPoint { index, value })
            .collect(),
    };
    Some(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoKey, HourlyPoint, SeriesMeta};
    use chrono::{DateTime, Utc};

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn series_with_rain(days: &[(&str, &[f64])]) -> Series {
        let mut hourly = Vec::new();
        for (day, rains) in days {
            for (i, rain) in rains.iter().enumerate() {
                let stamp: DateTime<Utc> =
                    format!("{}T{:02}:00:00Z", day, i).parse().unwrap();
                let mut point = HourlyPoint::new(stamp);
                point.precipitation_mm = Some(*rain);
                point.precipitation_rate_mm_h = Some(*rain);
                hourly.push(point);
            }
        }
        Series {
            key: GeoKey::new("Meta", None),
            range: DateRange::parse(days[0].0, days[days.len() - 1].0).unwrap(),
            hourly,
            meta: SeriesMeta {
                source: "open-meteo".into(),
                timezone: "UTC".into(),
                lat: None,
                lon: None,
                altitude: None,
            },
        }
    }

    #[test]
    fn moving_average_is_undefined_before_full_window() {
        let out = moving_average(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(2.0));
        assert_eq!(out[3], Some(3.0));
    }

    #[test]
    fn ema_is_defined_everywhere_and_seeded() {
        let values = [4.0, 2.0, 6.0];
        let out = exponential_moving_average(&values, 3);
        assert_eq!(out.len(), values.len());
        assert_eq!(out[0], values[0]);
        // alpha = 0.5 with window 3
        assert_eq!(out[1], 3.0);
        assert_eq!(out[2], 4.5);
    }

    #[test]
    fn custom_window_tiers() {
        let short = DateRange::parse("2025-01-01", "2025-04-30").unwrap();
        assert_eq!(window_for_custom_range(&short), 7);
        let medium = DateRange::parse("2024-01-01", "2025-01-01").unwrap();
        assert_eq!(window_for_custom_range(&medium), 30);
        let long = DateRange::parse("2020-01-01", "2025-01-01").unwrap();
        assert_eq!(window_for_custom_range(&long), 60);
    }

    #[test]
    fn preset_windows() {
        assert_eq!(RangePreset::ThreeMonths.window(), 7);
        assert_eq!(RangePreset::OneYear.window(), 30);
        assert_eq!(RangePreset::FiveYears.window(), 60);
    }

    #[test]
    fn aggregate_daily_sums_rain_per_day() {
        let series = series_with_rain(&[
            ("2025-01-01", &[1.0, 2.0]),
            ("2025-01-02", &[0.0, 0.5]),
        ]);
        let daily = aggregate_daily(&series, TrendMetric::AccumulatedRain);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, date("2025-01-01"));
        assert_eq!(daily[0].value, 3.0);
        assert_eq!(daily[1].value, 0.5);
    }

    #[test]
    fn aggregate_daily_takes_peak_intensity() {
        let series = series_with_rain(&[("2025-01-01", &[1.0, 4.0, 2.0])]);
        let daily = aggregate_daily(&series, TrendMetric::PeakIntensity);
        assert_eq!(daily[0].value, 4.0);
    }

    #[test]
    fn trend_suppressed_for_future_ranges() {
        let series = series_with_rain(&[("2025-06-05", &[1.0])]);
        let daily = aggregate_daily(&series, TrendMetric::AccumulatedRain);
        let trend = compute_trend(
            &daily,
            &series.range,
            None,
            Smoothing::Ema,
            date("2025-06-01"),
        );
        assert!(trend.is_none());
    }

    #[test]
    fn trend_suppressed_for_future_preset() {
        let series = series_with_rain(&[("2025-05-20", &[1.0])]);
        let daily = aggregate_daily(&series, TrendMetric::AccumulatedRain);
        let trend = compute_trend(
            &daily,
            &series.range,
            Some(RangePreset::Future),
            Smoothing::Ema,
            date("2025-06-01"),
        );
        assert!(trend.is_none());
    }

    #[test]
    fn trend_over_daily_aggregation() {
        let series = series_with_rain(&[
            ("2025-01-01", &[1.0]),
            ("2025-01-02", &[2.0]),
            ("2025-01-03", &[3.0]),
        ]);
        let daily = aggregate_daily(&series, TrendMetric::AccumulatedRain);
        let trend = compute_trend(
            &daily,
            &series.range,
            None,
            Smoothing::Ema,
            date("2025-06-01"),
        )
        .unwrap();
        // Custom three-day range uses a 7-point window; EMA is defined at
        // every index regardless.
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0].value, 1.0);
    }
}
