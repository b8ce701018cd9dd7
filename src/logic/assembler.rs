use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::{AgrometError, Result};
use crate::models::{DateRange, GeoKey, HourlyPoint, Series, SeriesMeta};

/// Canonical hourly fields a caller may request. Each maps to exactly one
/// provider parameter and one numeric transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Precipitation,
    PrecipitationRate,
    Temperature,
    RelativeHumidity,
    WindSpeed,
    SolarRadiation,
    Pressure,
}

pub const ALL_FIELDS: [Field; 7] = [
    Field::Precipitation,
    Field::PrecipitationRate,
    Field::Temperature,
    Field::RelativeHumidity,
    Field::WindSpeed,
    Field::SolarRadiation,
    Field::Pressure,
];

impl Field {
    pub fn from_name(name: &str) -> Option<Field> {
        match name {
            "prcp" => Some(Field::Precipitation),
            "prcp_rate" => Some(Field::PrecipitationRate),
            "temp" => Some(Field::Temperature),
            "rh" => Some(Field::RelativeHumidity),
            "wind" => Some(Field::WindSpeed),
            "rs" => Some(Field::SolarRadiation),
            "pressure" => Some(Field::Pressure),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Field::Precipitation => "prcp",
            Field::PrecipitationRate => "prcp_rate",
            Field::Temperature => "temp",
            Field::RelativeHumidity => "rh",
            Field::WindSpeed => "wind",
            Field::SolarRadiation => "rs",
            Field::Pressure => "pressure",
        }
    }

    /// Provider parameter backing this field.
    pub fn provider_param(&self) -> &'static str {
        match self {
            Field::Precipitation | Field::PrecipitationRate => "precipitation",
            Field::Temperature => "temperature_2m",
            Field::RelativeHumidity => "relative_humidity_2m",
            Field::WindSpeed => "wind_speed_10m",
            Field::SolarRadiation => "shortwave_radiation",
            Field::Pressure => "surface_pressure",
        }
    }

    /// Transform a raw provider value into canonical units and precision.
    pub fn map_value(&self, value: f64) -> f64 {
        match self {
            Field::Precipitation | Field::PrecipitationRate => round(value.max(0.0), 2),
            Field::Temperature => round(value, 2),
            Field::RelativeHumidity => round(value, 1),
            Field::WindSpeed => round(wind_10m_to_2m(value), 2),
            Field::SolarRadiation => round(value, 2),
            // hPa -> kPa
            Field::Pressure => round(value * 0.1, 2),
        }
    }
}

/// Wind measured at 10 m scaled to the 2 m agronomic reference height.
fn wind_10m_to_2m(speed: f64) -> f64 {
    speed * 0.75
}

fn round(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Resolve requested field names against the canonical table. Unknown
/// names are skipped; a request resolving to no recognized field fails.
pub fn parse_fields(names: &[String]) -> Result<Vec<Field>> {
    let mut fields = Vec::new();
    for name in names {
        if let Some(field) = Field::from_name(name.trim()) {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
    }
    if fields.is_empty() {
        return Err(AgrometError::UnsupportedField(names.join(",")));
    }
    Ok(fields)
}

/// Unique provider parameters for a field list, in request order.
pub fn provider_params(fields: &[Field]) -> Vec<&'static str> {
    let mut params = Vec::new();
    for field in fields {
        let param = field.provider_param();
        if !params.contains(&param) {
            params.push(param);
        }
    }
    params
}

/// One upstream fetch decoded as parallel arrays keyed by provider
/// parameter name. Entries may be null where the provider has no data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSegment {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(flatten)]
    pub values: HashMap<String, Vec<Option<f64>>>,
}

/// Where a planned segment should be fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Archive,
    Forecast,
}

/// A sub-range of the request bound for one upstream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPlan {
    pub kind: SegmentKind,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Split the requested range at "today": history up to yesterday goes to
/// the archive endpoint, today onward to the forecast endpoint. A range
/// entirely on one side yields a single segment.
pub fn plan_segments(range: &DateRange, today: NaiveDate) -> Result<Vec<SegmentPlan>> {
    if range.from > range.to {
        return Err(AgrometError::InvalidRange(format!(
            "{} > {}",
            range.from, range.to
        )));
    }

    let yesterday = today - Duration::days(1);
    let mut plans = Vec::new();

    if range.from <= yesterday {
        plans.push(SegmentPlan {
            kind: SegmentKind::Archive,
            from: range.from,
            to: range.to.min(yesterday),
        });
    }
    if range.to >= today {
        plans.push(SegmentPlan {
            kind: SegmentKind::Forecast,
            from: range.from.max(today),
            to: range.to,
        });
    }

    Ok(plans)
}

/// Merge one or more raw segments into a single chronologically ordered,
/// deduplicated series. A timestamp seen in multiple segments is merged
/// field by field; later segments fill fields the earlier one lacked, and
/// null/NaN source values are treated as absent, never as zero.
pub fn assemble(
    key: GeoKey,
    range: DateRange,
    segments: &[RawSegment],
    fields: &[Field],
    meta: SeriesMeta,
) -> Result<Series> {
    let mut by_time: BTreeMap<DateTime<Utc>, HourlyPoint> = BTreeMap::new();

    for segment in segments {
        for (index, stamp) in segment.time.iter().enumerate() {
            let timestamp = parse_hour_timestamp(stamp)?;
            let point = by_time
                .entry(timestamp)
                .or_insert_with(|| HourlyPoint::new(timestamp));

            for field in fields {
                let Some(series) = segment.values.get(field.provider_param()) else {
                    continue;
                };
                let Some(Some(value)) = series.get(index) else {
                    continue;
                };
                if value.is_nan() {
                    continue;
                }
                set_field(point, *field, field.map_value(*value));
            }
        }
    }

    Ok(Series {
        key,
        range,
        hourly: by_time.into_values().collect(),
        meta,
    })
}

fn set_field(point: &mut HourlyPoint, field: Field, value: f64) {
    match field {
        Field::Precipitation => point.precipitation_mm = Some(value),
        Field::PrecipitationRate => point.precipitation_rate_mm_h = Some(value),
        Field::Temperature => point.temperature_c = Some(value),
        Field::RelativeHumidity => point.relative_humidity_pct = Some(value),
        Field::WindSpeed => point.wind_speed_m_s = Some(value),
        Field::SolarRadiation => point.solar_radiation = Some(value),
        Field::Pressure => point.pressure_kpa = Some(value),
    }
}

fn parse_hour_timestamp(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = value.parse::<DateTime<Utc>>() {
        return Ok(dt);
    }
    // Providers commonly omit the zone suffix; such stamps are UTC.
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|_| AgrometError::InvalidData(format!("unparsable timestamp '{}'", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn sample_meta() -> SeriesMeta {
        SeriesMeta {
            source: "open-meteo".into(),
            timezone: "UTC".into(),
            lat: Some(4.15),
            lon: Some(-73.63),
            altitude: None,
        }
    }

    fn segment(time: &[&str], values: &[(&str, &[Option<f64>])]) -> RawSegment {
        RawSegment {
            time: time.iter().map(|t| t.to_string()).collect(),
            values: values
                .iter()
                .map(|(param, series)| (param.to_string(), series.to_vec()))
                .collect(),
        }
    }

    #[test]
    fn parse_fields_skips_unknown_names() {
        let fields = parse_fields(&["prcp".into(), "bogus".into(), "temp".into()]).unwrap();
        assert_eq!(fields, vec![Field::Precipitation, Field::Temperature]);
    }

    #[test]
    fn parse_fields_fails_when_nothing_recognized() {
        let err = parse_fields(&["bogus".into(), "nope".into()]).unwrap_err();
        assert!(matches!(err, AgrometError::UnsupportedField(_)));
    }

    #[test]
    fn provider_params_deduplicate_shared_parameters() {
        let params = provider_params(&[
            Field::Precipitation,
            Field::PrecipitationRate,
            Field::WindSpeed,
        ]);
        assert_eq!(params, vec!["precipitation", "wind_speed_10m"]);
    }

    #[test]
    fn wind_is_scaled_to_two_meters() {
        assert_eq!(Field::WindSpeed.map_value(4.0), 3.0);
    }

    #[test]
    fn pressure_converts_hpa_to_kpa() {
        assert_eq!(Field::Pressure.map_value(1013.25), 101.33);
    }

    #[test]
    fn precipitation_is_clamped_non_negative() {
        assert_eq!(Field::Precipitation.map_value(-0.4), 0.0);
        assert_eq!(Field::Precipitation.map_value(1.237), 1.24);
    }

    #[test]
    fn humidity_rounds_to_one_decimal() {
        assert_eq!(Field::RelativeHumidity.map_value(64.57), 64.6);
    }

    #[test]
    fn plan_splits_range_straddling_today() {
        let range = DateRange::parse("2025-05-28", "2025-06-03").unwrap();
        let plans = plan_segments(&range, date("2025-06-01")).unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].kind, SegmentKind::Archive);
        assert_eq!(plans[0].from, date("2025-05-28"));
        assert_eq!(plans[0].to, date("2025-05-31"));
        assert_eq!(plans[1].kind, SegmentKind::Forecast);
        assert_eq!(plans[1].from, date("2025-06-01"));
        assert_eq!(plans[1].to, date("2025-06-03"));
    }

    #[test]
    fn plan_past_only_uses_archive() {
        let range = DateRange::parse("2025-04-01", "2025-04-10").unwrap();
        let plans = plan_segments(&range, date("2025-06-01")).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].kind, SegmentKind::Archive);
        assert_eq!(plans[0].to, date("2025-04-10"));
    }

    #[test]
    fn plan_future_only_uses_forecast() {
        let range = DateRange::parse("2025-06-01", "2025-06-05").unwrap();
        let plans = plan_segments(&range, date("2025-06-01")).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].kind, SegmentKind::Forecast);
        assert_eq!(plans[0].from, date("2025-06-01"));
    }

    #[test]
    fn assemble_merges_fields_across_segments() {
        let range = DateRange::parse("2025-01-01", "2025-01-01").unwrap();
        let first = segment(
            &["2025-01-01T00:00", "2025-01-01T01:00"],
            &[("precipitation", &[Some(1.0), None])],
        );
        let second = segment(
            &["2025-01-01T01:00", "2025-01-01T02:00"],
            &[
                ("precipitation", &[Some(0.5), Some(0.0)]),
                ("temperature_2m", &[Some(22.0), Some(21.5)]),
            ],
        );
        let series = assemble(
            GeoKey::new("Meta", None),
            range,
            &[first, second],
            &[Field::Precipitation, Field::Temperature],
            sample_meta(),
        )
        .unwrap();

        assert_eq!(series.hourly.len(), 3);
        assert_eq!(series.hourly[0].precipitation_mm, Some(1.0));
        assert_eq!(series.hourly[0].temperature_c, None);
        // Second segment fills the hole the first left at 01:00.
        assert_eq!(series.hourly[1].precipitation_mm, Some(0.5));
        assert_eq!(series.hourly[1].temperature_c, Some(22.0));
        assert_eq!(series.hourly[2].precipitation_mm, Some(0.0));
        // Ascending, unique timestamps.
        let stamps: Vec<_> = series.hourly.iter().map(|h| h.timestamp).collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn null_values_stay_absent() {
        let range = DateRange::parse("2025-01-01", "2025-01-01").unwrap();
        let raw = segment(
            &["2025-01-01T00:00"],
            &[("precipitation", &[None]), ("temperature_2m", &[Some(f64::NAN)])],
        );
        let series = assemble(
            GeoKey::new("Meta", None),
            range,
            &[raw],
            &[Field::Precipitation, Field::Temperature],
            sample_meta(),
        )
        .unwrap();
        assert_eq!(series.hourly[0].precipitation_mm, None);
        assert_eq!(series.hourly[0].temperature_c, None);
    }

    #[test]
    fn remerging_with_empty_segment_is_identity() {
        let range = DateRange::parse("2025-01-01", "2025-01-01").unwrap();
        let raw = segment(
            &["2025-01-01T00:00", "2025-01-01T01:00"],
            &[("precipitation", &[Some(1.2), Some(0.0)])],
        );
        let once = assemble(
            GeoKey::new("Meta", None),
            range,
            &[raw.clone()],
            &[Field::Precipitation],
            sample_meta(),
        )
        .unwrap();
        let twice = assemble(
            GeoKey::new("Meta", None),
            range,
            &[raw, RawSegment::default()],
            &[Field::Precipitation],
            sample_meta(),
        )
        .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn timestamps_accept_zone_and_zoneless_forms() {
        assert_eq!(
            parse_hour_timestamp("2025-01-01T05:00").unwrap(),
            parse_hour_timestamp("2025-01-01T05:00:00Z").unwrap()
        );
        assert!(parse_hour_timestamp("yesterday").is_err());
    }
}
