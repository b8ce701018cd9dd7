use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::logic::events::intensity_peaks;
use crate::logic::metrics::{thi_band, thi_celsius};
use crate::models::{Event, HourlyPoint, Insight, InsightKind, Series, Thresholds};

/// A day counts as wet from this much measured rain (mm).
pub const WET_DAY_MM: f64 = 0.5;

/// Daily rainfall roll-up behind the summary insight.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailySummary {
    /// Days that have at least one hourly record.
    pub days_with_data: usize,
    /// Rain accumulated over wet days (mm).
    pub total_rain_mm: f64,
    /// Days at or above the wet-day cutoff.
    pub wet_days: usize,
    pub max_rain_mm: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rain_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_rain_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_rain_mm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longest_dry: Option<DryRun>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DryRun {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub length_days: usize,
}

/// Bucket the hourly stream per calendar day and track rain totals, the
/// rainiest day (first occurrence wins ties), the most recent wet day,
/// and the longest run of days below the wet-day cutoff.
pub fn summarize_daily(series: &Series) -> DailySummary {
    let mut buckets: std::collections::BTreeMap<NaiveDate, f64> = std::collections::BTreeMap::new();
    for point in &series.hourly {
        let bucket = buckets.entry(point.timestamp.date_naive()).or_insert(0.0);
        if let Some(rain) = point.precipitation_mm {
            *bucket += rain;
        }
    }

    let mut summary = DailySummary {
        days_with_data: buckets.len(),
        ..Default::default()
    };
    let mut dry_len = 0usize;
    let mut dry_start: Option<NaiveDate> = None;

    for (date, rain) in &buckets {
        if *rain >= WET_DAY_MM {
            summary.total_rain_mm += rain;
            summary.wet_days += 1;
            summary.last_rain_date = Some(*date);
            summary.last_rain_mm = Some(*rain);
            if *rain > summary.max_rain_mm {
                summary.max_rain_mm = *rain;
                summary.max_rain_date = Some(*date);
            }
            close_dry_run(&mut summary, dry_start, dry_len);
            dry_len = 0;
            dry_start = None;
        } else {
            dry_len += 1;
            if dry_start.is_none() {
                dry_start = Some(*date);
            }
        }
    }
    close_dry_run(&mut summary, dry_start, dry_len);

    summary
}

fn close_dry_run(summary: &mut DailySummary, start: Option<NaiveDate>, len: usize) {
    let Some(start) = start else { return };
    if len == 0 {
        return;
    }
    let longer = summary
        .longest_dry
        .map_or(true, |longest| len > longest.length_days);
    if longer {
        summary.longest_dry = Some(DryRun {
            from: start,
            to: start + Duration::days(len as i64 - 1),
            length_days: len,
        });
    }
}

/// Calendar day of "tomorrow" as reported by the series: when the
/// timezone tail parses as a ±HH[:MM] offset the UTC day boundary is
/// shifted into that zone, otherwise UTC applies.
fn resolve_tomorrow(timezone: &str, now: DateTime<Utc>) -> NaiveDate {
    let tomorrow_utc = now.date_naive() + Duration::days(1);
    match parse_tz_offset_minutes(timezone) {
        Some(offset_minutes) => {
            let midnight = tomorrow_utc.and_time(NaiveTime::MIN);
            (midnight + Duration::minutes(offset_minutes)).date()
        }
        None => tomorrow_utc,
    }
}

fn parse_tz_offset_minutes(timezone: &str) -> Option<i64> {
    let re = regex_lite::Regex::new(r"([+-]\d{2}):?(\d{2})?$").unwrap();
    let caps = re.captures(timezone)?;
    let hours: i64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: i64 = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some(hours * 60 + hours.signum() * minutes)
}

/// Synthesize insights for a series as of now.
pub fn insights_from_series(series: &Series, thresholds: &Thresholds) -> Vec<Insight> {
    insights_at(series, thresholds, Utc::now())
}

/// Synthesis with an explicit clock. The only clock dependence is the
/// "tomorrow" resolution for the heat-stress category; everything else is
/// a pure function of the series and thresholds.
pub fn insights_at(series: &Series, thresholds: &Thresholds, now: DateTime<Utc>) -> Vec<Insight> {
    let mut insights = Vec::new();

    let daily = summarize_daily(series);
    let range_label = format!(
        "{} - {}",
        format_date(series.range.from),
        format_date(series.range.to)
    );

    if daily.days_with_data > 0 {
        insights.push(daily_summary_insight(&daily, &range_label));
    }

    if let Some(dry) = daily.longest_dry {
        if dry.length_days > 0 && dry.length_days >= thresholds.dry_spell_days {
            insights.push(Insight::new(
                "dry-spell",
                InsightKind::Advice,
                format!(
                    "A dry spell of {} days ran from {} to {}. Consider supplemental \
                     irrigation or protection for sensitive crops.",
                    dry.length_days,
                    format_date(dry.from),
                    format_date(dry.to)
                ),
                json!(dry),
            ));
        }
    }

    let peaks = intensity_peaks(&series.hourly, thresholds.intensity_mm_hr);
    if let Some((at, value)) = highest_peak(&peaks) {
        insights.push(Insight::new(
            "intensity-peaks",
            InsightKind::Event,
            format!(
                "Detected {} episodes with intensity above {:.1} mm/h. The strongest \
                 reached {} mm/h on {}.",
                peaks.len(),
                thresholds.intensity_mm_hr,
                format_mm(value),
                format_date(at.date_naive())
            ),
            json!({ "peaks": peaks }),
        ));
    }

    if let Some(insight) = thi_tomorrow_insight(series, thresholds, now) {
        insights.push(insight);
    }

    insights
}

fn daily_summary_insight(daily: &DailySummary, range_label: &str) -> Insight {
    let rain_sentence = if daily.total_rain_mm > 0.0 {
        format!(
            "Between {}, {} mm accumulated across {} days with measurable rain.",
            range_label,
            format_mm(daily.total_rain_mm),
            daily.wet_days
        )
    } else {
        format!("Between {}, no measurable rain was recorded.", range_label)
    };

    let max_sentence = match daily.max_rain_date {
        Some(date) if daily.max_rain_mm > 0.0 => format!(
            " The rainiest day was {} with {} mm.",
            format_date(date),
            format_mm(daily.max_rain_mm)
        ),
        _ => String::new(),
    };

    let last_sentence = match (daily.last_rain_date, daily.last_rain_mm) {
        (Some(date), Some(rain)) => format!(
            " The last day with rain was {}, when {} mm fell.",
            format_date(date),
            format_mm(rain)
        ),
        _ => String::new(),
    };

    Insight::new(
        "daily-summary",
        InsightKind::Trend,
        format!("{}{}{}", rain_sentence, max_sentence, last_sentence),
        json!({ "daily": daily }),
    )
}

/// First-of-equals highest intensity peak.
fn highest_peak(peaks: &[Event]) -> Option<(DateTime<Utc>, f64)> {
    let mut best: Option<(DateTime<Utc>, f64)> = None;
    for event in peaks {
        if let Event::IntensityPeak { at, value } = event {
            match best {
                Some((_, top)) if *value <= top => {}
                _ => best = Some((*at, *value)),
            }
        }
    }
    best
}

fn thi_tomorrow_insight(
    series: &Series,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> Option<Insight> {
    let tomorrow = resolve_tomorrow(&series.meta.timezone, now);

    let mut candidates: Vec<HourlyPoint> = Vec::new();
    let mut max_thi = f64::NEG_INFINITY;
    for hour in &series.hourly {
        if hour.timestamp.date_naive() != tomorrow {
            continue;
        }
        let (Some(temp), Some(rh)) = (hour.temperature_c, hour.relative_humidity_pct) else {
            continue;
        };
        max_thi = max_thi.max(thi_celsius(temp, rh));
        candidates.push(hour.clone());
    }

    if candidates.is_empty() {
        return None;
    }

    let band = thi_band(max_thi, &thresholds.thi_bands);
    Some(Insight::new(
        "thi-tomorrow",
        InsightKind::Advice,
        format!(
            "Projected maximum THI for tomorrow is {:.1} ({}). Adjust ventilation, \
             shade, or water access if heat stress shows.",
            max_thi, band
        ),
        json!({ "max_thi": max_thi, "band": band, "points": candidates }),
    ))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%b %d").to_string()
}

/// At most one decimal, trailing zero trimmed.
fn format_mm(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if (rounded - rounded.trunc()).abs() < f64::EPSILON {
        format!("{:.0}", rounded)
    } else {
        format!("{:.1}", rounded)
    }
}
