use crate::models::{ApplicationRules, Event, HourlyPoint};

/// Scan day-indexed wet flags (1 = wet day) for maximal runs of dry days
/// with length >= `min_length_days`. A run still open at the end of the
/// sequence is evaluated at its current length. Every qualifying run
/// emits its own event.
pub fn dry_spells(daily_wet_flags: &[u8], min_length_days: usize) -> Vec<Event> {
    let mut events = Vec::new();
    let mut open = false;
    let mut len = 0usize;

    for (i, flag) in daily_wet_flags.iter().enumerate() {
        if *flag == 0 {
            open = true;
            len += 1;
        } else if len > 0 {
            if len >= min_length_days {
                events.push(Event::DrySpell {
                    from_day: i - len,
                    to_day: i - 1,
                    length_days: len,
                });
            }
            open = false;
            len = 0;
        }
    }

    if open && len >= min_length_days {
        let total = daily_wet_flags.len();
        events.push(Event::DrySpell {
            from_day: total - len,
            to_day: total - 1,
            length_days: len,
        });
    }

    events
}

/// Every hour whose precipitation rate meets the threshold, reported
/// individually in stream order. Adjacent qualifying hours are not
/// merged; an absent rate never exceeds.
pub fn intensity_peaks(hourly: &[HourlyPoint], threshold_mm_hr: f64) -> Vec<Event> {
    hourly
        .iter()
        .filter_map(|hour| {
            let rate = hour.precipitation_rate_mm_h?;
            (rate >= threshold_mm_hr).then_some(Event::IntensityPeak {
                at: hour.timestamp,
                value: rate,
            })
        })
        .collect()
}

/// Scan left to right for non-overlapping blocks of `window_length`
/// consecutive admissible hours. After an emitted window the scan jumps
/// past it; after a failed attempt it advances a single hour, even when
/// the failing hour sat deep inside the attempt.
pub fn application_windows(
    hourly: &[HourlyPoint],
    rules: &ApplicationRules,
    window_length: usize,
) -> Vec<Event> {
    let mut events = Vec::new();
    if window_length == 0 {
        return events;
    }

    let mut i = 0;
    while i + window_length <= hourly.len() {
        let attempt = &hourly[i..i + window_length];
        if attempt.iter().all(|hour| admissible(hour, rules)) {
            events.push(Event::ApplicationWindow {
                start: attempt[0].timestamp,
                end: attempt[window_length - 1].timestamp,
            });
            i += window_length;
        } else {
            i += 1;
        }
    }

    events
}

/// An hour is admissible when every present field stays inside the
/// configured limits and no measured rain fell. Missing fields pass
/// vacuously.
fn admissible(hour: &HourlyPoint, rules: &ApplicationRules) -> bool {
    if let Some(prob) = hour.rain_probability {
        if prob > rules.rain_prob_max {
            return false;
        }
    }
    if let Some(rain) = hour.precipitation_mm {
        if rain > 0.0 {
            return false;
        }
    }
    if let Some(wind) = hour.wind_speed_m_s {
        if wind < rules.wind_min || wind > rules.wind_max {
            return false;
        }
    }
    if let Some(rh) = hour.relative_humidity_pct {
        if rh < rules.rh_min || rh > rules.rh_max {
            return false;
        }
    }
    if let Some(temp) = hour.temperature_c {
        if temp > rules.temp_max {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn hour(stamp: &str) -> HourlyPoint {
        HourlyPoint::new(stamp.parse::<DateTime<Utc>>().unwrap())
    }

    fn admissible_hour(stamp: &str) -> HourlyPoint {
        let mut h = hour(stamp);
        h.precipitation_mm = Some(0.0);
        h.wind_speed_m_s = Some(2.0);
        h.relative_humidity_pct = Some(60.0);
        h.temperature_c = Some(24.0);
        h
    }

    fn stamps(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("2025-01-01T{:02}:00:00Z", i))
            .collect()
    }

    #[test]
    fn dry_spells_detects_qualifying_runs() {
        let events = dry_spells(&[0, 0, 1, 0, 0, 0, 1], 2);
        assert_eq!(
            events,
            vec![
                Event::DrySpell {
                    from_day: 0,
                    to_day: 1,
                    length_days: 2
                },
                Event::DrySpell {
                    from_day: 3,
                    to_day: 5,
                    length_days: 3
                },
            ]
        );
    }

    #[test]
    fn dry_spells_ignores_short_runs() {
        assert!(dry_spells(&[0, 1, 0, 0], 3).is_empty());
    }

    #[test]
    fn dry_spells_counts_trailing_open_run() {
        let events = dry_spells(&[1, 0, 0, 0], 3);
        assert_eq!(
            events,
            vec![Event::DrySpell {
                from_day: 1,
                to_day: 3,
                length_days: 3
            }]
        );
    }

    #[test]
    fn intensity_peaks_reports_each_qualifying_hour() {
        let rates = [Some(2.0), Some(6.0), Some(8.0)];
        let hourly: Vec<HourlyPoint> = stamps(3)
            .iter()
            .zip(rates)
            .map(|(stamp, rate)| {
                let mut h = hour(stamp);
                h.precipitation_rate_mm_h = rate;
                h
            })
            .collect();

        let events = intensity_peaks(&hourly, 5.0);
        assert_eq!(
            events,
            vec![
                Event::IntensityPeak {
                    at: hourly[1].timestamp,
                    value: 6.0
                },
                Event::IntensityPeak {
                    at: hourly[2].timestamp,
                    value: 8.0
                },
            ]
        );
    }

    #[test]
    fn intensity_peaks_skips_absent_rates() {
        let mut h = hour("2025-01-01T00:00:00Z");
        h.precipitation_mm = Some(9.0);
        assert!(intensity_peaks(&[h], 0.0).is_empty());
    }

    #[test]
    fn application_window_emitted_before_violating_hour() {
        let mut hourly: Vec<HourlyPoint> =
            stamps(6).iter().map(|s| admissible_hour(s)).collect();
        hourly[4].wind_speed_m_s = Some(5.0);

        let events = application_windows(&hourly, &ApplicationRules::default(), 3);
        assert_eq!(
            events,
            vec![Event::ApplicationWindow {
                start: hourly[0].timestamp,
                end: hourly[2].timestamp,
            }]
        );
    }

    #[test]
    fn failed_attempt_advances_one_hour() {
        let mut hourly: Vec<HourlyPoint> =
            stamps(4).iter().map(|s| admissible_hour(s)).collect();
        hourly[1].relative_humidity_pct = Some(90.0);

        let events = application_windows(&hourly, &ApplicationRules::default(), 2);
        assert_eq!(
            events,
            vec![Event::ApplicationWindow {
                start: hourly[2].timestamp,
                end: hourly[3].timestamp,
            }]
        );
    }

    #[test]
    fn missing_fields_pass_vacuously_except_rain() {
        let bare: Vec<HourlyPoint> = stamps(3).iter().map(|s| hour(s)).collect();
        let events = application_windows(&bare, &ApplicationRules::default(), 3);
        assert_eq!(events.len(), 1);

        let mut rainy: Vec<HourlyPoint> = stamps(3).iter().map(|s| hour(s)).collect();
        rainy[1].precipitation_mm = Some(0.6);
        assert!(application_windows(&rainy, &ApplicationRules::default(), 3).is_empty());
    }

    #[test]
    fn rain_probability_checked_when_present() {
        let mut hourly: Vec<HourlyPoint> =
            stamps(2).iter().map(|s| admissible_hour(s)).collect();
        hourly[0].rain_probability = Some(0.9);
        assert!(application_windows(&hourly, &ApplicationRules::default(), 2).is_empty());
        hourly[0].rain_probability = Some(0.2);
        assert_eq!(
            application_windows(&hourly, &ApplicationRules::default(), 2).len(),
            1
        );
    }
}
