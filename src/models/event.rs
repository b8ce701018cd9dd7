use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A detected pattern in the hourly stream. Pure data; consumers match
/// exhaustively on the variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// Maximal run of consecutive rainless days, as indices into the
    /// scanned day sequence.
    DrySpell {
        from_day: usize,
        to_day: usize,
        length_days: usize,
    },
    /// One hour whose precipitation rate met the intensity threshold.
    IntensityPeak { at: DateTime<Utc>, value: f64 },
    /// Contiguous block of hours meeting the application rules.
    ApplicationWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}
