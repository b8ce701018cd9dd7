use serde::{Deserialize, Serialize};

/// Impact thresholds driving event detection and insight synthesis.
/// Immutable per computation; callers merge partial overrides over the
/// defaults with [`Thresholds::with_overrides`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Hourly precipitation rate counted as an intensity peak (mm/h).
    pub intensity_mm_hr: f64,
    /// Heavy-rain reference for 3-day accumulations (mm).
    pub rain_3d_mm: f64,
    /// Minimum run of rainless days reported as a dry spell.
    pub dry_spell_days: usize,
    pub thi_bands: ThiBands,
    pub water_balance_bands: WaterBalanceBands,
    pub application_rules: ApplicationRules,
    /// Consecutive admissible hours required for an application window.
    pub window_length_hours: usize,
}

/// Upper band edges for the temperature-humidity index, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThiBands {
    pub comfort: f64,
    pub mild: f64,
    pub moderate: f64,
    pub severe: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterBalanceBands {
    pub deficit: f64,
    pub neutral_low: f64,
    pub neutral_high: f64,
    pub excess: f64,
}

/// Physical limits an hour must satisfy to be safe for chemical or
/// fertilizer application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRules {
    pub wind_min: f64,
    pub wind_max: f64,
    pub rh_min: f64,
    pub rh_max: f64,
    pub temp_max: f64,
    pub rain_prob_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            intensity_mm_hr: 6.0,
            rain_3d_mm: 40.0,
            dry_spell_days: 5,
            thi_bands: ThiBands::default(),
            water_balance_bands: WaterBalanceBands::default(),
            application_rules: ApplicationRules::default(),
            window_length_hours: 3,
        }
    }
}

impl Default for ThiBands {
    fn default() -> Self {
        Self {
            comfort: 68.0,
            mild: 72.0,
            moderate: 79.0,
            severe: 80.0,
        }
    }
}

impl Default for WaterBalanceBands {
    fn default() -> Self {
        Self {
            deficit: -10.0,
            neutral_low: -10.0,
            neutral_high: 10.0,
            excess: 10.0,
        }
    }
}

impl Default for ApplicationRules {
    fn default() -> Self {
        Self {
            wind_min: 1.0,
            wind_max: 4.0,
            rh_min: 40.0,
            rh_max: 85.0,
            temp_max: 30.0,
            rain_prob_max: 0.3,
        }
    }
}

/// Caller-supplied partial overrides. Each present top-level key replaces
/// the default wholesale; nested structs are optional as a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity_mm_hr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain_3d_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_spell_days: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thi_bands: Option<ThiBands>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_balance_bands: Option<WaterBalanceBands>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_rules: Option<ApplicationRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_length_hours: Option<usize>,
}

impl ThresholdOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Thresholds {
    pub fn with_overrides(&self, overrides: &ThresholdOverrides) -> Thresholds {
        Thresholds {
            intensity_mm_hr: overrides.intensity_mm_hr.unwrap_or(self.intensity_mm_hr),
            rain_3d_mm: overrides.rain_3d_mm.unwrap_or(self.rain_3d_mm),
            dry_spell_days: overrides.dry_spell_days.unwrap_or(self.dry_spell_days),
            thi_bands: overrides.thi_bands.unwrap_or(self.thi_bands),
            water_balance_bands: overrides
                .water_balance_bands
                .unwrap_or(self.water_balance_bands),
            application_rules: overrides.application_rules.unwrap_or(self.application_rules),
            window_length_hours: overrides
                .window_length_hours
                .unwrap_or(self.window_length_hours),
        }
    }
}
