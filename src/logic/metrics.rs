use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::models::ThiBands;

/// Inputs for the FAO-56 daily reference evapotranspiration formula.
/// Radiation values are MJ m⁻² day⁻¹; latitude is in radians.
#[derive(Debug, Clone, Copy)]
pub struct EtoInput {
    pub mean_temp_c: f64,
    pub mean_rh_pct: f64,
    pub wind_speed_2m: f64,
    pub solar_radiation: f64,
    pub altitude_m: f64,
    pub latitude_rad: f64,
    pub day_of_year: u32,
    /// Measured net radiation, when available; otherwise derived from
    /// shortwave and longwave components.
    pub net_radiation: Option<f64>,
    pub soil_heat_flux: Option<f64>,
}

/// FAO-56 Penman-Monteith daily reference evapotranspiration (mm/day).
/// Floored at zero; negative evapotranspiration has no agronomic meaning.
pub fn eto_daily_fao56(input: &EtoInput) -> f64 {
    let t = input.mean_temp_c;
    let pressure = 101.3 * ((293.0 - 0.0065 * input.altitude_m) / 293.0).powf(5.26);
    let gamma = 0.000665 * pressure;
    let es = 0.6108 * ((17.27 * t) / (t + 237.3)).exp();
    let ea = es * (input.mean_rh_pct / 100.0);
    let delta = 4098.0 * es / (t + 237.3).powi(2);
    let g = input.soil_heat_flux.unwrap_or(0.0);

    let doy = f64::from(input.day_of_year);
    let dr = 1.0 + 0.033 * ((2.0 * PI / 365.0) * doy).cos();
    let solar_decl = 0.409 * ((2.0 * PI / 365.0) * doy - 1.39).sin();
    let sunset_angle = (-input.latitude_rad.tan() * solar_decl.tan()).acos();
    let ra = ((24.0 * 60.0) / PI)
        * 0.0820
        * dr
        * (sunset_angle * input.latitude_rad.sin() * solar_decl.sin()
            + input.latitude_rad.cos() * solar_decl.cos() * sunset_angle.sin());
    let rso = (0.75 + 2e-5 * input.altitude_m) * ra;
    let rns = 0.77 * input.solar_radiation;
    let rnl = 4.903e-9
        * (t + 273.16).powi(4)
        * (0.34 - 0.14 * ea.sqrt())
        * (1.35 * (input.solar_radiation / rso.max(1e-6)) - 0.35);
    let rn = input.net_radiation.unwrap_or(rns - rnl);

    let numerator =
        0.408 * delta * (rn - g) + gamma * (900.0 / (t + 273.0)) * input.wind_speed_2m * (es - ea);
    let denominator = delta + gamma * (1.0 + 0.34 * input.wind_speed_2m);
    (numerator / denominator).max(0.0)
}

/// Temperature-humidity index over Celsius inputs: linear in temperature,
/// humidity-weighted.
pub fn thi_celsius(temp_c: f64, rh_pct: f64) -> f64 {
    temp_c - (0.55 - 0.0055 * rh_pct) * (temp_c - 14.5)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThiBand {
    Comfort,
    Mild,
    Moderate,
    Severe,
}

impl ThiBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThiBand::Comfort => "comfort",
            ThiBand::Mild => "mild",
            ThiBand::Moderate => "moderate",
            ThiBand::Severe => "severe",
        }
    }
}

impl std::fmt::Display for ThiBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a THI value against configurable band edges. Upper edges are
/// inclusive.
pub fn thi_band(value: f64, bands: &ThiBands) -> ThiBand {
    if value < bands.comfort {
        ThiBand::Comfort
    } else if value <= bands.mild {
        ThiBand::Mild
    } else if value <= bands.moderate {
        ThiBand::Moderate
    } else {
        ThiBand::Severe
    }
}

/// Precipitation minus evapotranspiration; absent inputs count as zero.
pub fn daily_water_balance(precipitation: Option<f64>, evapotranspiration: Option<f64>) -> f64 {
    precipitation.unwrap_or(0.0) - evapotranspiration.unwrap_or(0.0)
}

/// Windowed sum ending at each index. Indices before the first full
/// window accumulate from the start of the sequence rather than being
/// padded.
pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut acc = 0.0;
    for (i, value) in values.iter().enumerate() {
        acc += value;
        if i >= window {
            acc -= values[i - window];
        }
        out.push(acc);
    }
    out
}
