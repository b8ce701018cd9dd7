use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AgrometError, Result};
use crate::models::{GeoKey, ThresholdOverrides};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub location: LocationConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Approximate coordinates used when geocoding stays unavailable,
    /// keyed by normalized region/locality name.
    #[serde(default)]
    pub fallback_coords: Vec<FallbackEntry>,
    #[serde(default)]
    pub thresholds: ThresholdOverrides,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocationConfig {
    pub region: String,
    #[serde(default)]
    pub locality: Option<String>,
    /// Reported in series metadata when geocoding cannot supply a zone.
    #[serde(default)]
    pub timezone: Option<String>,
    /// Representative coordinates for the region when neither geocoding
    /// nor the fallback table resolves.
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl LocationConfig {
    pub fn geo_key(&self) -> GeoKey {
        GeoKey::new(self.region.clone(), self.locality.clone())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_archive_url")]
    pub archive_url: String,
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    /// Restrict geocoding matches to one country.
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_archive_url() -> String {
    "https://archive-api.open-meteo.com/v1/archive".into()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".into()
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".into()
}

fn default_language() -> String {
    "en".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            archive_url: default_archive_url(),
            forecast_url: default_forecast_url(),
            geocoding_url: default_geocoding_url(),
            country_code: None,
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FallbackEntry {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
}

impl Config {
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => p,
            None => Self::find_config_path()?,
        };

        if !config_path.exists() {
            return Err(AgrometError::Config(format!(
                "Config file not found at {:?}. Copy config/config.yaml.example to get started.",
                config_path
            )));
        }

        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| AgrometError::Config(format!("Failed to read config: {}", e)))?;

        // Substitute environment variables
        let config_str = Self::substitute_env_vars(&config_str);

        let config: Config = serde_yaml::from_str(&config_str)
            .map_err(|e| AgrometError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Search for config.yaml in standard locations.
    /// Returns the path of the first found config, or the XDG default path if none found.
    fn find_config_path() -> Result<PathBuf> {
        // Try current directory first
        let local_config = PathBuf::from("config/config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        // Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("agromet").join("config.yaml");
            if xdg_config.exists() {
                return Ok(xdg_config);
            }
        }

        // Return XDG path as the default (will trigger "not found" in load)
        let default_path = dirs::config_dir()
            .ok_or_else(|| AgrometError::Config("Cannot determine config directory".into()))?
            .join("agromet")
            .join("config.yaml");
        Ok(default_path)
    }

    fn substitute_env_vars(content: &str) -> String {
        let mut result = content.to_string();

        // Find all ${VAR_NAME} patterns and substitute
        let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        result
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: LocationConfig {
                region: "Meta".into(),
                locality: Some("Villavicencio".into()),
                timezone: Some("America/Bogota".into()),
                lat: Some(4.142),
                lon: Some(-73.6266),
            },
            provider: ProviderConfig::default(),
            fallback_coords: Vec::new(),
            thresholds: ThresholdOverrides::default(),
        }
    }
}
