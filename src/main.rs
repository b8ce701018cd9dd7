mod cli;
mod config;
mod datasources;
mod error;
mod logic;
mod models;

use chrono::{Duration, Utc};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::Config;
use datasources::{Geocoder, OpenMeteoClient, ResolvedCoords};
use error::{AgrometError, Result};
use logic::{assembler, events, insights, trend};
use models::{DateRange, Series, ThresholdOverrides, Thresholds};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match Config::load(cli.config.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Series { from, to, fields } => run_series(&config, &from, &to, fields).await,
        Commands::Insights {
            from,
            to,
            thresholds,
        } => run_insights(&config, &from, &to, thresholds).await,
        Commands::Trend {
            from,
            to,
            preset,
            smoothing,
            metric,
        } => run_trend(&config, from, to, preset, &smoothing, &metric).await,
        Commands::Windows { from, to, hours } => run_windows(&config, &from, &to, hours).await,
        Commands::Check => run_check(&config).await,
    }
}

async fn fetch_series(
    config: &Config,
    range: DateRange,
    fields: &[assembler::Field],
) -> Result<(Series, ResolvedCoords)> {
    let key = config.location.geo_key();
    let geocoder = Geocoder::new(config.clone());
    let coords = geocoder.resolve(&key).await;
    let client = OpenMeteoClient::new(config.provider.clone());
    let series = client.hourly_series(&key, range, fields, &coords).await?;
    Ok((series, coords))
}

async fn run_series(
    config: &Config,
    from: &str,
    to: &str,
    fields: Option<String>,
) -> Result<()> {
    let range = DateRange::parse(from, to)?;
    let fields = match fields {
        Some(list) => {
            let names: Vec<String> = list.split(',').map(|s| s.trim().to_string()).collect();
            assembler::parse_fields(&names)?
        }
        None => assembler::ALL_FIELDS.to_vec(),
    };

    let (series, _) = fetch_series(config, range, &fields).await?;
    println!("{}", serde_json::to_string_pretty(&series)?);
    Ok(())
}

async fn run_insights(
    config: &Config,
    from: &str,
    to: &str,
    overrides: Option<String>,
) -> Result<()> {
    let range = DateRange::parse(from, to)?;

    let mut thresholds = Thresholds::default().with_overrides(&config.thresholds);
    if let Some(raw) = overrides {
        let parsed: ThresholdOverrides = serde_json::from_str(&raw)?;
        thresholds = thresholds.with_overrides(&parsed);
    }

    let (series, _) = fetch_series(config, range, &assembler::ALL_FIELDS).await?;
    let insights = insights::insights_from_series(&series, &thresholds);
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "series_meta": series.meta,
            "insights": insights,
        }))?
    );
    Ok(())
}

async fn run_trend(
    config: &Config,
    from: Option<String>,
    to: Option<String>,
    preset: Option<String>,
    smoothing: &str,
    metric: &str,
) -> Result<()> {
    let smoothing = trend::Smoothing::from_name(smoothing)
        .ok_or_else(|| AgrometError::InvalidData(format!("unknown smoothing '{}'", smoothing)))?;
    let metric = trend::TrendMetric::from_name(metric)
        .ok_or_else(|| AgrometError::InvalidData(format!("unknown metric '{}'", metric)))?;

    let today = Utc::now().date_naive();
    let (range, preset) = match (preset, from, to) {
        (Some(name), _, _) => {
            let preset = trend::RangePreset::from_name(&name).ok_or_else(|| {
                AgrometError::InvalidData(format!("unknown preset '{}'", name))
            })?;
            let range = if preset.is_future() {
                DateRange::new(today, today + Duration::days(preset.days()))
            } else {
                DateRange::new(today - Duration::days(preset.days()), today)
            };
            (range, Some(preset))
        }
        (None, Some(from), Some(to)) => (DateRange::parse(&from, &to)?, None),
        _ => {
            return Err(AgrometError::InvalidRange(
                "either --preset or both --from and --to are required".into(),
            ))
        }
    };

    let fields = [
        assembler::Field::Precipitation,
        assembler::Field::PrecipitationRate,
    ];
    let (series, _) = fetch_series(config, range, &fields).await?;

    let daily = trend::aggregate_daily(&series, metric);
    let points = trend::compute_trend(&daily, &range, preset, smoothing, today);
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "range": range,
            "daily": daily,
            "trend": points,
        }))?
    );
    Ok(())
}

async fn run_windows(
    config: &Config,
    from: &str,
    to: &str,
    hours: Option<usize>,
) -> Result<()> {
    let range = DateRange::parse(from, to)?;
    let thresholds = Thresholds::default().with_overrides(&config.thresholds);
    let window_length = hours.unwrap_or(thresholds.window_length_hours);

    let fields = [
        assembler::Field::Precipitation,
        assembler::Field::WindSpeed,
        assembler::Field::RelativeHumidity,
        assembler::Field::Temperature,
    ];
    let (series, _) = fetch_series(config, range, &fields).await?;

    let windows = events::application_windows(
        &series.hourly,
        &thresholds.application_rules,
        window_length,
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "range": range,
            "window_length_hours": window_length,
            "windows": windows,
        }))?
    );
    Ok(())
}

async fn run_check(config: &Config) -> Result<()> {
    let key = config.location.geo_key();
    let geocoder = Geocoder::new(config.clone());
    let coords = geocoder.resolve(&key).await;
    println!(
        "Location '{}' resolved to ({:.4}, {:.4})",
        key.query(),
        coords.lat,
        coords.lon
    );

    let client = OpenMeteoClient::new(config.provider.clone());
    let status = if client.test_connection(&coords).await.unwrap_or(false) {
        "Forecast API: OK"
    } else {
        "Forecast API: OFFLINE"
    };
    println!("{}", status);
    Ok(())
}
