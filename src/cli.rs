use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "agromet", version, about = "Agrometeorological analytics CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config.yaml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and print the assembled hourly series as JSON
    Series {
        /// Range start (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Range end (YYYY-MM-DD)
        #[arg(long)]
        to: String,
        /// Comma-separated fields (prcp,prcp_rate,temp,rh,wind,rs,pressure)
        #[arg(long)]
        fields: Option<String>,
    },
    /// Print synthesized insights for the range
    Insights {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// JSON threshold overrides merged over the defaults
        #[arg(long)]
        thresholds: Option<String>,
    },
    /// Print the smoothed daily trend for a range or preset
    Trend {
        #[arg(long, conflicts_with = "preset", requires = "to")]
        from: Option<String>,
        #[arg(long, requires = "from")]
        to: Option<String>,
        /// Canned range: three-months, one-year, five-years, future
        #[arg(long)]
        preset: Option<String>,
        /// Smoothing kind: ma or ema
        #[arg(long, default_value = "ema")]
        smoothing: String,
        /// Daily metric: accumulated or intensity
        #[arg(long, default_value = "accumulated")]
        metric: String,
    },
    /// Print application windows found in the range
    Windows {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Consecutive admissible hours required (defaults to the
        /// configured window length)
        #[arg(long)]
        hours: Option<usize>,
    },
    /// Validate config and test provider connectivity
    Check,
}
