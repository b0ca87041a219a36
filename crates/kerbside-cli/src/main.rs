mod insights;
mod nearby;

use clap::{Parser, Subcommand};
use kerbside_core::{describe, format_days, format_distance, format_time, walking_time};
use tracing_subscriber::EnvFilter;

use crate::insights::InsightsArgs;
use crate::nearby::NearbyArgs;

#[derive(Debug, Parser)]
#[command(name = "kerbside")]
#[command(about = "Find free on-street parking near a place")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List parking bays near a location, closest first
    Nearby(NearbyArgs),
    /// Print an insights dataset (occupancy trends, zones, census, population)
    Insights(InsightsArgs),
    /// Explain a restriction rule code (e.g. MP2P)
    Rule {
        /// Rule code as it appears in the feed
        code: String,
    },
    /// Format a comma-separated day list (e.g. Mon,Tue,Wed,Thu,Fri)
    Days {
        /// Day tokens, comma-separated
        days: String,
    },
    /// Format an `HH:MM:SS` time as 12-hour clock time
    Time {
        /// Time of day, e.g. 18:30:00
        time: String,
    },
    /// Format a distance in meters with its walking time
    Distance {
        /// Whole meters
        meters: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_level = std::env::var("KERBSIDE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Nearby(args) => nearby::run_nearby(&args).await?,
        Commands::Insights(args) => insights::run_insights(&args).await?,
        Commands::Rule { code } => println!("{}", describe(code.trim())),
        Commands::Days { days } => println!("{}", format_days(&days)),
        Commands::Time { time } => println!("{}", format_time(&time)),
        Commands::Distance { meters } => {
            println!("{} ({} walk)", format_distance(meters), walking_time(meters));
        }
    }

    Ok(())
}
