//! The `insights` command: print one of the backend's insights datasets.

use std::path::{Path, PathBuf};

use clap::Args;
use kerbside_core::load_app_config;
use kerbside_feed::{
    decode_rows, zone_stats, FeedOptions, InsightsClient, InsightsDataset, MotorCensusRow,
    ParkingTrend, PopulationGrowth, PopulationRegion, ZoneSegment,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, Args)]
pub struct InsightsArgs {
    /// Dataset: parking-trends, parking-zones, motor-census, population-growth, population-web
    pub dataset: InsightsDataset,
    /// Read the dataset from a saved JSON response instead of the API
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Maximum number of rows to print
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
    /// Print the rows as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the `insights` command.
///
/// # Errors
///
/// Returns an error if config is invalid or the dataset cannot be fetched,
/// read, or decoded.
pub(crate) async fn run_insights(args: &InsightsArgs) -> anyhow::Result<()> {
    let source = Source::open(args.file.as_deref())?;

    match args.dataset {
        InsightsDataset::ParkingTrends => {
            let rows: Vec<ParkingTrend> = source.rows(args.dataset).await?;
            emit(args, &rows, print_parking_trends)
        }
        InsightsDataset::ParkingZones => {
            let rows: Vec<ZoneSegment> = source.rows(args.dataset).await?;
            emit(args, &zone_stats(&rows), |stats| {
                println!("{:<8}{:>10}{:>7}{:>12}", "ZONE", "SEGMENTS", "BAYS", "OCCUPANCY");
                for stat in stats {
                    println!(
                        "{:<8}{:>10}{:>7}{:>12}",
                        stat.zone,
                        stat.segments,
                        stat.bays,
                        percent(stat.occupancy_rate_percent)
                    );
                }
            })
        }
        InsightsDataset::MotorCensus => {
            let rows: Vec<MotorCensusRow> = source.rows(args.dataset).await?;
            emit(args, &rows, print_motor_census)
        }
        InsightsDataset::PopulationGrowth => {
            let rows: Vec<PopulationGrowth> = source.rows(args.dataset).await?;
            emit(args, &rows, print_population_growth)
        }
        InsightsDataset::PopulationWeb => {
            let rows: Vec<PopulationRegion> = source.rows(args.dataset).await?;
            emit(args, &rows, print_population_web)
        }
    }
}

/// Where dataset rows come from: the API, or a file saved from it.
enum Source {
    Api(InsightsClient),
    File(PathBuf),
}

impl Source {
    fn open(file: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = file {
            return Ok(Self::File(path.to_path_buf()));
        }
        let config = load_app_config()?;
        Ok(Self::Api(InsightsClient::new(&FeedOptions::from_app_config(
            &config,
        ))?))
    }

    async fn rows<T: DeserializeOwned>(&self, dataset: InsightsDataset) -> anyhow::Result<Vec<T>> {
        match self {
            Source::Api(client) => Ok(client.fetch_rows(dataset).await?),
            Source::File(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
                let value: serde_json::Value = serde_json::from_str(&text)
                    .map_err(|e| anyhow::anyhow!("{} is not valid JSON: {e}", path.display()))?;
                Ok(decode_rows(value, &path.display().to_string())?)
            }
        }
    }
}

fn emit<T: Serialize>(args: &InsightsArgs, rows: &[T], print: impl Fn(&[T])) -> anyhow::Result<()> {
    let shown = &rows[..rows.len().min(args.limit)];
    if args.json {
        println!("{}", serde_json::to_string_pretty(shown)?);
        return Ok(());
    }
    if shown.is_empty() {
        println!("no rows in {}", args.dataset);
        return Ok(());
    }
    print(shown);
    Ok(())
}

fn print_parking_trends(rows: &[ParkingTrend]) {
    println!(
        "{:<10}{:>10}{:>12}{:>10}{:>12}",
        "YEAR", "PRESENT", "UNOCCUPIED", "SENSORS", "OCCUPANCY"
    );
    for row in rows {
        println!(
            "{:<10}{:>10}{:>12}{:>10}{:>12}",
            text(row.period.as_deref()),
            count(row.present),
            count(row.unoccupied),
            count(row.total_sensors),
            percent(row.occupancy_percent())
        );
    }
}

fn print_motor_census(rows: &[MotorCensusRow]) {
    for row in rows {
        println!("{}", text(row.state.as_deref()));
        for period in row.periods() {
            println!(
                "    {:<11}{:>12} vehicles  attrition {}",
                period.period,
                number(period.vehicles),
                percent(period.attrition_rate)
            );
        }
    }
}

fn print_population_growth(rows: &[PopulationGrowth]) {
    println!(
        "{:<12}{:>12}{:>12}{:>10}{:>9}",
        "PERIOD", "PREVIOUS", "CURRENT", "CHANGE", "RATE"
    );
    for row in rows {
        println!(
            "{:<12}{:>12}{:>12}{:>10}{:>9}",
            text(row.period.as_deref()),
            count(row.previous_population),
            count(row.current_population),
            number(row.growth_absolute),
            percent(row.growth_rate_percent)
        );
    }
}

fn print_population_web(rows: &[PopulationRegion]) {
    for row in rows {
        let series = row.series();
        let span = match (series.first(), series.last()) {
            (Some(first), Some(last)) => format!(
                "{} {} to {} {}",
                first.year,
                number(Some(first.population)),
                last.year,
                number(Some(last.population))
            ),
            _ => "no yearly figures".to_string(),
        };
        println!(
            "{:<32}{:<20}{span}",
            text(row.sa4_name.as_deref()),
            text(row.state_name.as_deref())
        );
    }
}

fn text(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn count(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |n| n.to_string())
}

fn number(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |n| format!("{n:.0}"))
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |n| format!("{n:.1}%"))
}
