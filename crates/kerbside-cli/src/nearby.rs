//! The `nearby` command: fetch, rank, stabilize, filter, print.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use clap::Args;
use kerbside_core::distance::{near, DEFAULT_NEARBY_RADIUS_DEG};
use kerbside_core::restrictions::{headline, now_local, summarize};
use kerbside_core::{
    available_count, load_app_config, load_places, walking_time, Coordinate, FilterCounts,
    ParkingSpot, RankedSpot, ResultStabilizer, SpotCategory,
};
use kerbside_feed::{decode_payload, transform_all, BayFeedClient, FeedOptions};

const DEFAULT_PLACES_PATH: &str = "./config/places.yaml";

#[derive(Debug, Args)]
pub struct NearbyArgs {
    /// Latitude of the search origin
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,
    /// Longitude of the search origin
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,
    /// Saved place (name or alias) to search from
    #[arg(long, conflicts_with_all = ["lat", "lng"])]
    pub place: Option<String>,
    /// YAML file of saved places
    #[arg(long)]
    pub places_file: Option<PathBuf>,
    /// Parking type: all, no-restrictions, 1p, 2p, 3p
    #[arg(long, default_value = "all")]
    pub filter: SpotCategory,
    /// Maximum number of bays to print
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
    /// Read bay records from a JSON file instead of the API
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Only list bays whose sensor reports them unoccupied
    #[arg(long)]
    pub available_only: bool,
    /// Evaluate restrictions at this local time (YYYY-MM-DD HH:MM:SS)
    #[arg(long, value_parser = parse_at)]
    pub at: Option<NaiveDateTime>,
    /// Half-width of the search box around the origin, in degrees
    #[arg(long)]
    pub radius: Option<f64>,
    /// Print the visible bays as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the `nearby` command.
///
/// Loads app config only when bays come from the API; with `--file` the
/// command works offline using built-in defaults.
///
/// # Errors
///
/// Returns an error if config is invalid, the feed or file cannot be read,
/// or the saved place cannot be found.
pub(crate) async fn run_nearby(args: &NearbyArgs) -> anyhow::Result<()> {
    let at = args.at.unwrap_or_else(now_local);
    let (spots, config) = match &args.file {
        Some(path) => (load_spots_from_file(path, at)?, None),
        None => {
            let config = load_app_config()?;
            let client = BayFeedClient::new(&FeedOptions::from_app_config(&config))?;
            (client.fetch_spots(at).await?, Some(config))
        }
    };

    let places_path = args
        .places_file
        .clone()
        .or_else(|| config.as_ref().map(|c| c.places_path.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PLACES_PATH));
    let radius = args
        .radius
        .or_else(|| config.as_ref().map(|c| c.nearby_radius_deg))
        .unwrap_or(DEFAULT_NEARBY_RADIUS_DEG);
    if !radius.is_finite() || radius <= 0.0 {
        anyhow::bail!("--radius must be a positive number of degrees, got {radius}");
    }

    let origin = resolve_origin(args, &places_path)?;

    let mut spots: Vec<ParkingSpot> = match &origin {
        Some((coordinate, _)) => near(&spots, *coordinate, radius)
            .into_iter()
            .cloned()
            .collect(),
        None => spots,
    };
    if args.available_only {
        spots.retain(ParkingSpot::is_available);
    }

    let mut stabilizer = ResultStabilizer::new();
    stabilizer.begin_search();
    stabilizer.compute_order(&spots, origin.as_ref().map(|(c, _)| *c));
    stabilizer.select_filter(args.filter);

    let visible: Vec<&RankedSpot> = stabilizer.visible().into_iter().take(args.limit).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }

    let origin_label = origin.as_ref().map(|(_, label)| label.as_str());
    println!("{}", render_header(&spots, origin_label));
    println!(
        "{}",
        render_counts(&stabilizer.filter_counts(), stabilizer.active_filter())
    );

    if visible.is_empty() {
        println!("no parking bays match");
        return Ok(());
    }
    for ranked in visible {
        println!();
        println!("{}", render_card(ranked, at));
    }

    Ok(())
}

/// Origin coordinate plus the label to print for it.
fn resolve_origin(
    args: &NearbyArgs,
    places_path: &Path,
) -> anyhow::Result<Option<(Coordinate, String)>> {
    if let (Some(lat), Some(lng)) = (args.lat, args.lng) {
        let coordinate = Coordinate::new(lat, lng);
        if !coordinate.is_valid() {
            anyhow::bail!("coordinates out of range: {lat}, {lng}");
        }
        return Ok(Some((coordinate, format!("{lat}, {lng}"))));
    }

    let Some(query) = args.place.as_deref() else {
        return Ok(None);
    };
    let places = load_places(places_path)?;
    let place = places.find(query).ok_or_else(|| {
        anyhow::anyhow!(
            "no saved place matches '{query}' in {}",
            places_path.display()
        )
    })?;
    tracing::debug!(query, place = %place.name, "resolved saved place");
    Ok(Some((place.coordinate(), place.name.clone())))
}

fn load_spots_from_file(path: &Path, at: NaiveDateTime) -> anyhow::Result<Vec<ParkingSpot>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("{} is not valid JSON: {e}", path.display()))?;
    let records = decode_payload(value, &path.display().to_string())?;
    Ok(transform_all(records, at))
}

fn parse_at(raw: &str) -> Result<NaiveDateTime, String> {
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DD HH:MM:SS, got '{raw}'"))
}

fn render_header(spots: &[ParkingSpot], origin: Option<&str>) -> String {
    let available = available_count(spots);
    match origin {
        Some(label) => format!(
            "{} bays near {label} ({available} available)",
            spots.len()
        ),
        None => format!("{} bays ({available} available)", spots.len()),
    }
}

/// Filter chips with counts; the active one is bracketed.
fn render_counts(counts: &FilterCounts, active: SpotCategory) -> String {
    SpotCategory::ALL
        .into_iter()
        .map(|category| {
            let chip = format!("{} {}", category.label(), counts.get(category));
            if category == active {
                format!("[{chip}]")
            } else {
                chip
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn render_card(ranked: &RankedSpot, at: NaiveDateTime) -> String {
    let spot = &ranked.spot;
    let marker = if ranked.is_closest { "* " } else { "  " };

    let mut first = format!("{marker}{}  {}", spot.id, spot.status);
    if !ranked.formatted_distance.is_empty() {
        first.push_str(&format!(
            "  {}  ({} walk)",
            ranked.formatted_distance,
            walking_time(ranked.distance_meters)
        ));
    }

    let rule = headline(spot, at).map_or_else(|| "NO RESTRICTIONS".to_string(), summarize);
    let zone = spot.zone.as_deref().unwrap_or("-");

    format!(
        "{first}\n    {rule}\n    zone {zone}  {}",
        spot.directions_url()
    )
}
