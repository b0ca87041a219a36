//! Domain model and display logic for kerbside parking availability.
//!
//! Everything in this crate is synchronous. The pipeline is
//! transform (in `kerbside-feed`) → [`restrictions`] → [`distance`] →
//! [`stabilizer`] → [`category`] filtering.

pub mod app_config;
pub mod category;
pub mod config;
pub mod distance;
pub mod error;
pub mod places;
pub mod restrictions;
pub mod spot;
pub mod stabilizer;

pub use app_config::{AppConfig, Environment};
pub use category::{available_count, filter_counts, FilterCounts, SpotCategory};
pub use config::{load_app_config, load_app_config_from_env};
pub use distance::{
    distance_meters, format_distance, rank, walking_time, Bounds, Coordinate,
};
pub use error::ConfigError;
pub use places::{load_places, Place, PlacesFile};
pub use restrictions::{active_restriction, all_active_today, describe, format_days, format_time};
pub use spot::{ParkingSpot, RankedSpot, Restriction, STATUS_UNOCCUPIED};
pub use stabilizer::{ResultStabilizer, SearchToken};
