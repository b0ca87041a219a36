//! Feed clients for kerbside.
//!
//! Fetches raw bay records and the insights datasets from the parking
//! backend, tolerates its several response shapes, and normalizes bay
//! records into [`kerbside_core::ParkingSpot`].

pub mod cache;
pub mod client;
pub mod envelope;
pub mod error;
pub mod insights;
pub mod normalize;
pub(crate) mod retry;
pub mod rows;
pub mod types;

pub use cache::ResponseCache;
pub use client::{decode_payload, BayFeedClient, FeedOptions, InsightsClient};
pub use error::FeedError;
pub use insights::{
    decode_rows, zone_stats, CensusPeriod, InsightsDataset, MotorCensusRow, ParkingTrend,
    PopulationGrowth, PopulationPoint, PopulationRegion, ZoneSegment, ZoneStat,
};
pub use normalize::{parse_location, transform, transform_all, transform_at};
pub use rows::group_rows;
pub use types::{BackendBayRecord, JoinedBayRow, RawRestriction};
