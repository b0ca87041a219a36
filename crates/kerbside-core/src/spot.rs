use serde::{Deserialize, Serialize};

use crate::distance::Coordinate;

/// The only status string that counts as "free to park" anywhere in the
/// pipeline. Every other value, known or not, is treated as unavailable.
pub const STATUS_UNOCCUPIED: &str = "Unoccupied";

/// One time-windowed parking rule attached to a bay.
///
/// Fields are kept as the backend sends them. An empty `days` string means
/// the restriction never applies; empty times fall back to the whole day when
/// matching (see [`crate::restrictions::active_restriction`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    /// Comma-separated weekday tokens, e.g. `"Mon,Tue,Wed,Thu,Fri"`.
    pub days: String,
    /// Zero-padded `HH:MM:SS`.
    pub start_time: String,
    /// Zero-padded `HH:MM:SS`, inclusive.
    pub end_time: String,
    /// Short rule code such as `"2P"` or `"MP4P"`.
    pub rule: String,
}

impl Restriction {
    /// Trimmed, non-empty day tokens in their original order.
    pub fn day_tokens(&self) -> impl Iterator<Item = &str> {
        self.days.split(',').map(str::trim).filter(|d| !d.is_empty())
    }

    #[must_use]
    pub fn has_days(&self) -> bool {
        self.day_tokens().next().is_some()
    }
}

/// A physical bay, normalized from one backend record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingSpot {
    /// Kerbside sensor ID, stringified.
    pub id: String,
    /// `"Unoccupied"`, `"Present"`, or whatever else the sensor reports.
    pub status: String,
    pub lat: f64,
    pub lng: f64,
    pub zone: Option<String>,
    pub last_updated: Option<String>,
    pub status_timestamp: Option<String>,
    /// May be empty; "no restrictions" is a real state.
    pub restrictions: Vec<Restriction>,
    /// Restriction active when the spot was built. Not recomputed afterwards.
    pub current_restriction: Option<Restriction>,
    /// Rule of the current restriction, else of the first restriction, else empty.
    pub primary_rule: String,
}

impl ParkingSpot {
    #[must_use]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lng: self.lng,
        }
    }

    /// Returns `true` only for the `Unoccupied` status.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == STATUS_UNOCCUPIED
    }

    /// The restriction used for categorisation: current, else first listed.
    #[must_use]
    pub fn primary_restriction(&self) -> Option<&Restriction> {
        self.current_restriction
            .as_ref()
            .or_else(|| self.restrictions.first())
    }

    /// Google Maps walking/driving directions to this bay.
    #[must_use]
    pub fn directions_url(&self) -> String {
        format!(
            "https://www.google.com/maps/dir/?api=1&destination={},{}",
            self.lat, self.lng
        )
    }
}

/// A spot placed in a result list, with its distance from the search origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSpot {
    #[serde(flatten)]
    pub spot: ParkingSpot,
    /// Whole meters from the origin; `0` when no origin is set.
    pub distance_meters: u32,
    /// `"350m"`, `"1.2km"`, or empty when no origin is set.
    pub formatted_distance: String,
    /// Position in the locked order.
    pub original_index: usize,
    /// Set on the nearest spot when ranked against an origin.
    pub is_closest: bool,
}

impl RankedSpot {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.spot.id
    }
}
