//! Great-circle distance, distance/walk-time text, and distance ranking.

use serde::{Deserialize, Serialize};

use crate::spot::{ParkingSpot, RankedSpot};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

const WALKING_SPEED_KMH: f64 = 5.0;

/// Half-width, in degrees, of the box used to pick spots near a search origin.
pub const DEFAULT_NEARBY_RADIUS_DEG: f64 = 0.003;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and within ±90° latitude / ±180° longitude.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Anything with a position on the map.
pub trait Located {
    fn coordinate(&self) -> Coordinate;
}

impl Located for Coordinate {
    fn coordinate(&self) -> Coordinate {
        *self
    }
}

impl Located for ParkingSpot {
    fn coordinate(&self) -> Coordinate {
        ParkingSpot::coordinate(self)
    }
}

impl Located for RankedSpot {
    fn coordinate(&self) -> Coordinate {
        self.spot.coordinate()
    }
}

/// A map viewport. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        (self.south..=self.north).contains(&point.lat) && (self.west..=self.east).contains(&point.lng)
    }
}

/// Haversine distance between two points, rounded to the nearest meter.
#[must_use]
// Bounded by half the Earth's circumference (~20,015 km), well inside u32.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn distance_meters(a: Coordinate, b: Coordinate) -> u32 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    (EARTH_RADIUS_METERS * c).round() as u32
}

/// `"999m"` below one kilometre, `"1.5km"` from there on.
#[must_use]
pub fn format_distance(meters: u32) -> String {
    if meters < 1000 {
        format!("{meters}m")
    } else {
        format!("{:.1}km", f64::from(meters) / 1000.0)
    }
}

/// Walking time at 5 km/h, rounded to the nearest minute.
#[must_use]
pub fn walking_time(meters: u32) -> String {
    let meters_per_second = WALKING_SPEED_KMH * 1000.0 / 3600.0;
    let seconds = f64::from(meters) / meters_per_second;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let minutes = (seconds / 60.0).round() as u64;

    match minutes {
        0 => "< 1 min".to_string(),
        1..=59 => format!("{minutes} min"),
        _ => format!("{}h {}m", minutes / 60, minutes % 60),
    }
}

/// Attaches distance to every spot and sorts ascending by distance.
///
/// The sort is stable, so equidistant spots keep their input order.
/// `original_index` is the position in the returned order and the first
/// entry is flagged `is_closest`.
#[must_use]
pub fn rank(spots: &[ParkingSpot], origin: Coordinate) -> Vec<RankedSpot> {
    let mut ranked: Vec<RankedSpot> = spots
        .iter()
        .map(|spot| {
            let distance = distance_meters(origin, spot.coordinate());
            RankedSpot {
                spot: spot.clone(),
                distance_meters: distance,
                formatted_distance: format_distance(distance),
                original_index: 0,
                is_closest: false,
            }
        })
        .collect();

    ranked.sort_by_key(|r| r.distance_meters);

    for (index, entry) in ranked.iter_mut().enumerate() {
        entry.original_index = index;
        entry.is_closest = index == 0;
    }
    ranked
}

/// Items inside a square of `half_width_deg` around `origin` (exclusive edges).
pub fn near<'a, T: Located>(items: &'a [T], origin: Coordinate, half_width_deg: f64) -> Vec<&'a T> {
    items
        .iter()
        .filter(|item| {
            let c = item.coordinate();
            (c.lat - origin.lat).abs() < half_width_deg && (c.lng - origin.lng).abs() < half_width_deg
        })
        .collect()
}

/// Items whose position falls inside the viewport.
pub fn in_bounds<'a, T: Located>(items: &'a [T], bounds: &Bounds) -> Vec<&'a T> {
    items
        .iter()
        .filter(|item| bounds.contains(item.coordinate()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MELBOURNE_GPO: Coordinate = Coordinate {
        lat: -37.8136,
        lng: 144.9631,
    };

    fn spot(id: &str, lat: f64, lng: f64) -> ParkingSpot {
        ParkingSpot {
            id: id.to_string(),
            status: "Unoccupied".to_string(),
            lat,
            lng,
            zone: None,
            last_updated: None,
            status_timestamp: None,
            restrictions: vec![],
            current_restriction: None,
            primary_rule: String::new(),
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance_meters(MELBOURNE_GPO, MELBOURNE_GPO), 0);
        let origin = Coordinate::new(0.0, 0.0);
        assert_eq!(distance_meters(origin, origin), 0);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (MELBOURNE_GPO, Coordinate::new(-37.8183, 144.9671)),
            (Coordinate::new(40.7128, -74.006), Coordinate::new(34.0522, -118.2437)),
            (Coordinate::new(0.0, 179.9), Coordinate::new(0.0, -179.9)),
        ];
        for (a, b) in pairs {
            assert_eq!(distance_meters(a, b), distance_meters(b, a));
        }
    }

    #[test]
    fn distance_one_degree_of_latitude() {
        // 6_371_000 * pi / 180 = 111_194.9...
        let d = distance_meters(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        assert_eq!(d, 111_195);
    }

    #[test]
    fn distance_new_york_to_los_angeles() {
        let d = distance_meters(
            Coordinate::new(40.7128, -74.006),
            Coordinate::new(34.0522, -118.2437),
        );
        assert!((3_900_000..3_975_000).contains(&d), "got {d}");
    }

    #[test]
    fn format_distance_thresholds() {
        assert_eq!(format_distance(0), "0m");
        assert_eq!(format_distance(999), "999m");
        assert_eq!(format_distance(1000), "1.0km");
        assert_eq!(format_distance(1500), "1.5km");
        assert_eq!(format_distance(12_340), "12.3km");
    }

    #[test]
    fn walking_time_buckets() {
        assert_eq!(walking_time(0), "< 1 min");
        assert_eq!(walking_time(41), "< 1 min");
        assert_eq!(walking_time(84), "1 min");
        assert_eq!(walking_time(417), "5 min");
        assert_eq!(walking_time(4_916), "59 min");
        assert_eq!(walking_time(5_000), "1h 0m");
        assert_eq!(walking_time(7_500), "1h 30m");
    }

    #[test]
    fn rank_sorts_by_distance_and_marks_closest() {
        let spots = vec![
            spot("far", -37.8300, 144.9631),
            spot("here", -37.8136, 144.9631),
            spot("near", -37.8150, 144.9631),
        ];
        let ranked = rank(&spots, MELBOURNE_GPO);
        let ids: Vec<&str> = ranked.iter().map(RankedSpot::id).collect();
        assert_eq!(ids, vec!["here", "near", "far"]);
        assert_eq!(ranked[0].distance_meters, 0);
        assert_eq!(ranked[0].formatted_distance, "0m");
        assert!(ranked[0].is_closest);
        assert!(!ranked[1].is_closest);
        assert_eq!(
            ranked.iter().map(|r| r.original_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn rank_is_a_permutation_with_non_decreasing_distance() {
        let spots: Vec<ParkingSpot> = (0..25)
            .map(|i| {
                let offset = f64::from((i * 7) % 11) * 0.001;
                spot(&i.to_string(), -37.81 + offset, 144.96 - offset)
            })
            .collect();
        let ranked = rank(&spots, MELBOURNE_GPO);

        let mut input_ids: Vec<&str> = spots.iter().map(|s| s.id.as_str()).collect();
        let mut output_ids: Vec<&str> = ranked.iter().map(RankedSpot::id).collect();
        input_ids.sort_unstable();
        output_ids.sort_unstable();
        assert_eq!(input_ids, output_ids);

        assert!(ranked
            .windows(2)
            .all(|w| w[0].distance_meters <= w[1].distance_meters));
    }

    #[test]
    fn rank_breaks_ties_by_input_order() {
        let spots = vec![
            spot("a", -37.8200, 144.9631),
            spot("b", -37.8200, 144.9631),
            spot("c", -37.8200, 144.9631),
        ];
        let ranked = rank(&spots, MELBOURNE_GPO);
        let ids: Vec<&str> = ranked.iter().map(RankedSpot::id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn rank_empty_input() {
        assert!(rank(&[], MELBOURNE_GPO).is_empty());
    }

    #[test]
    fn near_uses_degree_box() {
        let spots = vec![
            spot("inside", -37.8140, 144.9640),
            spot("also-inside", -37.8160, 144.9631),
            spot("outside", -37.8200, 144.9631),
        ];
        let picked = near(&spots, MELBOURNE_GPO, DEFAULT_NEARBY_RADIUS_DEG);
        let ids: Vec<&str> = picked.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["inside", "also-inside"]);
    }

    #[test]
    fn bounds_are_inclusive() {
        let bounds = Bounds {
            south: -37.82,
            west: 144.95,
            north: -37.81,
            east: 144.97,
        };
        assert!(bounds.contains(Coordinate::new(-37.82, 144.95)));
        assert!(bounds.contains(MELBOURNE_GPO));
        assert!(!bounds.contains(Coordinate::new(-37.80, 144.96)));

        let spots = vec![spot("in", -37.815, 144.96), spot("out", -37.9, 144.96)];
        let visible = in_bounds(&spots, &bounds);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "in");
    }

    #[test]
    fn coordinate_validity() {
        assert!(MELBOURNE_GPO.is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::NAN).is_valid());
    }
}
