//! Parking-type buckets used by the result filter chips.

use serde::{Deserialize, Serialize};

use crate::spot::{ParkingSpot, RankedSpot};

/// Filter selection for result lists.
///
/// `All` doubles as the catch-all bucket: a spot whose rule code is not
/// recognised is only visible under the `All` filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpotCategory {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "no-restrictions")]
    NoRestrictions,
    #[serde(rename = "1p")]
    OneHour,
    #[serde(rename = "2p")]
    TwoHour,
    #[serde(rename = "3p")]
    ThreeHour,
}

/// Substring markers checked in order against the lower-cased rule code.
const RULE_MARKERS: &[(&str, SpotCategory)] = &[
    ("1p", SpotCategory::OneHour),
    ("2p", SpotCategory::TwoHour),
    ("3p", SpotCategory::ThreeHour),
];

impl SpotCategory {
    pub const ALL: [SpotCategory; 5] = [
        SpotCategory::All,
        SpotCategory::NoRestrictions,
        SpotCategory::OneHour,
        SpotCategory::TwoHour,
        SpotCategory::ThreeHour,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SpotCategory::All => "all",
            SpotCategory::NoRestrictions => "no-restrictions",
            SpotCategory::OneHour => "1p",
            SpotCategory::TwoHour => "2p",
            SpotCategory::ThreeHour => "3p",
        }
    }

    /// Chip label as shown in the filter bar.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SpotCategory::All => "All",
            SpotCategory::NoRestrictions => "No Limits",
            SpotCategory::OneHour => "1P",
            SpotCategory::TwoHour => "2P",
            SpotCategory::ThreeHour => "3P",
        }
    }

    /// Bucket for a spot, derived from its primary restriction's rule code.
    #[must_use]
    pub fn of(spot: &ParkingSpot) -> SpotCategory {
        let Some(primary) = spot.primary_restriction() else {
            return SpotCategory::NoRestrictions;
        };
        if primary.rule.trim().is_empty() {
            return SpotCategory::NoRestrictions;
        }

        let rule = primary.rule.to_lowercase();
        RULE_MARKERS
            .iter()
            .find(|(marker, _)| rule.contains(marker))
            .map_or(SpotCategory::All, |&(_, category)| category)
    }

    /// Selecting the active filter again goes back to `All`.
    #[must_use]
    pub fn toggle(self, clicked: SpotCategory) -> SpotCategory {
        if self == clicked {
            SpotCategory::All
        } else {
            clicked
        }
    }

    /// Whether a spot shows up under this filter.
    #[must_use]
    pub fn admits(self, spot: &ParkingSpot) -> bool {
        self == SpotCategory::All || SpotCategory::of(spot) == self
    }
}

impl std::fmt::Display for SpotCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SpotCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SpotCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                format!("unknown category '{s}'; expected one of all, no-restrictions, 1p, 2p, 3p")
            })
    }
}

/// Keeps the order of `order` and drops spots outside `category`.
#[must_use]
pub fn apply_filter(order: &[RankedSpot], category: SpotCategory) -> Vec<&RankedSpot> {
    order
        .iter()
        .filter(|ranked| category.admits(&ranked.spot))
        .collect()
}

/// Chip counts for the filter bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCounts {
    pub all: usize,
    pub no_restrictions: usize,
    pub one_hour: usize,
    pub two_hour: usize,
    pub three_hour: usize,
}

impl FilterCounts {
    #[must_use]
    pub fn get(&self, category: SpotCategory) -> usize {
        match category {
            SpotCategory::All => self.all,
            SpotCategory::NoRestrictions => self.no_restrictions,
            SpotCategory::OneHour => self.one_hour,
            SpotCategory::TwoHour => self.two_hour,
            SpotCategory::ThreeHour => self.three_hour,
        }
    }
}

/// `all` is the total; catch-all spots are counted nowhere else.
pub fn filter_counts<'a, I>(spots: I) -> FilterCounts
where
    I: IntoIterator<Item = &'a ParkingSpot>,
{
    let mut counts = FilterCounts::default();
    for spot in spots {
        counts.all += 1;
        match SpotCategory::of(spot) {
            SpotCategory::All => {}
            SpotCategory::NoRestrictions => counts.no_restrictions += 1,
            SpotCategory::OneHour => counts.one_hour += 1,
            SpotCategory::TwoHour => counts.two_hour += 1,
            SpotCategory::ThreeHour => counts.three_hour += 1,
        }
    }
    counts
}

/// Number of spots reporting `Unoccupied`.
pub fn available_count<'a, I>(spots: I) -> usize
where
    I: IntoIterator<Item = &'a ParkingSpot>,
{
    spots.into_iter().filter(|s| s.is_available()).count()
}
