//! Keeps a result list from reshuffling while live status updates arrive.
//!
//! The first computation for a search locks the order. Later calls with the
//! same search token, the same origin and the same spot ids (counted with
//! multiplicity) return the locked order, with each entry's spot data
//! refreshed in place so status changes still show. A new search, a
//! different origin, or a change in which spots are present recomputes and
//! relocks. An empty input ends the session.

use std::collections::{HashMap, VecDeque};

use crate::category::{apply_filter, filter_counts, FilterCounts, SpotCategory};
use crate::distance::{rank, Coordinate};
use crate::spot::{ParkingSpot, RankedSpot};

/// Identifies one search session. Issued by [`ResultStabilizer::begin_search`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SearchToken(u64);

impl SearchToken {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct LockedOrder {
    token: SearchToken,
    origin: Option<Coordinate>,
    ids: HashMap<String, usize>,
    order: Vec<RankedSpot>,
    closest_id: Option<String>,
}

impl LockedOrder {
    fn matches(&self, token: SearchToken, origin: Option<Coordinate>, spots: &[ParkingSpot]) -> bool {
        if self.token != token || self.origin != origin || self.order.is_empty() {
            return false;
        }
        if spots.len() != self.order.len() {
            return false;
        }
        let incoming = id_counts(spots);
        incoming.len() == self.ids.len()
            && incoming.iter().all(|(id, n)| self.ids.get(*id) == Some(n))
    }

    /// Swaps in the latest data for each spot without touching positions.
    ///
    /// Repeated ids are paired by occurrence: the k-th locked entry for an id,
    /// in original input order, takes the k-th incoming spot with that id.
    fn refresh(&mut self, spots: &[ParkingSpot]) {
        let mut latest: HashMap<&str, VecDeque<&ParkingSpot>> = HashMap::new();
        for spot in spots {
            latest.entry(spot.id.as_str()).or_default().push_back(spot);
        }

        let mut slots: Vec<usize> = (0..self.order.len()).collect();
        slots.sort_by_key(|&i| self.order[i].original_index);
        for i in slots {
            let entry = &mut self.order[i];
            if let Some(fresh) = latest
                .get_mut(entry.spot.id.as_str())
                .and_then(VecDeque::pop_front)
            {
                entry.spot = fresh.clone();
            }
        }
    }
}

fn id_counts(spots: &[ParkingSpot]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for spot in spots {
        *counts.entry(spot.id.as_str()).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Default)]
pub struct ResultStabilizer {
    token: SearchToken,
    locked: Option<LockedOrder>,
    active_filter: SpotCategory,
}

impl ResultStabilizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new search session and drops any locked order.
    pub fn begin_search(&mut self) -> SearchToken {
        self.token = SearchToken(self.token.0 + 1);
        self.locked = None;
        self.token
    }

    #[must_use]
    pub fn search_token(&self) -> SearchToken {
        self.token
    }

    /// Returns the display order for `spots`, locking it on first use.
    ///
    /// Without an origin every spot gets distance `0`, an empty formatted
    /// distance, and keeps its input position. With an origin the spots are
    /// ranked by distance and the nearest one becomes the closest spot.
    pub fn compute_order(
        &mut self,
        spots: &[ParkingSpot],
        origin: Option<Coordinate>,
    ) -> &[RankedSpot] {
        if spots.is_empty() {
            self.reset();
            return &[];
        }

        let token = self.token;
        let reusable = self
            .locked
            .as_ref()
            .is_some_and(|locked| locked.matches(token, origin, spots));

        if reusable {
            if let Some(locked) = self.locked.as_mut() {
                locked.refresh(spots);
            }
        } else {
            self.lock(spots, origin);
        }

        self.locked_order()
    }

    fn lock(&mut self, spots: &[ParkingSpot], origin: Option<Coordinate>) {
        let order: Vec<RankedSpot> = match origin {
            Some(origin) => rank(spots, origin),
            None => spots
                .iter()
                .enumerate()
                .map(|(index, spot)| RankedSpot {
                    spot: spot.clone(),
                    distance_meters: 0,
                    formatted_distance: String::new(),
                    original_index: index,
                    is_closest: false,
                })
                .collect(),
        };
        let closest_id = origin
            .and(order.first())
            .map(|nearest| nearest.spot.id.clone());

        tracing::debug!(
            token = self.token.0,
            spots = order.len(),
            has_origin = origin.is_some(),
            closest = closest_id.as_deref().unwrap_or("-"),
            "locked result order"
        );

        self.locked = Some(LockedOrder {
            token: self.token,
            origin,
            ids: id_counts(spots)
                .into_iter()
                .map(|(id, n)| (id.to_owned(), n))
                .collect(),
            order,
            closest_id,
        });
    }

    /// Ends the session: forgets the locked order and resets the filter.
    pub fn reset(&mut self) {
        if self.locked.take().is_some() {
            tracing::debug!(token = self.token.0, "result session reset");
        }
        self.active_filter = SpotCategory::All;
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.is_some()
    }

    #[must_use]
    pub fn locked_order(&self) -> &[RankedSpot] {
        self.locked.as_ref().map_or(&[], |l| l.order.as_slice())
    }

    /// Id of the nearest spot, only when the order was ranked from an origin.
    #[must_use]
    pub fn closest_id(&self) -> Option<&str> {
        self.locked.as_ref()?.closest_id.as_deref()
    }

    #[must_use]
    pub fn active_filter(&self) -> SpotCategory {
        self.active_filter
    }

    /// Applies a filter chip click. Clicking the active chip again selects `All`.
    pub fn select_filter(&mut self, clicked: SpotCategory) -> SpotCategory {
        self.active_filter = self.active_filter.toggle(clicked);
        self.active_filter
    }

    /// The locked order narrowed to the active filter.
    #[must_use]
    pub fn visible(&self) -> Vec<&RankedSpot> {
        apply_filter(self.locked_order(), self.active_filter)
    }

    /// Chip counts over the whole locked order.
    #[must_use]
    pub fn filter_counts(&self) -> FilterCounts {
        filter_counts(self.locked_order().iter().map(|r| &r.spot))
    }
}

#[cfg(test)]
#[path = "stabilizer_test.rs"]
mod tests;
