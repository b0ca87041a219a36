//! Normalization from raw backend records to [`kerbside_core::ParkingSpot`].
//!
//! This is the only place that knows the backend's column names. A record
//! that cannot yield an id and a valid coordinate is dropped with a warning;
//! every other defect is replaced with a safe default so one bad row never
//! hides the rest of the feed.

use chrono::NaiveDateTime;
use kerbside_core::restrictions::{active_restriction, now_local};
use kerbside_core::{ParkingSpot, Restriction};
use serde_json::Value;

use crate::types::{value_text, BackendBayRecord, RawRestriction};

const UNKNOWN_STATUS: &str = "Unknown";

/// Parses a combined `"lat,lng"` string.
///
/// Returns `None` unless there are exactly two comma-separated parts and
/// both parse as finite numbers. Whitespace around either part is ignored.
#[must_use]
pub fn parse_location(location: &str) -> Option<(f64, f64)> {
    let mut parts = location.split(',');
    let (Some(lat), Some(lng), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    let lat = lat.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    let lng = lng.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some((lat, lng))
}

/// Transforms one record using the current local time to resolve the
/// active restriction.
#[must_use]
pub fn transform(raw: BackendBayRecord) -> Option<ParkingSpot> {
    transform_at(raw, now_local())
}

/// Transforms one record, resolving the active restriction at `at`.
///
/// Returns `None` (and logs why) when the record has no id or its location
/// is missing or malformed.
#[must_use]
pub fn transform_at(raw: BackendBayRecord, at: NaiveDateTime) -> Option<ParkingSpot> {
    let Some(id) = value_text(&raw.kerbside_id) else {
        tracing::warn!(location = %raw.location, reason = "missing KerbsideID", "dropping bay record");
        return None;
    };

    let Some((lat, lng)) = raw.location.as_str().and_then(parse_location) else {
        tracing::warn!(
            kerbside_id = %id,
            location = %raw.location,
            reason = "location is not a \"lat,lng\" pair",
            "dropping bay record"
        );
        return None;
    };

    let restrictions = normalize_restrictions(&raw.restrictions);
    let current_restriction = active_restriction(&restrictions, at).cloned();
    let primary_rule = current_restriction
        .as_ref()
        .or_else(|| restrictions.first())
        .map(|r| r.rule.clone())
        .unwrap_or_default();

    Some(ParkingSpot {
        id,
        status: value_text(&raw.status_description).unwrap_or_else(|| UNKNOWN_STATUS.to_owned()),
        lat,
        lng,
        zone: value_text(&raw.zone_number),
        last_updated: value_text(&raw.last_updated),
        status_timestamp: value_text(&raw.status_timestamp),
        restrictions,
        current_restriction,
        primary_rule,
    })
}

/// Transforms a whole feed, dropping records that fail [`transform_at`].
pub fn transform_all<I>(records: I, at: NaiveDateTime) -> Vec<ParkingSpot>
where
    I: IntoIterator<Item = BackendBayRecord>,
{
    let mut received = 0usize;
    let spots: Vec<ParkingSpot> = records
        .into_iter()
        .inspect(|_| received += 1)
        .filter_map(|raw| transform_at(raw, at))
        .collect();

    let dropped = received - spots.len();
    if dropped > 0 {
        tracing::warn!(received, kept = spots.len(), dropped, "bay feed had unusable records");
    } else {
        tracing::debug!(received, "bay feed normalized");
    }
    spots
}

/// Anything other than an array yields no restrictions. Elements that are
/// not objects, or whose columns are all blank, are skipped.
fn normalize_restrictions(value: &Value) -> Vec<Restriction> {
    let Value::Array(items) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| serde_json::from_value::<RawRestriction>(item.clone()).ok())
        .filter(|raw| !raw.is_blank())
        .map(|raw| normalize_restriction(&raw))
        .collect()
}

pub(crate) fn normalize_restriction(raw: &RawRestriction) -> Restriction {
    Restriction {
        days: value_text(&raw.days).unwrap_or_default(),
        start_time: value_text(&raw.start_time)
            .map(|t| normalize_clock(&t))
            .unwrap_or_default(),
        end_time: value_text(&raw.end_time)
            .map(|t| normalize_clock(&t))
            .unwrap_or_default(),
        rule: value_text(&raw.rule).unwrap_or_default(),
    }
}

/// Rewrites `H:MM[:SS]` as `HH:MM:SS`. Anything else is returned unchanged.
pub(crate) fn normalize_clock(time: &str) -> String {
    let parts: Vec<&str> = time.split(':').collect();
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m] => (*h, *m, "00"),
        [h, m, s] => (*h, *m, *s),
        _ => return time.to_owned(),
    };
    let well_formed = (1..=2).contains(&hours.len())
        && minutes.len() == 2
        && seconds.len() == 2
        && [hours, minutes, seconds].into_iter().all(all_digits);
    if !well_formed {
        return time.to_owned();
    }

    format!("{hours:0>2}:{minutes}:{seconds}")
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
