//! Restriction matching and the human-readable text built from restrictions.
//!
//! Matching compares zero-padded `HH:MM:SS` strings directly; lexicographic
//! order on that format is the same as chronological order. Every function
//! here is total: malformed input falls back to `"Unknown"` or is passed
//! through unchanged.

use chrono::{Datelike, Local, NaiveDateTime, Weekday};

use crate::spot::{ParkingSpot, Restriction};

const DAY_START: &str = "00:00:00";
const DAY_END: &str = "23:59:59";
const UNKNOWN: &str = "Unknown";

/// Rule codes used by the City of Melbourne sensor feed.
const RULE_DESCRIPTIONS: &[(&str, &str)] = &[
    ("1P", "1 Hour Parking"),
    ("2P", "2 Hour Parking"),
    ("3P", "3 Hour Parking"),
    ("4P", "4 Hour Parking"),
    ("MP1P", "1 Hour Meter Parking"),
    ("MP2P", "2 Hour Meter Parking"),
    ("MP3P", "3 Hour Meter Parking"),
    ("MP4P", "4 Hour Meter Parking"),
    ("DP1P", "1 Hour Disc Parking"),
    ("DP2P", "2 Hour Disc Parking"),
    ("DP3P", "3 Hour Disc Parking"),
    ("DP4P", "4 Hour Disc Parking"),
    ("LZ15", "15 Minute Loading Zone"),
    ("LZ30", "30 Minute Loading Zone"),
    ("LZ60", "1 Hour Loading Zone"),
    ("NP", "No Parking"),
    ("NS", "No Stopping"),
    ("TP", "Taxi Parking"),
    ("DP", "Disabled Parking"),
    ("MP", "Meter Parking"),
    ("PP", "Permit Parking"),
    ("RZ", "Resident Zone"),
];

const ALL_DAYS: u8 = 0b111_1111;
const WEEKDAYS: u8 = 0b001_1111;
const WEEKEND: u8 = 0b110_0000;

/// Current wall-clock time in the host's local zone.
#[must_use]
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Returns the first restriction in input order that covers `at`.
///
/// A restriction covers `at` when one of its day tokens names the weekday of
/// `at` (case-insensitive, trimmed) and `start_time <= HH:MM:SS <= end_time`.
/// Missing times default to the whole day. Restrictions without days never
/// match.
#[must_use]
pub fn active_restriction(restrictions: &[Restriction], at: NaiveDateTime) -> Option<&Restriction> {
    let weekday = at.weekday();
    let time_of_day = at.format("%H:%M:%S").to_string();

    restrictions.iter().find(|r| {
        if !applies_on(r, weekday) {
            return false;
        }
        let start = non_empty_or(&r.start_time, DAY_START);
        let end = non_empty_or(&r.end_time, DAY_END);
        start <= time_of_day.as_str() && time_of_day.as_str() <= end
    })
}

/// Every restriction whose days include the weekday of `at`, ignoring the
/// time window. Used to list "today's rules" outside the active window.
#[must_use]
pub fn all_active_today(restrictions: &[Restriction], at: NaiveDateTime) -> Vec<&Restriction> {
    let weekday = at.weekday();
    restrictions
        .iter()
        .filter(|r| applies_on(r, weekday))
        .collect()
}

/// Looks up the meaning of a rule code. Unknown codes come back unchanged.
#[must_use]
pub fn describe(rule: &str) -> &str {
    RULE_DESCRIPTIONS
        .iter()
        .find(|(code, _)| *code == rule)
        .map_or(rule, |&(_, meaning)| meaning)
}

/// Collapses a comma-separated day list into display text.
///
/// `"Every day"`, `"Weekdays"` and `"Weekends"` are used when the tokens are
/// exactly that set of distinct days. Anything else becomes a comma-joined
/// list of full day names, unknown tokens kept verbatim.
#[must_use]
pub fn format_days(days: &str) -> String {
    let tokens: Vec<&str> = days
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .collect();
    if tokens.is_empty() {
        return UNKNOWN.to_string();
    }

    if let Some(mask) = day_mask(&tokens) {
        match mask {
            ALL_DAYS => return "Every day".to_string(),
            WEEKDAYS => return "Weekdays".to_string(),
            WEEKEND => return "Weekends".to_string(),
            _ => {}
        }
    }

    tokens
        .iter()
        .map(|&t| match parse_day(t) {
            Some(day) => full_day_name(day),
            None => t,
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Converts `HH:MM[:SS]` to `h:MM AM/PM`. Seconds are dropped.
///
/// Empty input yields `"Unknown"`; anything else that does not parse is
/// returned unchanged.
#[must_use]
pub fn format_time(time: &str) -> String {
    let trimmed = time.trim();
    if trimmed.is_empty() {
        return UNKNOWN.to_string();
    }

    let mut parts = trimmed.split(':');
    let (Some(hours), Some(minutes)) = (parts.next(), parts.next()) else {
        return time.to_string();
    };
    let Ok(hour24) = hours.parse::<u32>() else {
        return time.to_string();
    };
    if hour24 > 23 || minutes.is_empty() || !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return time.to_string();
    }

    let hour12 = match hour24 {
        0 => 12,
        13..=23 => hour24 - 12,
        h => h,
    };
    let meridiem = if hour24 >= 12 { "PM" } else { "AM" };
    format!("{hour12}:{minutes} {meridiem}")
}

/// One-line text for a restriction, e.g.
/// `"2 Hour Meter Parking, Weekdays 7:30 AM to 6:30 PM"`.
#[must_use]
pub fn summarize(restriction: &Restriction) -> String {
    format!(
        "{}, {} {} to {}",
        describe(&restriction.rule),
        format_days(&restriction.days),
        format_time(non_empty_or(&restriction.start_time, DAY_START)),
        format_time(non_empty_or(&restriction.end_time, DAY_END)),
    )
}

/// The restriction a result card leads with: the one cached as current on
/// the spot, otherwise the first that applies on the weekday of `at`.
///
/// `None` is shown as "NO RESTRICTIONS".
#[must_use]
pub fn headline(spot: &ParkingSpot, at: NaiveDateTime) -> Option<&Restriction> {
    spot.current_restriction
        .as_ref()
        .or_else(|| all_active_today(&spot.restrictions, at).into_iter().next())
}

fn applies_on(restriction: &Restriction, weekday: Weekday) -> bool {
    restriction
        .day_tokens()
        .any(|token| parse_day(token) == Some(weekday))
}

/// Accepts `"Mon"`/`"Monday"` in any case.
fn parse_day(token: &str) -> Option<Weekday> {
    token.parse::<Weekday>().ok()
}

/// Bitmask of the named days, or `None` if any token is unknown or repeated.
fn day_mask(tokens: &[&str]) -> Option<u8> {
    let mut mask = 0u8;
    for token in tokens {
        let bit = 1u8 << parse_day(token)?.num_days_from_monday();
        if mask & bit != 0 {
            return None;
        }
        mask |= bit;
    }
    Some(mask)
}

fn full_day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed
    }
}

#[cfg(test)]
#[path = "restrictions_test.rs"]
mod tests;
