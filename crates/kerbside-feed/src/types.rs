//! Backend response types for the parking bay endpoint.
//!
//! ## Observed shape
//!
//! Each bay record comes from a join of the live sensor table with the zone
//! restrictions table, so every field is at the mercy of upstream data:
//!
//! - `KerbsideID` is numeric in practice but occasionally a string.
//! - `Zone_Number` is a string (`"7301"`) or a number, or `null` for bays
//!   outside a zone.
//! - `Location` is a single `"lat, lng"` string, not two fields.
//! - `Restrictions` is an array when the backend pre-groups rows. It may be
//!   missing, `null`, or some other non-array value.
//! - Restriction times are rendered by the backend's JSON encoder and may lose
//!   zero padding (`"7:30:00"`).
//!
//! Every field is therefore held as a [`serde_json::Value`] and interpreted
//! in [`crate::normalize`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One bay as returned by the backend, with restrictions nested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendBayRecord {
    #[serde(rename = "KerbsideID", default)]
    pub kerbside_id: Value,

    /// Combined `"lat,lng"` string.
    #[serde(rename = "Location", default)]
    pub location: Value,

    /// Sensor status, e.g. `"Unoccupied"` or `"Present"`.
    #[serde(rename = "Status_Description", default)]
    pub status_description: Value,

    #[serde(rename = "Zone_Number", default)]
    pub zone_number: Value,

    #[serde(rename = "Lastupdated", default)]
    pub last_updated: Value,

    #[serde(rename = "Status_Timestamp", default)]
    pub status_timestamp: Value,

    #[serde(rename = "Restrictions", default)]
    pub restrictions: Value,
}

/// One restriction window as the backend spells it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRestriction {
    #[serde(rename = "Days", default)]
    pub days: Value,

    #[serde(rename = "Start_Time", default)]
    pub start_time: Value,

    #[serde(rename = "End_Time", default)]
    pub end_time: Value,

    #[serde(rename = "Rule", default)]
    pub rule: Value,
}

impl RawRestriction {
    /// `true` when every column is null or blank, which is what the outer
    /// join produces for bays without restrictions.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        [&self.days, &self.start_time, &self.end_time, &self.rule]
            .into_iter()
            .all(|v| value_text(v).is_none())
    }

    /// Re-encodes the restriction the way a grouped record nests it.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "Days": self.days,
            "Start_Time": self.start_time,
            "End_Time": self.end_time,
            "Rule": self.rule,
        })
    }
}

/// One row of the un-grouped join: bay columns plus a single restriction's
/// columns flattened alongside.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JoinedBayRow {
    #[serde(flatten)]
    pub bay: BackendBayRecord,

    #[serde(flatten)]
    pub restriction: RawRestriction,
}

/// Reads a loosely-typed JSON scalar as trimmed text.
///
/// Strings are trimmed and kept if non-empty; numbers and booleans are
/// stringified; everything else is `None`.
#[must_use]
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
