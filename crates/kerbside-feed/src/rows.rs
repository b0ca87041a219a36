//! Folding the backend's flat join output into one record per bay.
//!
//! The bays endpoint can return the raw `LEFT JOIN` of sensors against zone
//! restrictions: one row per bay × restriction, with the restriction columns
//! null for bays that have none.

use std::collections::HashMap;

use serde_json::Value;

use crate::types::{value_text, BackendBayRecord, JoinedBayRow};

/// Groups joined rows by `KerbsideID`.
///
/// Bays keep the order in which their first row appears, and restrictions
/// keep row order within a bay. Bay columns come from the first row seen.
/// Rows without an id are passed through as their own record so the
/// normalizer can log and drop them.
#[must_use]
pub fn group_rows(rows: Vec<JoinedBayRow>) -> Vec<BackendBayRecord> {
    let mut records: Vec<(BackendBayRecord, Vec<Value>)> = Vec::new();
    let mut index_by_id: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let JoinedBayRow { bay, restriction } = row;
        let slot = match value_text(&bay.kerbside_id) {
            Some(id) => *index_by_id.entry(id).or_insert_with(|| {
                records.push((bay, Vec::new()));
                records.len() - 1
            }),
            None => {
                records.push((bay, Vec::new()));
                records.len() - 1
            }
        };

        if !restriction.is_blank() {
            records[slot].1.push(restriction.to_value());
        }
    }

    records
        .into_iter()
        .map(|(mut bay, restrictions)| {
            bay.restrictions = Value::Array(restrictions);
            bay
        })
        .collect()
}
