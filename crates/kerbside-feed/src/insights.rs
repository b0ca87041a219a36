//! Insights datasets published next to the bay feed.
//!
//! ## Observed shape
//!
//! Each endpoint dumps one staging table as an array of row objects, usually
//! inside an API Gateway envelope. Column names follow the source tables
//! (`Total_Sensors`, `occupancy_rate_percent`, `S/T name`) and values come
//! straight from the database driver: numbers may arrive as JSON numbers or
//! as decimal strings, and any column may be `null`. Every field is therefore
//! optional and parsed leniently.
//!
//! Two tables are wide: the motor vehicle census has one `year_YYYY_YYYY`
//! column (plus `_attrition_rate`) per period, and the regional population
//! table has one column per calendar year. Those columns are kept as-is and
//! read through [`MotorCensusRow::periods`] and [`PopulationRegion::series`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::envelope::payload_objects;
use crate::error::FeedError;
use crate::types::value_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsightsDataset {
    ParkingTrends,
    ParkingZones,
    MotorCensus,
    PopulationGrowth,
    PopulationWeb,
}

impl InsightsDataset {
    pub const ALL: [InsightsDataset; 5] = [
        InsightsDataset::ParkingTrends,
        InsightsDataset::ParkingZones,
        InsightsDataset::MotorCensus,
        InsightsDataset::PopulationGrowth,
        InsightsDataset::PopulationWeb,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InsightsDataset::ParkingTrends => "parking-trends",
            InsightsDataset::ParkingZones => "parking-zones",
            InsightsDataset::MotorCensus => "motor-census",
            InsightsDataset::PopulationGrowth => "population-growth",
            InsightsDataset::PopulationWeb => "population-web",
        }
    }

    /// Endpoint path relative to the API base URL.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            InsightsDataset::ParkingTrends => "/parkingtrends",
            InsightsDataset::ParkingZones => "/parkingzones",
            InsightsDataset::MotorCensus => "/motorcensus",
            InsightsDataset::PopulationGrowth => "/populationtrends",
            InsightsDataset::PopulationWeb => "/populationweb",
        }
    }
}

impl fmt::Display for InsightsDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsightsDataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        InsightsDataset::ALL
            .into_iter()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = InsightsDataset::ALL.iter().map(|d| d.as_str()).collect();
                format!("unknown dataset '{s}'; expected one of {}", names.join(", "))
            })
    }
}

/// Yearly sensor occupancy across the city.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParkingTrend {
    #[serde(rename = "Year", default, deserialize_with = "lenient_text")]
    pub period: Option<String>,

    #[serde(rename = "Present", default, deserialize_with = "lenient_count")]
    pub present: Option<u64>,

    #[serde(rename = "Unoccupied", default, deserialize_with = "lenient_count")]
    pub unoccupied: Option<u64>,

    #[serde(rename = "Total_Sensors", default, deserialize_with = "lenient_count")]
    pub total_sensors: Option<u64>,

    /// Either a fraction (`0.62`) or a percentage (`62.0`).
    #[serde(rename = "Occupancy_Rate", default, deserialize_with = "lenient_number")]
    pub occupancy_rate: Option<f64>,
}

impl ParkingTrend {
    /// Occupancy as a percentage. Rates of at most `1.0` are read as fractions.
    #[must_use]
    pub fn occupancy_percent(&self) -> Option<f64> {
        self.occupancy_rate
            .map(|rate| if rate <= 1.0 { rate * 100.0 } else { rate })
    }
}

/// One street segment of a parking zone, joined with one of its bays.
///
/// Segments without sensor bays appear once with `lat`/`lon` null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneSegment {
    #[serde(default, deserialize_with = "lenient_text")]
    pub zone_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub on_street: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub street_from: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub street_to: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub segment_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub occupancy_rate_percent: Option<f64>,

    #[serde(default, deserialize_with = "lenient_count")]
    pub total_readings: Option<u64>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub lat: Option<f64>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub lon: Option<f64>,
}

/// Per-zone rollup of [`ZoneSegment`] rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneStat {
    pub zone: String,
    pub segments: usize,
    pub bays: usize,
    pub occupancy_rate_percent: Option<f64>,
}

/// Groups segment rows by zone, in first-seen order.
///
/// `segments` counts distinct segment ids, `bays` counts rows with a
/// position. Rows without a zone id are ignored.
#[must_use]
pub fn zone_stats(rows: &[ZoneSegment]) -> Vec<ZoneStat> {
    struct Acc<'a> {
        stat: ZoneStat,
        segments: Vec<&'a str>,
    }

    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    let mut zones: Vec<Acc<'_>> = Vec::new();

    for row in rows {
        let Some(zone) = row.zone_id.as_deref() else {
            continue;
        };
        let slot = *index.entry(zone).or_insert_with(|| {
            zones.push(Acc {
                stat: ZoneStat {
                    zone: zone.to_owned(),
                    segments: 0,
                    bays: 0,
                    occupancy_rate_percent: None,
                },
                segments: Vec::new(),
            });
            zones.len() - 1
        });

        let acc = &mut zones[slot];
        if let Some(segment) = row.segment_id.as_deref() {
            if !acc.segments.contains(&segment) {
                acc.segments.push(segment);
            }
        }
        if row.lat.is_some() && row.lon.is_some() {
            acc.stat.bays += 1;
        }
        if acc.stat.occupancy_rate_percent.is_none() {
            acc.stat.occupancy_rate_percent = row.occupancy_rate_percent;
        }
    }

    zones
        .into_iter()
        .map(|mut acc| {
            acc.stat.segments = acc.segments.len();
            acc.stat
        })
        .collect()
}

/// Registered motor vehicles for one state, one column pair per period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotorCensusRow {
    #[serde(default, deserialize_with = "lenient_text")]
    pub census_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub state: Option<String>,

    #[serde(flatten)]
    pub columns: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CensusPeriod {
    /// `"2016-2017"`.
    pub period: String,
    pub vehicles: Option<f64>,
    pub attrition_rate: Option<f64>,
}

impl MotorCensusRow {
    /// Periods found in the `year_*` columns, oldest first.
    #[must_use]
    pub fn periods(&self) -> Vec<CensusPeriod> {
        let mut periods: BTreeMap<String, CensusPeriod> = BTreeMap::new();
        for (column, value) in &self.columns {
            let Some(rest) = column.strip_prefix("year_") else {
                continue;
            };
            let (key, is_rate) = match rest.strip_suffix("_attrition_rate") {
                Some(key) => (key, true),
                None => (rest, false),
            };
            let period = key.replace('_', "-");
            let entry = periods.entry(period.clone()).or_insert(CensusPeriod {
                period,
                vehicles: None,
                attrition_rate: None,
            });
            if is_rate {
                entry.attrition_rate = as_number(value);
            } else {
                entry.vehicles = as_number(value);
            }
        }
        periods.into_values().collect()
    }
}

/// Population change between two census points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationGrowth {
    #[serde(rename = "Period", default, deserialize_with = "lenient_text")]
    pub period: Option<String>,

    #[serde(rename = "Previous_Population", default, deserialize_with = "lenient_count")]
    pub previous_population: Option<u64>,

    #[serde(rename = "Current_Population", default, deserialize_with = "lenient_count")]
    pub current_population: Option<u64>,

    /// Can be negative.
    #[serde(rename = "Growth_Absolute", default, deserialize_with = "lenient_number")]
    pub growth_absolute: Option<f64>,

    #[serde(rename = "Growth_Rate_Percent", default, deserialize_with = "lenient_number")]
    pub growth_rate_percent: Option<f64>,
}

/// Estimated resident population of one SA4 region, one column per year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationRegion {
    #[serde(rename = "S/T code", default, deserialize_with = "lenient_text")]
    pub state_code: Option<String>,

    #[serde(rename = "S/T name", default, deserialize_with = "lenient_text")]
    pub state_name: Option<String>,

    #[serde(rename = "GCCSA code", default, deserialize_with = "lenient_text")]
    pub gccsa_code: Option<String>,

    #[serde(rename = "GCCSA name", default, deserialize_with = "lenient_text")]
    pub gccsa_name: Option<String>,

    #[serde(rename = "SA4 code", default, deserialize_with = "lenient_text")]
    pub sa4_code: Option<String>,

    #[serde(rename = "SA4 name", default, deserialize_with = "lenient_text")]
    pub sa4_name: Option<String>,

    #[serde(flatten)]
    pub columns: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopulationPoint {
    pub year: i32,
    pub population: f64,
}

impl PopulationRegion {
    /// Yearly figures, oldest first. Years with no usable value are skipped.
    #[must_use]
    pub fn series(&self) -> Vec<PopulationPoint> {
        let mut points: Vec<PopulationPoint> = self
            .columns
            .iter()
            .filter_map(|(column, value)| {
                let year = column.trim().parse::<i32>().ok()?;
                Some(PopulationPoint {
                    year,
                    population: as_number(value)?,
                })
            })
            .collect();
        points.sort_by_key(|p| p.year);
        points
    }
}

/// Decodes an insights response into typed rows.
///
/// # Errors
///
/// See [`payload_objects`]; additionally [`FeedError::Deserialize`] if a row
/// cannot be read as `T`.
pub fn decode_rows<T: DeserializeOwned>(value: Value, url: &str) -> Result<Vec<T>, FeedError> {
    payload_objects(value, url)?
        .into_iter()
        .map(serde_json::from_value::<T>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| FeedError::Deserialize {
            context: format!("insights rows from {url}"),
            source: e,
        })
}

/// Reads a JSON number or a numeric string, ignoring thousands separators.
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(value_text(&Value::deserialize(d)?))
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(as_number(&Value::deserialize(d)?))
}

fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
#[path = "insights_test.rs"]
mod tests;
