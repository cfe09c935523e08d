//! SMHI point-forecast payload: wire model, decoding and "current" selection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::Error;
use serde::Deserialize;

// ── SMHI response types ───────────────────────────────────────────────

/// Response from `/api/category/pmp2g/version/2/geotype/point/lon/{lon}/lat/{lat}/data.json`.
#[derive(Debug, Deserialize)]
pub struct PointForecastResponse {
    #[serde(rename = "approvedTime", default)]
    pub approved_time: Option<String>,
    #[serde(rename = "referenceTime", default)]
    pub reference_time: Option<String>,
    #[serde(rename = "timeSeries")]
    pub time_series: Vec<TimeSeriesEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TimeSeriesEntry {
    #[serde(rename = "validTime")]
    pub valid_time: DateTime<Utc>,
    pub parameters: Vec<RawParameter>,
}

#[derive(Debug, Deserialize)]
pub struct RawParameter {
    pub name: String,
    pub values: Vec<f64>,
}

// ── Decoded model ─────────────────────────────────────────────────────

/// Parameter readings for one valid time, keyed by wire name.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSnapshot {
    valid_time: DateTime<Utc>,
    values: HashMap<String, f64>,
}

impl ParameterSnapshot {
    pub fn new(valid_time: DateTime<Utc>, values: HashMap<String, f64>) -> Self {
        Self { valid_time, values }
    }

    pub fn valid_time(&self) -> DateTime<Utc> {
        self.valid_time
    }

    /// First value of the named wire parameter.
    pub fn value(&self, wire_name: &str) -> Option<f64> {
        self.values.get(wire_name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn from_entry(entry: TimeSeriesEntry) -> Self {
        let mut values = HashMap::with_capacity(entry.parameters.len());
        for parameter in entry.parameters {
            match parameter.values.first() {
                Some(first) => {
                    values.insert(parameter.name, *first);
                }
                // Last occurrence wins, even when it has no values.
                None => {
                    values.remove(&parameter.name);
                }
            }
        }
        Self {
            valid_time: entry.valid_time,
            values,
        }
    }
}

/// A decoded forecast: non-empty and ordered by valid time.
#[derive(Debug, Clone)]
pub struct Forecast {
    pub approved_time: Option<DateTime<Utc>>,
    pub reference_time: Option<DateTime<Utc>>,
    snapshots: Vec<ParameterSnapshot>,
}

impl Forecast {
    /// Build a forecast from snapshots, stably ordering them by valid time.
    pub fn new(
        approved_time: Option<DateTime<Utc>>,
        reference_time: Option<DateTime<Utc>>,
        mut snapshots: Vec<ParameterSnapshot>,
    ) -> Result<Self, Error> {
        if snapshots.is_empty() {
            return Err(Error::Decode("timeSeries is empty".into()));
        }
        snapshots.sort_by_key(|s| s.valid_time);
        Ok(Self {
            approved_time,
            reference_time,
            snapshots,
        })
    }

    pub fn snapshots(&self) -> &[ParameterSnapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// The snapshot describing "now": leading entries strictly before `now`
    /// are dropped while at least two remain, then the first is taken.
    pub fn current(&self, now: DateTime<Utc>) -> &ParameterSnapshot {
        &self.snapshots[current_index(&self.snapshots, now)]
    }

    pub fn into_current(mut self, now: DateTime<Utc>) -> ParameterSnapshot {
        let index = current_index(&self.snapshots, now);
        self.snapshots.swap_remove(index)
    }
}

fn current_index(snapshots: &[ParameterSnapshot], now: DateTime<Utc>) -> usize {
    let mut index = 0;
    while index + 1 < snapshots.len() && snapshots[index].valid_time < now {
        index += 1;
    }
    index
}

/// Decode a JSON body into a [`Forecast`].
pub fn decode(body: &[u8]) -> Result<Forecast, Error> {
    let response: PointForecastResponse =
        serde_json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))?;

    let snapshots = response
        .time_series
        .into_iter()
        .map(ParameterSnapshot::from_entry)
        .collect();

    Forecast::new(
        parse_optional_time(response.approved_time.as_deref()),
        parse_optional_time(response.reference_time.as_deref()),
        snapshots,
    )
}

fn parse_optional_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}
