//! Domain types shared across the poller.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::Error;

// ── Coordinates ───────────────────────────────────────────────────────

/// Fractional digits accepted by the SMHI point API.
pub const COORDINATE_PRECISION: usize = 6;

/// Format a degree value the way the SMHI API expects it: dot separator,
/// at most six fractional digits, trailing zeros trimmed.
pub fn format_degrees(value: f64) -> String {
    let mut text = format!("{:.*}", COORDINATE_PRECISION, value);
    if text.contains('.') {
        let keep = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(keep);
    }
    if text == "-0" {
        text = "0".into();
    }
    text
}

/// A (longitude, latitude) point in degrees.
///
/// Two coordinates are equal when their six-digit API forms are equal, so
/// values differing only past the sixth decimal share a cache slot and a URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coordinate {
    longitude: f64,
    latitude: f64,
}

impl Coordinate {
    pub const ORIGIN: Coordinate = Coordinate {
        longitude: 0.0,
        latitude: 0.0,
    };

    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// True when both axes are exactly zero (the "use home" marker).
    pub fn is_origin(&self) -> bool {
        self.longitude == 0.0 && self.latitude == 0.0
    }

    /// Longitude and latitude in API form.
    pub fn api_form(&self) -> (String, String) {
        (format_degrees(self.longitude), format_degrees(self.latitude))
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.api_form() == other.api_form()
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.api_form().hash(state);
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lon, lat) = self.api_form();
        write!(f, "lon={} lat={}", lon, lat)
    }
}

// ── Item bindings ─────────────────────────────────────────────────────

/// An item configured by the host, bound to one forecast parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemBinding {
    pub item_name: String,
    /// `Coordinate::ORIGIN` means "use the home coordinate".
    pub coordinate: Coordinate,
    /// Lower-cased user parameter name, e.g. `temperature`.
    pub parameter: String,
}

impl ItemBinding {
    pub fn new(item_name: impl Into<String>, coordinate: Coordinate, parameter: &str) -> Self {
        Self {
            item_name: item_name.into(),
            coordinate,
            parameter: parameter.trim().to_lowercase(),
        }
    }

    /// Parse a binding string: `"<lat>:<lon>:<parameter>"` or `"<parameter>"`.
    pub fn parse(item_name: &str, config: &str) -> Result<Self, Error> {
        let config = config.trim();

        if !config.contains(':') {
            if config.is_empty() {
                return Err(Error::Config(format!(
                    "binding for item '{item_name}' is empty"
                )));
            }
            return Ok(Self::new(item_name, Coordinate::ORIGIN, config));
        }

        let parts: Vec<&str> = config.split(':').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(Error::Config(format!(
                "binding for item '{item_name}' must contain three parts <lat>:<lon>:<parameter>, got '{config}'"
            )));
        }

        let latitude = parse_degrees(parts[0], "latitude", item_name)?;
        let longitude = parse_degrees(parts[1], "longitude", item_name)?;
        if parts[2].is_empty() {
            return Err(Error::Config(format!(
                "binding for item '{item_name}' has no parameter"
            )));
        }

        Ok(Self::new(
            item_name,
            Coordinate::new(longitude, latitude),
            parts[2],
        ))
    }
}

fn parse_degrees(raw: &str, axis: &str, item_name: &str) -> Result<f64, Error> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            Error::Config(format!(
                "{axis} '{raw}' for item '{item_name}' is not a number"
            ))
        })
}

// ── Readings ──────────────────────────────────────────────────────────

/// A value published to the host. The variant follows the parameter kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    Integer(i64),
    Real(f64),
}

impl Reading {
    pub fn as_f64(&self) -> f64 {
        match self {
            Reading::Integer(v) => *v as f64,
            Reading::Real(v) => *v,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Reading::Integer(_) => "integer",
            Reading::Real(_) => "real",
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Integer(v) => write!(f, "{}", v),
            Reading::Real(v) => write!(f, "{}", v),
        }
    }
}
