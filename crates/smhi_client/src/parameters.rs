//! Parameter registry: user parameter names, SMHI wire keys and value kinds.

use common::{Error, Reading};

use crate::forecast::ParameterSnapshot;

/// How a parameter's raw value is presented to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Real,
    /// Truncated toward zero.
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub user_name: &'static str,
    pub wire_name: &'static str,
    pub kind: ValueKind,
}

const fn param(user_name: &'static str, wire_name: &'static str, kind: ValueKind) -> ParameterDescriptor {
    ParameterDescriptor {
        user_name,
        wire_name,
        kind,
    }
}

/// Every parameter an item may bind to. `froozen_precipitation` keeps its
/// historical spelling so existing item files keep working.
pub const PARAMETERS: [ParameterDescriptor; 18] = [
    param("temperature", "t", ValueKind::Real),
    param("probability_thunderstorm", "tstm", ValueKind::Integer),
    param("pressure", "msl", ValueKind::Real),
    param("visibility", "vis", ValueKind::Real),
    param("wind_direction", "wd", ValueKind::Integer),
    param("wind_velocity", "ws", ValueKind::Real),
    param("gust", "gust", ValueKind::Real),
    param("humidity", "r", ValueKind::Integer),
    param("total_cloud_cover", "tcc_mean", ValueKind::Integer),
    param("high_cloud_cover", "hcc_mean", ValueKind::Integer),
    param("medium_cloud_cover", "mcc_mean", ValueKind::Integer),
    param("low_cloud_cover", "lcc_mean", ValueKind::Integer),
    param("max_precipitation", "pmax", ValueKind::Real),
    param("min_precipitation", "pmin", ValueKind::Real),
    param("froozen_precipitation", "spp", ValueKind::Real),
    param("precipitation_category", "pcat", ValueKind::Integer),
    param("mean_precipitation", "pmean", ValueKind::Real),
    param("median_precipitation", "pmedian", ValueKind::Real),
];

/// Look up a descriptor by user parameter name.
pub fn descriptor(user_name: &str) -> Option<&'static ParameterDescriptor> {
    PARAMETERS.iter().find(|p| p.user_name == user_name)
}

pub fn wire_of(user_name: &str) -> Option<&'static str> {
    descriptor(user_name).map(|p| p.wire_name)
}

pub fn kind_of(user_name: &str) -> Option<ValueKind> {
    descriptor(user_name).map(|p| p.kind)
}

impl ParameterDescriptor {
    /// Pull this parameter's first value out of a snapshot, coerced to the
    /// descriptor's kind.
    pub fn extract(&self, snapshot: &ParameterSnapshot) -> Result<Reading, Error> {
        let raw = snapshot
            .value(self.wire_name)
            .ok_or_else(|| Error::MissingWireKey {
                wire: self.wire_name.to_string(),
                valid_time: snapshot.valid_time().to_rfc3339(),
            })?;

        Ok(match self.kind {
            ValueKind::Real => Reading::Real(raw),
            ValueKind::Integer => Reading::Integer(raw.trunc() as i64),
        })
    }
}

/// Resolve and extract in one step, for callers holding only a user name.
pub fn extract(user_name: &str, snapshot: &ParameterSnapshot) -> Result<Reading, Error> {
    descriptor(user_name)
        .ok_or_else(|| Error::UnknownParameter(user_name.to_string()))?
        .extract(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn snapshot(values: &[(&str, f64)]) -> ParameterSnapshot {
        let map: HashMap<String, f64> = values.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        ParameterSnapshot::new(Utc.with_ymd_and_hms(2016, 1, 21, 15, 0, 0).unwrap(), map)
    }

    #[test]
    fn test_registry_lookups() {
        assert_eq!(wire_of("temperature"), Some("t"));
        assert_eq!(wire_of("froozen_precipitation"), Some("spp"));
        assert_eq!(wire_of("frozen_precipitation"), None);
        assert_eq!(kind_of("humidity"), Some(ValueKind::Integer));
        assert_eq!(kind_of("pressure"), Some(ValueKind::Real));
        assert_eq!(kind_of("dewpoint"), None);
    }

    #[test]
    fn test_registry_names_are_unique() {
        for (i, a) in PARAMETERS.iter().enumerate() {
            for b in &PARAMETERS[i + 1..] {
                assert_ne!(a.user_name, b.user_name);
                assert_ne!(a.wire_name, b.wire_name);
            }
        }
    }

    #[test]
    fn test_integer_kind_truncates_toward_zero() {
        let snap = snapshot(&[("r", 92.7), ("wd", -3.9)]);
        assert_eq!(extract("humidity", &snap).unwrap(), Reading::Integer(92));
        assert_eq!(extract("wind_direction", &snap).unwrap(), Reading::Integer(-3));
    }

    #[test]
    fn test_real_kind_keeps_value() {
        let snap = snapshot(&[("t", -4.2), ("spp", -9.0)]);
        assert_eq!(extract("temperature", &snap).unwrap(), Reading::Real(-4.2));
        assert_eq!(
            extract("froozen_precipitation", &snap).unwrap(),
            Reading::Real(-9.0)
        );
    }

    #[test]
    fn test_extract_errors() {
        let snap = snapshot(&[("t", 1.0)]);
        assert!(matches!(
            extract("dewpoint", &snap),
            Err(Error::UnknownParameter(_))
        ));
        assert!(matches!(
            extract("pressure", &snap),
            Err(Error::MissingWireKey { .. })
        ));
    }
}
