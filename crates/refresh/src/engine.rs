//! Refresh engine: one cycle over all item bindings.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use common::{Coordinate, Error, ItemBinding};
use smhi_client::{parameters, ForecastSource};
use tracing::{debug, error, info, warn};

use crate::cache::CycleCache;
use crate::host::Host;

/// Ten minutes.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 600_000;

pub const CONFIG_KEY_LATITUDE: &str = "home.latitude";
pub const CONFIG_KEY_LONGITUDE: &str = "home.longitude";
pub const CONFIG_KEY_REFRESH: &str = "refresh";

/// What happened during one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Items old enough to be refreshed.
    pub due: usize,
    /// Items skipped because they were refreshed less than one interval ago.
    pub fresh: usize,
    /// Forecast fetches issued.
    pub fetches: usize,
    pub published: usize,
    /// Due items with no publish (unknown parameter or missing value).
    pub skipped: usize,
}

/// Drives refresh cycles against a forecast source.
///
/// Configuration and cycles both take `&mut self`, so they can never
/// interleave.
pub struct RefreshEngine<S> {
    source: S,
    home: Coordinate,
    refresh_interval_ms: u64,
    last_update: HashMap<String, DateTime<Utc>>,
    warned_unknown: HashSet<(String, String)>,
}

impl<S: ForecastSource> RefreshEngine<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            home: Coordinate::ORIGIN,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            last_update: HashMap::new(),
            warned_unknown: HashSet::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn home(&self) -> Coordinate {
        self.home
    }

    pub fn refresh_interval_ms(&self) -> u64 {
        self.refresh_interval_ms
    }

    /// When the item was last refreshed, if ever.
    pub fn last_update(&self, item_name: &str) -> Option<DateTime<Utc>> {
        self.last_update.get(item_name).copied()
    }

    /// Apply host properties (`home.latitude`, `home.longitude`, `refresh`).
    ///
    /// The home coordinate changes only when both axes are given. Blank
    /// values keep the current setting. Any unparseable value fails the whole
    /// call and nothing is applied.
    pub fn configure(&mut self, properties: &BTreeMap<String, String>) -> Result<(), Error> {
        let latitude = parse_property::<f64>(properties, CONFIG_KEY_LATITUDE)?;
        let longitude = parse_property::<f64>(properties, CONFIG_KEY_LONGITUDE)?;
        let refresh = parse_property::<u64>(properties, CONFIG_KEY_REFRESH)?;

        if let Some(refresh) = refresh {
            if refresh == 0 {
                return Err(Error::Config(format!("{CONFIG_KEY_REFRESH} must be > 0")));
            }
            if interval_delta(refresh).is_none() {
                return Err(Error::Config(format!(
                    "{CONFIG_KEY_REFRESH} of {refresh}ms is out of range"
                )));
            }
        }
        for (key, value) in [(CONFIG_KEY_LATITUDE, latitude), (CONFIG_KEY_LONGITUDE, longitude)] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(Error::Config(format!("{key} must be a finite number")));
            }
        }

        if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
            self.home = Coordinate::new(longitude, latitude);
            info!("Home coordinate set to {}", self.home);
        } else if latitude.is_some() || longitude.is_some() {
            warn!(
                "Both {} and {} are needed to change the home coordinate; keeping {}",
                CONFIG_KEY_LATITUDE, CONFIG_KEY_LONGITUDE, self.home
            );
        }

        if let Some(refresh) = refresh {
            self.refresh_interval_ms = refresh;
            info!("Refresh interval set to {}ms", refresh);
        }

        Ok(())
    }

    /// The coordinate actually queried for a binding.
    pub fn effective_coordinate(&self, binding: &ItemBinding) -> Coordinate {
        if binding.coordinate.is_origin() {
            self.home
        } else {
            binding.coordinate
        }
    }

    /// Run one cycle as of `now`.
    ///
    /// A failed fetch aborts the rest of the cycle and is returned; items not
    /// yet processed keep their timestamps and are retried next cycle.
    pub async fn run_cycle_at<H: Host + ?Sized>(
        &mut self,
        host: &H,
        now: DateTime<Utc>,
    ) -> Result<CycleReport, Error> {
        let mut report = CycleReport::default();

        let bindings = host.bindings();
        if bindings.is_empty() {
            info!("No SMHI item bindings configured, refresh cycle skipped");
            return Ok(report);
        }

        let interval = interval_delta(self.refresh_interval_ms).ok_or_else(|| {
            Error::Config(format!("refresh interval {}ms is out of range", self.refresh_interval_ms))
        })?;
        let mut cache = CycleCache::new();

        for binding in &bindings {
            if let Some(last) = self.last_update.get(&binding.item_name) {
                if now - *last < interval {
                    debug!("Not time to refresh item {}", binding.item_name);
                    report.fresh += 1;
                    continue;
                }
            }
            report.due += 1;

            let coordinate = self.effective_coordinate(binding);
            let snapshot = match cache.get(&coordinate) {
                Some(snapshot) => {
                    debug!("Reusing forecast for {} ({})", coordinate, binding.item_name);
                    snapshot.clone()
                }
                None => {
                    let forecast = match self.source.fetch(&coordinate).await {
                        Ok(forecast) => forecast,
                        Err(e) => {
                            error!("SMHI query for {} failed, refresh cycle aborted: {}", coordinate, e);
                            return Err(e);
                        }
                    };
                    report.fetches += 1;
                    let current = forecast.into_current(now);
                    cache.put(coordinate, current.clone());
                    current
                }
            };

            match parameters::descriptor(&binding.parameter) {
                None => {
                    let key = (binding.item_name.clone(), binding.parameter.clone());
                    if self.warned_unknown.insert(key) {
                        warn!(
                            "Unknown SMHI parameter '{}' for item {}",
                            binding.parameter, binding.item_name
                        );
                    }
                    report.skipped += 1;
                }
                Some(descriptor) => match descriptor.extract(&snapshot) {
                    Ok(value) => {
                        debug!("Publishing {} = {}", binding.item_name, value);
                        host.publish_numeric(&binding.item_name, value).await;
                        report.published += 1;
                    }
                    Err(e) => {
                        warn!("No value for item {}: {}", binding.item_name, e);
                        report.skipped += 1;
                    }
                },
            }

            self.mark_updated(&binding.item_name, now);
        }

        cache.clear();

        info!(
            "Refresh cycle done: due={} fresh={} fetches={} published={} skipped={}",
            report.due, report.fresh, report.fetches, report.published, report.skipped
        );

        Ok(report)
    }

    fn mark_updated(&mut self, item_name: &str, now: DateTime<Utc>) {
        self.last_update
            .entry(item_name.to_string())
            .and_modify(|last| {
                if now > *last {
                    *last = now;
                }
            })
            .or_insert(now);
    }
}

fn interval_delta(ms: u64) -> Option<Duration> {
    i64::try_from(ms).ok().and_then(Duration::try_milliseconds)
}

fn parse_property<T: std::str::FromStr>(
    properties: &BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, Error> {
    let Some(raw) = properties.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} has an invalid value '{raw}'")))
}
