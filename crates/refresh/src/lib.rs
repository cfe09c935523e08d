//! Refresh engine crate.
//!
//! Runs refresh cycles over host item bindings and publishes current
//! forecast values back to the host.

pub mod cache;
pub mod clock;
pub mod engine;
pub mod host;

pub use cache::CycleCache;
pub use clock::TickClock;
pub use engine::{CycleReport, RefreshEngine, DEFAULT_REFRESH_INTERVAL_MS};
pub use host::Host;
