//! Host seam: where item bindings come from and where readings go.

use async_trait::async_trait;
use common::{ItemBinding, Reading};

/// The home-automation side of the poller.
#[async_trait]
pub trait Host: Send + Sync {
    /// Current item bindings, in processing order.
    fn bindings(&self) -> Vec<ItemBinding>;

    /// Deliver a numeric update for an item.
    async fn publish_numeric(&self, item_name: &str, value: Reading);
}
