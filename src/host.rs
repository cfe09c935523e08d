//! Standalone host: items come from the config file, updates go to the log
//! and the optional journal.

use async_trait::async_trait;
use common::config::ServiceConfig;
use common::{Error, ItemBinding, Reading};
use refresh::Host;
use serde_json::json;
use tracing::info;

use crate::journal::{self, now_iso, SharedJournal};

pub struct ConfigHost {
    bindings: Vec<ItemBinding>,
    journal: Option<SharedJournal>,
}

impl ConfigHost {
    pub fn from_config(config: &ServiceConfig, journal: Option<SharedJournal>) -> Result<Self, Error> {
        let bindings = config
            .items
            .iter()
            .map(|item| ItemBinding::parse(item.name.trim(), &item.binding))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { bindings, journal })
    }

    pub fn item_names(&self) -> Vec<&str> {
        self.bindings.iter().map(|b| b.item_name.as_str()).collect()
    }
}

#[async_trait]
impl Host for ConfigHost {
    fn bindings(&self) -> Vec<ItemBinding> {
        self.bindings.clone()
    }

    async fn publish_numeric(&self, item_name: &str, value: Reading) {
        info!("UPDATE {} = {}", item_name, value);
        journal::write_event(
            self.journal.as_ref(),
            json!({
                "ts": now_iso(),
                "kind": "publish",
                "item": item_name,
                "value": value,
                "value_kind": value.kind_label()
            }),
        )
        .await;
    }
}
