//! Service configuration types.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// SMHI open-data host.
pub const DEFAULT_BASE_URL: &str = "http://opendata-download-metfcst.smhi.se";

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Host-style property dictionary handed to the engine's `configure`:
    /// `home.latitude`, `home.longitude`, `refresh`.
    #[serde(default, deserialize_with = "deserialize_properties")]
    pub binding: BTreeMap<String, String>,

    /// HTTP client parameters.
    #[serde(default)]
    pub http: HttpConfig,

    /// Items to poll.
    #[serde(default)]
    pub items: Vec<ItemConfig>,
}

/// HTTP client parameters for the forecast client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Total deadline per request, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// One item as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemConfig {
    pub name: String,
    /// `"<lat>:<lon>:<parameter>"` or `"<parameter>"`.
    pub binding: String,
}

/// Property values may be written as TOML strings or bare numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum PropertyValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

fn deserialize_properties<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, PropertyValue>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                PropertyValue::Text(s) => s,
                PropertyValue::Integer(i) => i.to_string(),
                PropertyValue::Float(f) => f.to_string(),
            };
            (key, text)
        })
        .collect())
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

fn default_user_agent() -> String {
    "smhi-poller/0.1".into()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_accept_strings_and_numbers() {
        let config: ServiceConfig = serde_json::from_str(
            r#"{"binding": {"home.latitude": "57.70", "home.longitude": 11.97, "refresh": 600000}}"#,
        )
        .expect("config should deserialize");

        assert_eq!(config.binding["home.latitude"], "57.70");
        assert_eq!(config.binding["home.longitude"], "11.97");
        assert_eq!(config.binding["refresh"], "600000");
        assert_eq!(config.http.timeout_ms, 5_000);
        assert!(config.items.is_empty());
    }
}
