//! Configuration loader — merges env vars, .env file, and the TOML config.

use std::collections::HashSet;
use std::path::Path;

use common::config::ServiceConfig;
use common::{Error, ItemBinding};

const ENV_HOME_LATITUDE: &str = "SMHI_HOME_LATITUDE";
const ENV_HOME_LONGITUDE: &str = "SMHI_HOME_LONGITUDE";
const ENV_REFRESH_MS: &str = "SMHI_REFRESH_MS";
const ENV_HTTP_TIMEOUT_MS: &str = "SMHI_HTTP_TIMEOUT_MS";
const ENV_BASE_URL: &str = "SMHI_BASE_URL";

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

/// Parse the TOML config file contents.
pub fn parse_config(contents: &str) -> Result<ServiceConfig, Error> {
    toml::from_str(contents).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
}

/// Apply environment overrides. `lookup` is `std::env::var` outside tests.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), Error>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(lat) = lookup(ENV_HOME_LATITUDE) {
        config.binding.insert("home.latitude".into(), lat);
    }
    if let Some(lon) = lookup(ENV_HOME_LONGITUDE) {
        config.binding.insert("home.longitude".into(), lon);
    }
    if let Some(refresh) = lookup(ENV_REFRESH_MS) {
        config.binding.insert("refresh".into(), refresh);
    }
    if let Some(raw) = lookup(ENV_HTTP_TIMEOUT_MS) {
        config.http.timeout_ms = parse_positive_u64(&raw, ENV_HTTP_TIMEOUT_MS)?;
    }
    if let Some(url) = lookup(ENV_BASE_URL) {
        config.http.base_url = url.trim().to_string();
    }
    Ok(())
}

/// Collect every problem with the config into one error.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.http.timeout_ms == 0 {
        issues.push("http.timeout_ms must be > 0".into());
    }
    let base_url = config.http.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        issues.push(format!(
            "http.base_url must start with http:// or https://, got '{}'",
            base_url
        ));
    }

    let mut seen = HashSet::new();
    for item in &config.items {
        let name = item.name.trim();
        if name.is_empty() {
            issues.push("items[].name must not be empty".into());
            continue;
        }
        if !seen.insert(name) {
            issues.push(format!("item '{}' is configured more than once", name));
        }
        if let Err(e) = ItemBinding::parse(name, &item.binding) {
            issues.push(e.to_string());
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load configuration from `.env`, the config file (if present) and the
/// environment, in increasing priority.
pub fn load_config(path: &Path) -> Result<ServiceConfig, Error> {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    let mut config = ServiceConfig::default();

    if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        config = parse_config(&contents)?;
    } else {
        tracing::warn!("Config file {} not found, using defaults", path.display());
    }

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
        [binding]
        "home.latitude" = "57.70"
        "home.longitude" = 11.97
        refresh = 600000

        [http]
        timeout_ms = 3000

        [[items]]
        name = "Outdoor_Temperature"
        binding = "57.999628:16.017767:temperature"

        [[items]]
        name = "Outdoor_Humidity"
        binding = "humidity"
    "#;

    #[test]
    fn test_parse_sample_config() {
        let config = parse_config(SAMPLE).expect("sample should parse");

        assert_eq!(config.binding["home.latitude"], "57.70");
        assert_eq!(config.binding["home.longitude"], "11.97");
        assert_eq!(config.binding["refresh"], "600000");
        assert_eq!(config.http.timeout_ms, 3000);
        assert_eq!(config.http.base_url, common::config::DEFAULT_BASE_URL);
        assert_eq!(config.items.len(), 2);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_env_overrides_take_priority() {
        let mut config = parse_config(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("SMHI_HOME_LATITUDE", "55.5"),
            ("SMHI_REFRESH_MS", "60000"),
            ("SMHI_HTTP_TIMEOUT_MS", "1500"),
        ]);

        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(config.binding["home.latitude"], "55.5");
        assert_eq!(config.binding["home.longitude"], "11.97");
        assert_eq!(config.binding["refresh"], "60000");
        assert_eq!(config.http.timeout_ms, 1500);
    }

    #[test]
    fn test_env_timeout_must_be_positive() {
        let mut config = ServiceConfig::default();
        let result = apply_env_overrides(&mut config, |name| {
            (name == "SMHI_HTTP_TIMEOUT_MS").then(|| "0".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_collects_all_issues() {
        let config = parse_config(
            r#"
            [http]
            timeout_ms = 0
            base_url = "ftp://example"

            [[items]]
            name = "A"
            binding = "temperature"

            [[items]]
            name = "A"
            binding = "1:2"
            "#,
        )
        .unwrap();

        match validate_config(&config) {
            Err(Error::Config(msg)) => {
                assert!(msg.contains("timeout_ms"));
                assert!(msg.contains("base_url"));
                assert!(msg.contains("more than once"));
                assert!(msg.contains("three parts"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
