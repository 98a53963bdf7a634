use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::zha::connection::websocket_url;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub homeassistant: HassConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Connection settings for the hub.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct HassConfig {
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    pub port: u16,
    pub token: SecretString,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default = "default_scrape_interval")]
    pub scrape_interval_seconds: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            scrape_interval_seconds: default_scrape_interval(),
        }
    }
}

impl HassConfig {
    pub fn websocket_url(&self) -> String {
        websocket_url(&self.hostname, self.port, self.use_tls)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Command-line values that take precedence over the file and environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub token: Option<String>,
}

fn default_hostname() -> String {
    "homeassistant.local".to_string()
}

fn default_port() -> u16 {
    8123
}

fn default_use_tls() -> bool {
    false
}

fn default_verify_ssl() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_scrape_interval() -> u64 {
    60
}

/// Accept the port as an integer or as a numeric string.
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Clone, Copy)]
    struct PortVisitor;

    impl Visitor<'_> for PortVisitor {
        type Value = u16;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a port number between 1 and 65535, as an integer or string")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<u16, E> {
            match u16::try_from(value) {
                Ok(port) if port > 0 => Ok(port),
                _ => Err(E::invalid_value(de::Unexpected::Unsigned(value), &self)),
            }
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<u16, E> {
            u64::try_from(value)
                .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
                .and_then(|value| self.visit_u64(value))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<u16, E> {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))
                .and_then(|port| self.visit_u64(port))
        }
    }

    deserializer.deserialize_any(PortVisitor)
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        Self::load_with_overrides(path, Overrides::default())
    }

    pub fn load_with_overrides(path: &str, overrides: Overrides) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("ZHA_EXPORTER").separator("__"))
            .set_override_option("homeassistant.hostname", overrides.hostname)?
            .set_override_option("homeassistant.port", overrides.port.map(i64::from))?
            .set_override_option("homeassistant.token", overrides.token)?
            .build()
            .context("Failed to build configuration")?;

        if config.get_table("homeassistant").is_err() {
            anyhow::bail!("Missing [homeassistant] section in configuration");
        }

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.homeassistant.request_timeout_seconds == 0 {
            anyhow::bail!("homeassistant.request_timeout_seconds must be at least 1");
        }
        if self.metrics.scrape_interval_seconds == 0 {
            anyhow::bail!("metrics.scrape_interval_seconds must be at least 1");
        }
        Ok(())
    }
}
