use std::{collections::HashMap, time::Duration};

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use url::Url;

use crate::{common::errors::ConfigurationError, domain::models::source::Source};

/// Settings that can be overridden through `RELAY__` prefixed variables.
const ENVIRONMENT_PREFIX: &str = "RELAY";

/// Values the relay cannot start without, with the variable that usually carries them.
const REQUIRED_SETTINGS: [(&str, &str); 3] = [
    ("mirakurun.url", "MIRAKURUN_URL"),
    ("log.webhook_url", "LOG_WEBHOOK_URL"),
    ("events.webhook_url", "EVENTS_WEBHOOK_URL"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub mirakurun: MirakurunSettings,
    pub relay: RelaySettings,
    pub log: SourceSettings,
    pub events: SourceSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MirakurunSettings {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    pub flush_interval_milliseconds: u64,
    pub max_content_length: usize,
    pub reconnect: ReconnectPolicy,
    pub reconnect_delay_milliseconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    pub webhook_url: Secret<String>,
    pub username: String,
    pub stream_path: String,
}

/// What a subscriber does once its stream has ended or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectPolicy {
    Never,
    Always,
}

impl Settings {
    pub fn source(&self, source: Source) -> &SourceSettings {
        match source {
            Source::Log => &self.log,
            Source::Events => &self.events,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        parse_url("mirakurun.url", &self.mirakurun.url)?;
        parse_url("log.webhook_url", self.log.webhook_url.expose_secret())?;
        parse_url("events.webhook_url", self.events.webhook_url.expose_secret())?;

        if self.relay.flush_interval_milliseconds == 0 {
            return Err(ConfigurationError::Invalid {
                key: "relay.flush_interval_milliseconds",
                reason: "must be greater than zero".into(),
            });
        }
        if self.relay.max_content_length == 0 {
            return Err(ConfigurationError::Invalid {
                key: "relay.max_content_length",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

impl RelaySettings {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_milliseconds)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_milliseconds)
    }
}

impl SourceSettings {
    pub fn stream_url(&self, base_url: &str) -> String {
        let base_url = base_url.trim_end_matches('/');
        if self.stream_path.starts_with('/') {
            format!("{}{}", base_url, self.stream_path)
        } else {
            format!("{}/{}", base_url, self.stream_path)
        }
    }
}

/// Reads `.env` if present, then resolves settings from the process environment.
pub fn get_configuration() -> Result<Settings, ConfigurationError> {
    dotenvy::dotenv().ok();
    configuration_from(std::env::vars().collect())
}

pub fn configuration_from(vars: HashMap<String, String>) -> Result<Settings, ConfigurationError> {
    let configuration = Config::builder()
        .set_default("relay.flush_interval_milliseconds", 5000)?
        .set_default("relay.max_content_length", 2000)?
        .set_default("relay.reconnect", "never")?
        .set_default("relay.reconnect_delay_milliseconds", 5000)?
        .set_default("log.username", "Mirakurun Log")?
        .set_default("log.stream_path", "/api/log/stream")?
        .set_default("events.username", "Mirakurun Events")?
        .set_default("events.stream_path", "/api/events/stream")?
        .add_source(File::with_name("configuration/base").required(false))
        .add_source(
            Environment::with_prefix(ENVIRONMENT_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(Some(vars.clone())),
        )
        .set_override_option("mirakurun.url", vars.get("MIRAKURUN_URL").cloned())?
        .set_override_option("log.webhook_url", vars.get("LOG_WEBHOOK_URL").cloned())?
        .set_override_option("events.webhook_url", vars.get("EVENTS_WEBHOOK_URL").cloned())?
        .build()?;

    for (key, variable) in REQUIRED_SETTINGS {
        match configuration.get_string(key) {
            Ok(value) if !value.trim().is_empty() => {}
            _ => return Err(ConfigurationError::Missing(variable)),
        }
    }

    let settings = configuration.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, ConfigurationError> {
    Url::parse(value).map_err(|source| ConfigurationError::InvalidUrl { key, source })
}
