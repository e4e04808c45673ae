//! Application configuration read from the environment

use crate::dialog::{DialogSettings, UnknownFieldPolicy};
use crate::services::{LuisConfig, WriteMode, DEFAULT_GRAPH_BASE_URL};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub graph_base_url: String,
    pub write_mode: WriteMode,
    pub luis: Option<LuisConfig>,
    pub dialog: DialogSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|name| std::env::var(name).ok())?;
        config.luis = LuisConfig::from_env();
        Ok(config)
    }

    /// Build from any variable source; LUIS settings are left unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = lookup("TURNSTACK_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.turnstack/turnstack.db"))
            },
            PathBuf::from,
        );

        let port = parse_or("TURNSTACK_PORT", lookup("TURNSTACK_PORT"), 8000)?;
        let timeout_secs = parse_or(
            "TURNSTACK_LOGIN_TIMEOUT_SECS",
            lookup("TURNSTACK_LOGIN_TIMEOUT_SECS"),
            300,
        )?;

        let unknown_fields = match lookup("TURNSTACK_UNKNOWN_FIELDS") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "TURNSTACK_UNKNOWN_FIELDS",
                value,
            })?,
            None => UnknownFieldPolicy::default(),
        };

        let write_mode = match lookup("TURNSTACK_DIRECTORY_WRITES").as_deref().map(str::trim) {
            None | Some("simulate") => WriteMode::Simulate,
            Some("live") => WriteMode::Live,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "TURNSTACK_DIRECTORY_WRITES",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            db_path,
            port,
            graph_base_url: lookup("GRAPH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_string()),
            write_mode,
            luis: None,
            dialog: DialogSettings {
                connection_name: lookup("TURNSTACK_CONNECTION_NAME")
                    .unwrap_or_else(|| "graph".to_string()),
                login_timeout: Duration::from_secs(timeout_secs),
                unknown_fields,
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
