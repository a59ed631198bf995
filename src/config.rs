use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use snafu::{ResultExt, Snafu};
use url::Url;

use crate::service::{progress, reorder};

const PREFIX: &str = "CLUB_";

#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// could not read the `CLUB_*` environment variables
    #[snafu(display("invalid configuration: {source}"))]
    Load { source: envy::Error },
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// base url of the course platform's REST API
    pub api_url: Url,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_progress_debounce", deserialize_with = "human_duration")]
    pub progress_debounce: Duration,
    #[serde(default = "default_reorder_debounce", deserialize_with = "human_duration")]
    pub reorder_debounce: Duration,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        envy::prefixed(PREFIX).from_env::<Config>().context(LoadSnafu)
    }

    pub fn from_vars<I>(vars: I) -> Result<Config, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(PREFIX).from_iter(vars).context(LoadSnafu)
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_progress_debounce() -> Duration {
    progress::DEFAULT_DEBOUNCE
}

fn default_reorder_debounce() -> Duration {
    reorder::DEFAULT_DEBOUNCE
}

fn human_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}
