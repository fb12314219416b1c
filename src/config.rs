//! Configuration file structures for the board.
//!
//! The configuration is read from a YAML file and merged with environment
//! variables prefixed with `MINBAR_`, `__` separating nested keys.
//!
//! # Configuration File Format
//!
//! ```yaml
//! # Hosted backend (Supabase project)
//! backend:
//!   url: "https://project.supabase.co"
//!   api_key: "anon-key"
//!   # Signed-in admin token and user, needed for admin commands only
//!   access_token: "user-jwt"
//!   user_id: "uuid-of-admin"
//!   # Seconds before a request is abandoned
//!   request_timeout: 15
//!   # Seconds between two refreshes of the board data
//!   polling_interval: 300
//!
//! cache:
//!   # Seconds during which the local mirror is trusted
//!   ttl_secs: 300
//!
//! alerts:
//!   enabled: true
//!   poll_interval_secs: 5
//!   max_attempts: 3
//!   retry_delay_secs: 2
//!   # `{prayer}` is replaced by the prayer name
//!   command: ["aplay", "/usr/share/minbar/adhan.wav"]
//!
//! display:
//!   render: true
//! ```
//!
//! # Environment Variable Overrides
//!
//! ```bash
//! export MINBAR_BACKEND__API_KEY="anon-key"
//! export MINBAR_BACKEND__ACCESS_TOKEN="user-jwt"
//! ```

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;

/// Prefix of the environment variables overriding the file.
const ENV_PREFIX: &str = "MINBAR_";

/// Root configuration structure.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub backend: Backend,
    #[serde(default)]
    pub cache: Cache,
    #[serde(default)]
    pub alerts: Alerts,
    #[serde(default)]
    pub display: Display,
}

impl Config {
    /// Loads the configuration from the YAML file at `path`, then applies
    /// the `MINBAR_` environment overrides.
    pub fn load(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }
}

/// Hosted backend connection settings.
#[derive(Debug, Deserialize)]
pub struct Backend {
    /// Base URL of the project, e.g. `https://project.supabase.co`
    pub url: String,
    /// Public api key sent with every request
    pub api_key: String,
    /// Token of the signed-in admin.
    ///
    /// Without it requests are made with the api key and row level security
    /// only allows reads.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Id of the signed-in admin, checked against the `profiles` table
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,
}

impl Backend {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval.max(1))
    }
}

#[derive(Debug, Deserialize)]
pub struct Cache {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Cache {
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// Jamat alert settings.
#[derive(Debug, Deserialize)]
pub struct Alerts {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_alert_poll")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    /// Program and arguments run for every alert, empty to only log
    #[serde(default)]
    pub command: Vec<String>,
}

impl Default for Alerts {
    fn default() -> Self {
        Alerts {
            enabled: true,
            poll_interval_secs: default_alert_poll(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay(),
            command: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Display {
    /// Print the board to stdout every minute
    #[serde(default = "default_true")]
    pub render: bool,
}

impl Default for Display {
    fn default() -> Self {
        Display { render: true }
    }
}

fn default_request_timeout() -> u64 {
    15
}

fn default_polling_interval() -> u64 {
    300
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_alert_poll() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2
}

fn default_true() -> bool {
    true
}
