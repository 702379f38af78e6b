//! Process configuration from environment variables

use crate::osm::DEFAULT_OSM_URL;
use crate::osmose::DEFAULT_OSMOSE_URL;
use crate::pager::DEFAULT_WINDOW_SIZE;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Settings injected into the clients and the runtime manager at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub osmose_url: String,
    pub osm_url: String,
    /// OAuth2 bearer token for the map API
    pub osm_token: Option<String>,
    pub search_radius_m: f64,
    pub page_size: usize,
    pub session_idle: Duration,
    pub http_timeout: Duration,
    pub changeset_comment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            osmose_url: DEFAULT_OSMOSE_URL.to_string(),
            osm_url: DEFAULT_OSM_URL.to_string(),
            osm_token: None,
            search_radius_m: 500.0,
            page_size: DEFAULT_WINDOW_SIZE,
            session_idle: Duration::from_secs(1800),
            http_timeout: Duration::from_secs(30),
            changeset_comment: "created via osmate".to_string(),
        }
    }
}

impl Config {
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let search_radius_m = parse(&get, "OSMATE_SEARCH_RADIUS_M", "a non-negative number")?
            .unwrap_or(defaults.search_radius_m);
        if !search_radius_m.is_finite() || search_radius_m < 0.0 {
            return Err(ConfigError::Invalid {
                var: "OSMATE_SEARCH_RADIUS_M",
                value: search_radius_m.to_string(),
                expected: "a non-negative number",
            });
        }

        let page_size: usize = parse(&get, "OSMATE_PAGE_SIZE", "a positive integer")?
            .unwrap_or(defaults.page_size);
        if page_size == 0 {
            return Err(ConfigError::Invalid {
                var: "OSMATE_PAGE_SIZE",
                value: "0".to_string(),
                expected: "a positive integer",
            });
        }

        Ok(Self {
            port: parse(&get, "OSMATE_PORT", "a port number")?.unwrap_or(defaults.port),
            osmose_url: get("OSMATE_OSMOSE_URL").unwrap_or(defaults.osmose_url),
            osm_url: get("OSMATE_OSM_URL").unwrap_or(defaults.osm_url),
            osm_token: get("OSMATE_OSM_TOKEN"),
            search_radius_m,
            page_size,
            session_idle: parse(&get, "OSMATE_SESSION_IDLE_SECS", "a number of seconds")?
                .map_or(defaults.session_idle, Duration::from_secs),
            http_timeout: parse(&get, "OSMATE_HTTP_TIMEOUT_SECS", "a number of seconds")?
                .map_or(defaults.http_timeout, Duration::from_secs),
            changeset_comment: get("OSMATE_CHANGESET_COMMENT")
                .unwrap_or(defaults.changeset_comment),
        })
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    get(var)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                var,
                value: value.clone(),
                expected,
            })
        })
        .transpose()
}
