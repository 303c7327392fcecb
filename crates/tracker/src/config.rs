//! Tracker configuration.

use std::{env, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const BACKEND_URL_VAR: &str = "RUNNERS_HIGH_BACKEND_URL";
pub const TOKEN_VAR: &str = "RUNNERS_HIGH_TOKEN";
pub const BODY_WEIGHT_VAR: &str = "RUNNERS_HIGH_BODY_WEIGHT_KG";
pub const UPLOAD_LOCATIONS_VAR: &str = "RUNNERS_HIGH_UPLOAD_LOCATIONS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Base URL of the session backend. `None` runs offline.
    pub backend_url: Option<String>,

    /// Bearer token sent with every backend request.
    pub auth_token: Option<String>,

    /// Body weight used for the on-device calorie estimate.
    pub body_weight_kg: f64,

    /// Upload every recorded fix to the backend as it arrives.
    pub upload_locations: bool,

    /// Capacity of the tracker command channel.
    pub command_buffer: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            auth_token: None,
            body_weight_kg: 65.0,
            upload_locations: false,
            command_buffer: 256,
        }
    }
}

impl TrackerConfig {
    /// Builds a config from `RUNNERS_HIGH_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            backend_url: non_empty(BACKEND_URL_VAR).map(|url| url.trim_end_matches('/').to_string()),
            auth_token: non_empty(TOKEN_VAR),
            body_weight_kg: parse_or(non_empty(BODY_WEIGHT_VAR), BODY_WEIGHT_VAR, defaults.body_weight_kg),
            upload_locations: parse_or(
                non_empty(UPLOAD_LOCATIONS_VAR),
                UPLOAD_LOCATIONS_VAR,
                defaults.upload_locations,
            ),
            command_buffer: defaults.command_buffer,
        }
    }

    /// Falls back to the `.dev-ports` file in `dir` when no backend URL is set.
    pub fn or_dev_ports(mut self, dir: impl AsRef<Path>) -> Self {
        if self.backend_url.is_none() {
            self.backend_url = read_backend_url_from_dev_ports(dir);
        }
        self
    }

    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    pub fn with_upload_locations(mut self, enabled: bool) -> Self {
        self.upload_locations = enabled;
        self
    }
}

/// Parses `value` if present, warning and keeping `default` when it does not parse.
pub fn parse_or<T: FromStr + Copy>(value: Option<String>, key: &str, default: T) -> T {
    match value {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {key}={raw:?}, using default");
            default
        }),
    }
}

/// Reads the backend port from a `.dev-ports` file in `dir`.
///
/// Returns the full backend URL, or `None` if the file or entry is missing.
pub fn read_backend_url_from_dev_ports(dir: impl AsRef<Path>) -> Option<String> {
    let contents = std::fs::read_to_string(dir.as_ref().join(".dev-ports")).ok()?;
    contents
        .lines()
        .filter_map(|line| line.strip_prefix("BACKEND_PORT="))
        .find_map(|port| port.trim().parse::<u16>().ok())
        .map(|port| format!("http://localhost:{port}"))
}
