//! Console configuration
//!
//! Values are layered: serde defaults, then an optional config file, then
//! `MCTL_*` environment variables. The binary applies its own flags on top.
//! The backend base URL is resolved exactly once from the result and handed
//! to the sync client by reference.

use crate::error::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Backend endpoint used when nothing else is configured, and when the
/// console is served from the local development origin.
pub const LOCAL_DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Origin of the local development front-end server
const LOCAL_DEV_ORIGIN: (&str, u16) = ("localhost", 3000);

/// Where the new behavior id travels in a change-behavior request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BehaviorEncoding {
    /// `?className=&methodName=&behaviourId=` on the PUT
    #[default]
    Query,
    /// JSON body carrying the identifiers
    JsonBody,
}

impl std::str::FromStr for BehaviorEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "query" => Ok(BehaviorEncoding::Query),
            "json-body" | "json_body" | "json" => Ok(BehaviorEncoding::JsonBody),
            other => Err(format!("unknown behavior encoding: {other}")),
        }
    }
}

/// Console configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Explicit backend endpoint, used as-is
    #[serde(default)]
    pub base_url: Option<String>,

    /// Origin the console is served from; the endpoint is derived from it
    #[serde(default)]
    pub origin: Option<String>,

    #[serde(default)]
    pub behavior_encoding: BehaviorEncoding,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Live metrics refresh period while a service is viewed
    #[serde(default = "default_live_poll_interval")]
    pub live_poll_interval_secs: u64,

    /// Wait between triggering a full discovery and re-fetching the registry
    #[serde(default = "default_discovery_delay")]
    pub discovery_delay_secs: u64,

    /// Historical window used when none is given
    #[serde(default = "default_minutes")]
    pub default_minutes: u32,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_live_poll_interval() -> u64 {
    30
}

fn default_discovery_delay() -> u64 {
    5
}

fn default_minutes() -> u32 {
    15
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            origin: None,
            behavior_encoding: BehaviorEncoding::default(),
            request_timeout_secs: default_request_timeout(),
            live_poll_interval_secs: default_live_poll_interval(),
            discovery_delay_secs: default_discovery_delay(),
            default_minutes: default_minutes(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// With `path == None` the default location is tried and silently
    /// skipped when absent; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("MCTL"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// `~/.config/mctl/config` (any extension the `config` crate knows)
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("mctl").join("config"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn live_poll_interval(&self) -> Duration {
        Duration::from_secs(self.live_poll_interval_secs.max(1))
    }

    pub fn discovery_delay(&self) -> Duration {
        Duration::from_secs(self.discovery_delay_secs)
    }

    /// Resolve the backend base URL
    ///
    /// An explicit `base_url` wins. Otherwise the endpoint is derived from
    /// `origin` (`{origin}/api`), except for the local development origin,
    /// which maps to [`LOCAL_DEFAULT_BASE_URL`]. With neither set the local
    /// default is used.
    pub fn resolve_base_url(&self) -> Result<Url> {
        if let Some(base) = self.base_url.as_deref().filter(|s| !s.trim().is_empty()) {
            return Url::parse(base.trim())
                .map_err(|e| ConsoleError::Config(format!("invalid base_url {base}: {e}")));
        }

        if let Some(origin) = self.origin.as_deref().filter(|s| !s.trim().is_empty()) {
            let origin = Url::parse(origin.trim())
                .map_err(|e| ConsoleError::Config(format!("invalid origin {origin}: {e}")))?;

            let is_local_dev = origin.host_str() == Some(LOCAL_DEV_ORIGIN.0)
                && origin.port() == Some(LOCAL_DEV_ORIGIN.1);
            if !is_local_dev {
                let mut derived = origin;
                derived.set_query(None);
                derived.set_fragment(None);
                derived.set_path("/api");
                return Ok(derived);
            }
        }

        Url::parse(LOCAL_DEFAULT_BASE_URL)
            .map_err(|e| ConsoleError::Config(format!("invalid default base url: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_base_url_wins() {
        let config = ConsoleConfig {
            base_url: Some("https://panel.example.com/backend/api".to_string()),
            origin: Some("https://other.example.com".to_string()),
            ..Default::default()
        };
        let url = config.resolve_base_url().unwrap();
        assert_eq!(url.as_str(), "https://panel.example.com/backend/api");
    }

    #[test]
    fn test_origin_fallback_appends_api() {
        let config = ConsoleConfig {
            origin: Some("http://192.168.49.2:30080/dashboard?x=1".to_string()),
            ..Default::default()
        };
        let url = config.resolve_base_url().unwrap();
        assert_eq!(url.as_str(), "http://192.168.49.2:30080/api");
    }

    #[test]
    fn test_local_dev_origin_maps_to_local_default() {
        let config = ConsoleConfig {
            origin: Some("http://localhost:3000".to_string()),
            ..Default::default()
        };
        let url = config.resolve_base_url().unwrap();
        assert_eq!(url.as_str(), LOCAL_DEFAULT_BASE_URL);
    }

    #[test]
    fn test_no_endpoint_configured_uses_local_default() {
        let url = ConsoleConfig::default().resolve_base_url().unwrap();
        assert_eq!(url.as_str(), LOCAL_DEFAULT_BASE_URL);
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let config = ConsoleConfig {
            base_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.resolve_base_url(),
            Err(ConsoleError::Config(_))
        ));
    }

    #[test]
    fn test_behavior_encoding_parsing() {
        assert_eq!("query".parse::<BehaviorEncoding>(), Ok(BehaviorEncoding::Query));
        assert_eq!(
            "json-body".parse::<BehaviorEncoding>(),
            Ok(BehaviorEncoding::JsonBody)
        );
        assert!("form".parse::<BehaviorEncoding>().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "base_url = \"http://panel:8080/api\"\nbehavior_encoding = \"json-body\"\nlive_poll_interval_secs = 10"
        )
        .unwrap();

        let config = ConsoleConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://panel:8080/api"));
        assert_eq!(config.behavior_encoding, BehaviorEncoding::JsonBody);
        assert_eq!(config.live_poll_interval(), Duration::from_secs(10));
        assert_eq!(config.discovery_delay(), Duration::from_secs(5));
        assert_eq!(config.default_minutes, 15);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = ConsoleConfig::load(Some(Path::new("/nonexistent/mctl.toml")));
        assert!(matches!(result, Err(ConsoleError::Config(_))));
    }
}
