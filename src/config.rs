use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::AdmissionParams;
use crate::error::ConfigError;

/// Service configuration, loadable from a JSON file.
///
/// Durations use humantime syntax ("1s", "500ms", "5m"). Unknown keys are
/// rejected so a typo cannot silently fall back to a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Default log level when RUST_LOG is unset
    pub log_level: String,
    /// Trust X-Forwarded-For / X-Real-IP over the peer address
    pub trust_forwarded_headers: bool,
    /// Paths exempt from admission control
    pub exempt_paths: Vec<String>,
    /// Admission engine parameters
    pub admission: AdmissionParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_level: "info".to_string(),
            trust_forwarded_headers: false,
            exempt_paths: vec!["/health".to_string(), "/metrics".to_string()],
            admission: AdmissionParams::default(),
        }
    }
}

impl Config {
    /// Load from `path`, or fall back to defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Config = match path {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.admission.validate().map_err(ConfigError::Invalid)
    }

    /// How often the sweeper runs: half the idle threshold, at least 1s.
    pub fn sweep_period(&self) -> Duration {
        (self.admission.idle_threshold / 2).max(Duration::from_secs(1))
    }
}
