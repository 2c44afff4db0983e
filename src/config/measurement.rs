//! Measurement configuration structures.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cluster::LabelSelector;

use super::validation::{ConfigError, validate_url};

/// Default output directory for profile artifacts.
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "pprof";

/// Default bounded wait for a measurement to stop (30 seconds).
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

fn default_stop_timeout() -> Duration {
    DEFAULT_STOP_TIMEOUT
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIRECTORY)
}

/// One configured measurement.
///
/// `name` selects the implementation; the remaining fields are options
/// interpreted by that implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementConfig {
    /// Measurement name, unique among configured entries.
    pub name: String,
    /// Directory receiving artifacts (default: "pprof").
    #[serde(default = "default_output_directory", alias = "pprofDirectory")]
    pub output_directory: PathBuf,
    /// Time between collection passes. Required by interval-driven measurements.
    #[serde(default, with = "humantime_serde", alias = "pprofInterval")]
    pub collection_interval: Option<Duration>,
    /// Profiling sources.
    #[serde(default, alias = "pprofTargets")]
    pub targets: Vec<PprofTarget>,
    /// How long `stop` waits for the collection loop to exit (default: 30s).
    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,
}

impl MeasurementConfig {
    /// Create a measurement configuration with default options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output_directory: default_output_directory(),
            collection_interval: None,
            targets: Vec::new(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// Set the output directory.
    pub fn with_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = dir.into();
        self
    }

    /// Set the collection interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.collection_interval = Some(interval);
        self
    }

    /// Set the stop timeout.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Add a profiling target.
    pub fn with_target(mut self, target: PprofTarget) -> Self {
        self.targets.push(target);
        self
    }

    /// Validate the measurement entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "measurement name cannot be empty".to_string(),
            ));
        }

        if self.stop_timeout.is_zero() {
            return Err(ConfigError::ValidationError(format!(
                "measurement '{}': stop_timeout must be positive",
                self.name
            )));
        }

        let mut seen_targets = HashSet::new();
        for target in &self.targets {
            if target.name.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "measurement '{}': target name cannot be empty",
                    self.name
                )));
            }
            if target.name.contains(['/', '\\']) || target.name.contains("..") {
                return Err(ConfigError::ValidationError(format!(
                    "measurement '{}': target name '{}' must not contain path separators or '..'",
                    self.name, target.name
                )));
            }
            if !seen_targets.insert(&target.name) {
                return Err(ConfigError::ValidationError(format!(
                    "measurement '{}': duplicate target name: '{}'",
                    self.name, target.name
                )));
            }
            if target.namespace.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "measurement '{}': target '{}' namespace cannot be empty",
                    self.name, target.name
                )));
            }
            validate_url(
                &format!("measurement '{}': target '{}'", self.name, target.name),
                &target.url,
            )?;
        }

        Ok(())
    }
}

/// A logical profiling source, resolved to zero or more endpoints per pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PprofTarget {
    /// Target name, used as the artifact name prefix.
    pub name: String,
    /// Namespace to search for endpoints.
    pub namespace: String,
    /// Labels the endpoints must carry.
    #[serde(default, alias = "labelSelector")]
    pub label_selector: LabelSelector,
    /// Profile URL, fetched from inside each endpoint.
    pub url: String,
    /// Bearer credential sent with the request. Supports `${VAR}` expansion.
    #[serde(default, alias = "bearerToken")]
    pub bearer_token: Option<String>,
    /// Container to exec into (default: the pod's first container).
    #[serde(default)]
    pub container: Option<String>,
}

impl PprofTarget {
    /// Create a target with an empty selector and no credential.
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            label_selector: LabelSelector::default(),
            url: url.into(),
            bearer_token: None,
            container: None,
        }
    }

    /// Set the label selector.
    pub fn with_selector(mut self, selector: LabelSelector) -> Self {
        self.label_selector = selector;
        self
    }

    /// Set the bearer credential.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Set the container to exec into.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }
}
