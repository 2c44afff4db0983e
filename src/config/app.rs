//! Application configuration structures.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::measurement::MeasurementConfig;
use super::validation::ConfigError;

fn default_kubectl() -> String {
    "kubectl".to_string()
}

// =============================================================================
// Cluster Configuration
// =============================================================================

/// Cluster access configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Path to the kubectl binary (default: "kubectl").
    #[serde(default = "default_kubectl")]
    pub kubectl: String,

    /// Kubeconfig file (default: kubectl's own lookup).
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context (default: current context).
    #[serde(default)]
    pub context: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubectl: default_kubectl(),
            kubeconfig: None,
            context: None,
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cluster access configuration.
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Configured measurements, in declaration order.
    #[serde(default)]
    pub measurements: Vec<MeasurementConfig>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Duplicate measurement names are accepted here; the registry keeps the
    /// first one and warns about the rest.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster.kubectl.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "cluster kubectl path cannot be empty".to_string(),
            ));
        }

        for measurement in &self.measurements {
            measurement.validate()?;
        }

        Ok(())
    }
}
