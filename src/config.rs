//! Configuration module for podprof.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Cluster access (kubectl binary, kubeconfig, context)
//! - Measurement definitions (name, output directory, interval, targets, stop timeout)

mod app;
mod measurement;
mod validation;

pub use app::{AppConfig, ClusterConfig};
pub use measurement::{
    DEFAULT_OUTPUT_DIRECTORY, DEFAULT_STOP_TIMEOUT, MeasurementConfig, PprofTarget,
};
pub use validation::{ConfigError, expand_env_vars, parse_duration};
