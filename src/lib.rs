//! podprof - Periodic Measurements for Kubernetes Workloads
//!
//! This crate provides a registry of pluggable, independently lifecycled
//! measurements and a pprof measurement that periodically collects runtime
//! profiles from every pod matching a set of label selectors. It can be used
//! as a library or run as the standalone `podprof` binary.
//!
//! # Architecture
//!
//! - **Config**: YAML configuration for cluster access and measurements
//! - **Cluster**: Endpoint discovery and remote command execution
//! - **Measurement**: Capability trait, registry, lifecycle control and the
//!   pprof collector
//!
//! # Example
//!
//! ```rust,no_run
//! use podprof::{AppConfig, Catalog, Cluster, KubectlClient, MeasurementRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load("configs/config.yaml")?;
//!     let cluster = Cluster::from_client(KubectlClient::from_config(&config.cluster));
//!     let registry =
//!         MeasurementRegistry::build(&config.measurements, &Catalog::builtin(), &cluster);
//!
//!     registry.start_all();
//!     tokio::time::sleep(std::time::Duration::from_secs(60)).await;
//!     std::process::exit(registry.stop_all().await);
//! }
//! ```

pub mod cluster;
pub mod config;
pub mod measurement;

pub use cluster::{Cluster, ClusterError, Endpoint, KubectlClient, LabelSelector};
pub use config::{AppConfig, ConfigError, MeasurementConfig, PprofTarget};
pub use measurement::pprof::PprofMeasurement;
pub use measurement::{
    Catalog, Measurement, MeasurementError, MeasurementRegistry, StartReport, StartReports,
    StopStatus,
};
