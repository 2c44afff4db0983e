//! Measurement Layer
//!
//! Pluggable, independently lifecycled measurements. Each measurement is
//! configured once, started as its own Tokio task and stopped with an exit
//! code that feeds the process status.
//!
//! # Architecture
//!
//! - [`Measurement`]: Capability trait (`set_config`, `start`, `stop`)
//! - [`Catalog`]: Constructor table of available implementations
//! - [`MeasurementRegistry`]: Active measurements built from configuration,
//!   with `start_all` / `stop_all` lifecycle control
//! - [`pprof`]: Periodic pprof collection from Kubernetes pods
//!
//! # Example
//!
//! ```rust,no_run
//! use podprof::cluster::{Cluster, KubectlClient};
//! use podprof::config::AppConfig;
//! use podprof::measurement::{Catalog, MeasurementRegistry};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load("configs/config.yaml")?;
//! let cluster = Cluster::from_client(KubectlClient::from_config(&config.cluster));
//! let registry = MeasurementRegistry::build(&config.measurements, &Catalog::builtin(), &cluster);
//!
//! let _reports = registry.start_all();
//! // ... run the workload ...
//! let rc = registry.stop_all().await;
//! # let _ = rc;
//! # Ok(())
//! # }
//! ```

mod lifecycle;
pub mod pprof;
mod registry;
#[cfg(test)]
pub(crate) mod testing;
mod traits;

pub use lifecycle::{StartReport, StartReports};
pub use registry::{Catalog, MeasurementRegistry};
pub use traits::{MIN_INTERVAL, Measurement, MeasurementError, StopStatus};
