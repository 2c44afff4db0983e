//! Cluster Layer
//!
//! The narrow interface measurements use to reach live workloads:
//! discovering endpoints behind a label selector, and running a command
//! inside one of them with its output streamed to a local file.
//!
//! # Components
//!
//! - [`EndpointResolver`]: Lists the endpoints currently matching a selector
//! - [`RemoteExecutor`]: Runs a command inside one endpoint
//! - [`Cluster`]: Shared, read-only bundle of both, handed to measurements
//! - [`KubectlClient`]: Implementation of both backed by the `kubectl` binary
//!
//! # Example
//!
//! ```rust,no_run
//! use podprof::cluster::{Cluster, KubectlClient};
//!
//! let client = KubectlClient::new("kubectl").with_context("staging");
//! let cluster = Cluster::from_client(client);
//! ```

pub mod kubectl;
#[cfg(test)]
pub(crate) mod testing;
mod traits;
mod types;

pub use kubectl::KubectlClient;
pub use traits::{Cluster, ClusterError, EndpointResolver, RemoteExecutor};
pub use types::{Endpoint, LabelSelector};
