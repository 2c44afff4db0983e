//! Cluster access traits and the shared client bundle.

use std::sync::Arc;

use thiserror::Error;

use crate::cluster::{Endpoint, LabelSelector};

/// Errors returned by cluster operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The client program could not be launched.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A command ran but exited unsuccessfully.
    #[error("{command} failed ({status}): {detail}")]
    CommandFailed {
        /// Short description of the command.
        command: String,
        /// Exit status reported by the process.
        status: std::process::ExitStatus,
        /// Captured error output, or a hint where to find it.
        detail: String,
    },

    /// A listing response could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Local I/O error (e.g. duplicating an output handle).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discovers the endpoints currently matching a selector.
#[async_trait::async_trait]
pub trait EndpointResolver: Send + Sync + 'static {
    /// List live endpoints in `namespace` matching `selector`.
    async fn resolve(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Endpoint>, ClusterError>;
}

/// Runs a command inside an endpoint.
#[async_trait::async_trait]
pub trait RemoteExecutor: Send + Sync + 'static {
    /// Execute `command` in `endpoint`, writing stdout and stderr to `output`.
    ///
    /// Returns once the remote command has finished and its output is fully
    /// written. A non-zero remote exit status is an error.
    async fn exec(
        &self,
        endpoint: &Endpoint,
        command: &[String],
        output: std::fs::File,
    ) -> Result<(), ClusterError>;
}

/// Read-only cluster access shared by every measurement.
///
/// Built once at startup and cloned freely; clones share the same clients.
#[derive(Clone)]
pub struct Cluster {
    resolver: Arc<dyn EndpointResolver>,
    executor: Arc<dyn RemoteExecutor>,
}

impl Cluster {
    /// Bundle separate resolver and executor implementations.
    pub fn new(resolver: Arc<dyn EndpointResolver>, executor: Arc<dyn RemoteExecutor>) -> Self {
        Self { resolver, executor }
    }

    /// Use one client for both resolution and execution.
    pub fn from_client<C>(client: C) -> Self
    where
        C: EndpointResolver + RemoteExecutor,
    {
        let client = Arc::new(client);
        Self {
            resolver: Arc::clone(&client) as Arc<dyn EndpointResolver>,
            executor: client,
        }
    }

    /// Endpoint resolver.
    pub fn resolver(&self) -> &Arc<dyn EndpointResolver> {
        &self.resolver
    }

    /// Remote executor.
    pub fn executor(&self) -> &Arc<dyn RemoteExecutor> {
        &self.executor
    }
}

impl std::fmt::Debug for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cluster").finish_non_exhaustive()
    }
}
