//! In-memory cluster doubles for unit tests.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use crate::cluster::{ClusterError, Endpoint, EndpointResolver, LabelSelector, RemoteExecutor};

/// Resolver answering from a fixed selector table.
#[derive(Default)]
pub(crate) struct FakeResolver {
    endpoints: HashMap<String, Vec<Endpoint>>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    calls: Mutex<usize>,
}

impl FakeResolver {
    /// Endpoints named `names` in namespace "default" match `selector`.
    pub(crate) fn with_endpoints(mut self, selector: &str, names: &[&str]) -> Self {
        let endpoints = names
            .iter()
            .map(|name| Endpoint::new(*name, "default"))
            .collect();
        self.endpoints.insert(selector.to_string(), endpoints);
        self
    }

    /// Resolving `selector` fails.
    pub(crate) fn failing(mut self, selector: &str) -> Self {
        self.failing.insert(selector.to_string());
        self
    }

    /// Resolving `selector` panics, taking the calling task down.
    pub(crate) fn panicking(mut self, selector: &str) -> Self {
        self.panicking.insert(selector.to_string());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl EndpointResolver for FakeResolver {
    async fn resolve(
        &self,
        _namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Endpoint>, ClusterError> {
        *self.calls.lock().unwrap() += 1;
        let key = selector.to_string();
        if self.panicking.contains(&key) {
            panic!("resolver crashed on {key}");
        }
        if self.failing.contains(&key) {
            return Err(ClusterError::Io(std::io::Error::other("listing unavailable")));
        }
        Ok(self.endpoints.get(&key).cloned().unwrap_or_default())
    }
}

/// Executor that writes a canned profile and records every call.
#[derive(Default)]
pub(crate) struct FakeExecutor {
    failing: HashSet<String>,
    delay: Duration,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeExecutor {
    /// Commands against `endpoint` fail after writing an error line.
    pub(crate) fn failing(mut self, endpoint: &str) -> Self {
        self.failing.insert(endpoint.to_string());
        self
    }

    /// Every command takes `delay` to complete.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// `(endpoint, command)` pairs in call order.
    pub(crate) fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

/// Output written by [`FakeExecutor`] for a successful command.
pub(crate) fn fake_profile(endpoint: &str, command: &[String]) -> String {
    format!("profile from {endpoint}: {}\n", command.join(" "))
}

#[async_trait::async_trait]
impl RemoteExecutor for FakeExecutor {
    async fn exec(
        &self,
        endpoint: &Endpoint,
        command: &[String],
        mut output: std::fs::File,
    ) -> Result<(), ClusterError> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.name.clone(), command.to_vec()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.contains(&endpoint.name) {
            output.write_all(b"error: container not found\n")?;
            return Err(ClusterError::Io(std::io::Error::other("exec refused")));
        }
        output.write_all(fake_profile(&endpoint.name, command).as_bytes())?;
        Ok(())
    }
}
