//! Periodic pprof collection measurement.
//!
//! Every pass resolves each target's endpoints again and collects one
//! profile per endpoint concurrently, then waits for all of them before the
//! next tick is considered.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::cluster::{Cluster, Endpoint, EndpointResolver};
use crate::config::{MeasurementConfig, PprofTarget, expand_env_vars};
use crate::measurement::pprof::remote::collect_endpoint;
use crate::measurement::{MIN_INTERVAL, Measurement, MeasurementError, StopStatus};

/// Name the pprof measurement is registered under.
pub const PPROF_MEASUREMENT: &str = "pprof";

/// Exit code reported when the loop does not shut down cleanly.
const STOP_FAILURE_CODE: i32 = 1;

/// Options applied by `set_config`.
#[derive(Debug)]
struct PprofSettings {
    directory: PathBuf,
    interval: Duration,
    targets: Vec<PprofTarget>,
    stop_timeout: Duration,
}

impl PprofSettings {
    fn from_config(config: MeasurementConfig) -> Result<Self, MeasurementError> {
        let interval = config.collection_interval.ok_or_else(|| {
            MeasurementError::Config(format!(
                "measurement '{}': collection_interval is required",
                config.name
            ))
        })?;
        let interval = if interval < MIN_INTERVAL {
            tracing::warn!(
                measurement = %config.name,
                min_interval = ?MIN_INTERVAL,
                "Collection interval is less than minimum allowed. Using minimum duration."
            );
            MIN_INTERVAL
        } else {
            interval
        };

        let targets = config
            .targets
            .into_iter()
            .map(|mut target| {
                target.bearer_token = target
                    .bearer_token
                    .map(|token| expand_env_vars(&token))
                    .filter(|token| !token.is_empty());
                target
            })
            .collect();

        Ok(Self {
            directory: config.output_directory,
            interval,
            targets,
            stop_timeout: config.stop_timeout,
        })
    }
}

/// Summary of one collection pass.
#[derive(Debug, Default)]
pub struct PassSummary {
    /// Endpoints resolved across all targets.
    pub endpoints: usize,
    /// Artifacts written by successful collections, sorted.
    pub artifacts: Vec<PathBuf>,
    /// Collections that failed.
    pub failures: usize,
}

enum State {
    Idle,
    Running {
        cancel: CancellationToken,
        task: JoinHandle<()>,
    },
    Stopped,
}

/// Measurement collecting pprof profiles from pods on a fixed interval.
///
/// State machine: idle until `start`, running until `stop`, then stopped for
/// good.
pub struct PprofMeasurement {
    cluster: Cluster,
    settings: Option<Arc<PprofSettings>>,
    state: Mutex<State>,
}

impl PprofMeasurement {
    /// Create an unconfigured measurement using `cluster`.
    pub fn new(cluster: Cluster) -> Self {
        Self {
            cluster,
            settings: None,
            state: Mutex::new(State::Idle),
        }
    }

    fn settings(&self) -> Result<&Arc<PprofSettings>, MeasurementError> {
        self.settings
            .as_ref()
            .ok_or_else(|| MeasurementError::Config("measurement is not configured".to_string()))
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run one collection pass outside the periodic loop.
    pub async fn collect_once(&self) -> Result<PassSummary, MeasurementError> {
        Ok(collect_pass(&self.cluster, self.settings()?).await)
    }
}

impl std::fmt::Debug for PprofMeasurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PprofMeasurement")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Measurement for PprofMeasurement {
    fn kind(&self) -> &'static str {
        PPROF_MEASUREMENT
    }

    fn set_config(&mut self, config: MeasurementConfig) -> Result<(), MeasurementError> {
        self.settings = Some(Arc::new(PprofSettings::from_config(config)?));
        Ok(())
    }

    async fn start(&self) -> Result<(), MeasurementError> {
        let settings = Arc::clone(self.settings()?);

        let (first_pass_tx, first_pass_rx) = oneshot::channel();
        {
            let mut state = self.state();
            match *state {
                State::Idle => {}
                State::Running { .. } => return Err(MeasurementError::AlreadyStarted),
                State::Stopped => return Err(MeasurementError::AlreadyStopped),
            }
            create_output_directory(&settings.directory)?;

            let cancel = CancellationToken::new();
            let task = tokio::spawn(run_loop(
                self.cluster.clone(),
                settings,
                cancel.clone(),
                first_pass_tx,
            ));
            *state = State::Running { cancel, task };
        }

        // The first pass runs before any tick; `start` returns once it is done.
        let summary = first_pass_rx.await.map_err(|_| {
            MeasurementError::Task("collection loop exited during the first pass".to_string())
        })?;
        tracing::info!(
            endpoints = summary.endpoints,
            artifacts = summary.artifacts.len(),
            failures = summary.failures,
            "Initial pprof collection complete"
        );
        Ok(())
    }

    async fn stop(&self) -> StopStatus {
        let (cancel, task) = {
            let mut state = self.state();
            match std::mem::replace(&mut *state, State::Stopped) {
                State::Running { cancel, task } => (cancel, task),
                // Stopped is terminal, so a start still in flight spawns nothing.
                State::Idle => return StopStatus::warn(MeasurementError::NotStarted),
                State::Stopped => return StopStatus::warn(MeasurementError::AlreadyStopped),
            }
        };

        cancel.cancel();
        let stop_timeout = self
            .settings
            .as_ref()
            .map_or(crate::config::DEFAULT_STOP_TIMEOUT, |s| s.stop_timeout);

        // A pass in progress is not interrupted; the loop exits after it joins.
        match tokio::time::timeout(stop_timeout, task).await {
            Ok(Ok(())) => StopStatus::ok(),
            Ok(Err(e)) => {
                StopStatus::failed(STOP_FAILURE_CODE, MeasurementError::Task(e.to_string()))
            }
            Err(_) => StopStatus::failed(
                STOP_FAILURE_CODE,
                MeasurementError::StopTimeout(stop_timeout),
            ),
        }
    }
}

fn create_output_directory(directory: &std::path::Path) -> Result<(), MeasurementError> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o744);
    }
    builder
        .create(directory)
        .map_err(|source| MeasurementError::OutputDirectory {
            path: directory.to_path_buf(),
            source,
        })
}

async fn run_loop(
    cluster: Cluster,
    settings: Arc<PprofSettings>,
    cancel: CancellationToken,
    first_pass: oneshot::Sender<PassSummary>,
) {
    let summary = collect_pass(&cluster, &settings).await;
    let _ = first_pass.send(summary);

    let mut ticker = tokio::time::interval_at(Instant::now() + settings.interval, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("pprof collection loop stopped");
                return;
            }
            _ = ticker.tick() => {
                let summary = collect_pass(&cluster, &settings).await;
                tracing::debug!(
                    endpoints = summary.endpoints,
                    artifacts = summary.artifacts.len(),
                    failures = summary.failures,
                    "pprof collection pass complete"
                );
            }
        }
    }
}

/// Current endpoints of `target`; empty when resolution fails.
async fn resolve_endpoints(resolver: &dyn EndpointResolver, target: &PprofTarget) -> Vec<Endpoint> {
    match resolver
        .resolve(&target.namespace, &target.label_selector)
        .await
    {
        Ok(endpoints) => endpoints
            .into_iter()
            .map(|mut endpoint| {
                if let Some(ref container) = target.container {
                    endpoint.container = Some(container.clone());
                }
                endpoint
            })
            .collect(),
        Err(e) => {
            tracing::error!(
                target_name = %target.name,
                namespace = %target.namespace,
                selector = %target.label_selector,
                error = %e,
                "Error listing endpoints"
            );
            Vec::new()
        }
    }
}

/// Resolve every target and collect from all endpoints concurrently.
async fn collect_pass(cluster: &Cluster, settings: &PprofSettings) -> PassSummary {
    let mut summary = PassSummary::default();
    let mut tasks = JoinSet::new();

    for target in &settings.targets {
        tracing::info!(target_name = %target.name, "Collecting pprof");
        let endpoints = resolve_endpoints(cluster.resolver().as_ref(), target).await;
        summary.endpoints += endpoints.len();

        for endpoint in endpoints {
            let executor = Arc::clone(cluster.executor());
            let directory = settings.directory.clone();
            let target = target.clone();
            tasks.spawn(async move {
                collect_endpoint(executor.as_ref(), &directory, &target, &endpoint).await
            });
        }
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(path)) => summary.artifacts.push(path),
            Ok(Err(_)) => summary.failures += 1,
            Err(e) => {
                tracing::error!(error = %e, "pprof collection task failed");
                summary.failures += 1;
            }
        }
    }

    summary.artifacts.sort();
    summary
}
