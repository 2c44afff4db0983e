//! Mock measurement for registry and lifecycle tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::MeasurementConfig;
use crate::measurement::{Measurement, MeasurementError, StopStatus};

#[derive(Default)]
struct ProbeState {
    configured_dirs: Mutex<Vec<String>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

/// Shared view into a [`MockMeasurement`], plus its scripted behavior.
#[derive(Clone, Default)]
pub(crate) struct MockProbe {
    state: Arc<ProbeState>,
    reject_config: bool,
    fail_start: bool,
    stop_code: i32,
    stop_error: bool,
}

impl MockProbe {
    pub(crate) fn reject_config(mut self) -> Self {
        self.reject_config = true;
        self
    }

    pub(crate) fn fail_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub(crate) fn stop_code(mut self, code: i32) -> Self {
        self.stop_code = code;
        self
    }

    pub(crate) fn stop_error(mut self) -> Self {
        self.stop_error = true;
        self
    }

    pub(crate) fn configured_dirs(&self) -> Vec<String> {
        self.state
            .configured_dirs
            .lock()
            .unwrap()
            .clone()
    }

    pub(crate) fn starts(&self) -> usize {
        self.state.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn stops(&self) -> usize {
        self.state.stops.load(Ordering::SeqCst)
    }
}

pub(crate) struct MockMeasurement {
    probe: MockProbe,
}

impl MockMeasurement {
    pub(crate) fn new(probe: MockProbe) -> Self {
        Self { probe }
    }
}

#[async_trait::async_trait]
impl Measurement for MockMeasurement {
    fn kind(&self) -> &'static str {
        "mock"
    }

    fn set_config(&mut self, config: MeasurementConfig) -> Result<(), MeasurementError> {
        if self.probe.reject_config {
            return Err(MeasurementError::Config("rejected".to_string()));
        }
        self.probe
            .state
            .configured_dirs
            .lock()
            .unwrap()
            .push(config.output_directory.display().to_string());
        Ok(())
    }

    async fn start(&self) -> Result<(), MeasurementError> {
        self.probe.state.starts.fetch_add(1, Ordering::SeqCst);
        if self.probe.fail_start {
            return Err(MeasurementError::OutputDirectory {
                path: "/unwritable".into(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        Ok(())
    }

    async fn stop(&self) -> StopStatus {
        self.probe.state.stops.fetch_add(1, Ordering::SeqCst);
        match (self.probe.stop_code, self.probe.stop_error) {
            (0, false) => StopStatus::ok(),
            (0, true) => StopStatus::warn(MeasurementError::AlreadyStopped),
            (code, _) => StopStatus::failed(code, MeasurementError::Task("scripted".to_string())),
        }
    }
}
