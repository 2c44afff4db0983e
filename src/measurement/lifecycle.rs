//! Starting and stopping every registered measurement.

use tokio::sync::mpsc;

use crate::measurement::{MeasurementError, MeasurementRegistry};

/// Outcome of one measurement's `start`.
#[derive(Debug)]
pub struct StartReport {
    /// Registered measurement name.
    pub name: String,
    /// What `start` returned.
    pub result: Result<(), MeasurementError>,
}

impl StartReport {
    /// Whether this report should abort the process.
    pub fn is_fatal(&self) -> bool {
        self.result.as_ref().is_err_and(MeasurementError::is_fatal)
    }
}

/// Stream of [`StartReport`]s from the tasks launched by
/// [`MeasurementRegistry::start_all`].
///
/// Dropping it does not affect the measurements; their reports are then
/// only visible in the logs.
#[derive(Debug)]
pub struct StartReports {
    rx: mpsc::UnboundedReceiver<StartReport>,
}

impl StartReports {
    /// Wait for the next report.
    ///
    /// Returns `None` once every start task has finished reporting (a task
    /// that panics never reports).
    pub async fn next(&mut self) -> Option<StartReport> {
        self.rx.recv().await
    }

    /// Wait for all outstanding reports.
    pub async fn collect(mut self) -> Vec<StartReport> {
        let mut reports = Vec::new();
        while let Some(report) = self.next().await {
            reports.push(report);
        }
        reports
    }
}

impl MeasurementRegistry {
    /// Launch `start` for every measurement as an independent task.
    ///
    /// Returns as soon as all tasks are spawned. Must be called from within a
    /// Tokio runtime.
    pub fn start_all(&self) -> StartReports {
        let (tx, rx) = mpsc::unbounded_channel();

        for (name, measurement) in self.iter() {
            let (name, measurement, tx) = (name.to_owned(), measurement.clone(), tx.clone());
            tracing::info!(measurement = %name, "Starting measurement");

            tokio::spawn(async move {
                let result = measurement.start().await;
                match &result {
                    Ok(()) => tracing::info!(measurement = %name, "Measurement started"),
                    Err(e) if e.is_fatal() => {
                        tracing::error!(measurement = %name, error = %e, "Measurement cannot run")
                    }
                    Err(e) => {
                        tracing::error!(measurement = %name, error = %e, "Measurement failed to start")
                    }
                }
                // Receiver may be gone; the log line above is the fallback.
                let _ = tx.send(StartReport { name, result });
            });
        }

        StartReports { rx }
    }

    /// Stop every measurement in registration order and aggregate exit codes.
    ///
    /// Errors are logged and never prevent the remaining measurements from
    /// being stopped. The result is the last non-zero code seen, or 0 when
    /// every measurement stopped cleanly.
    pub async fn stop_all(&self) -> i32 {
        let mut rc = 0;

        for (name, measurement) in self.iter() {
            tracing::info!(measurement = %name, "Stopping measurement");
            let status = measurement.stop().await;

            if let Some(e) = &status.error {
                tracing::error!(measurement = %name, code = status.code, error = %e, "Error stopping measurement");
            }
            if status.code != 0 {
                rc = status.code;
            }
        }

        rc
    }
}
