//! Core measurement traits and types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::config::MeasurementConfig;

/// Minimum allowed collection interval (1 second).
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Errors reported by measurements and the registry.
#[derive(Debug, Error)]
pub enum MeasurementError {
    /// Invalid or missing options.
    #[error("config error: {0}")]
    Config(String),

    /// The artifact directory could not be created.
    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDirectory {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `start` was called more than once.
    #[error("measurement already started")]
    AlreadyStarted,

    /// `stop` was called before `start`.
    #[error("measurement has not been started")]
    NotStarted,

    /// `stop` was called on a measurement that is already stopped.
    #[error("measurement already stopped")]
    AlreadyStopped,

    /// The collection loop did not exit within the bounded wait.
    #[error("measurement did not stop within {0:?}")]
    StopTimeout(Duration),

    /// The collection loop task panicked or was cancelled.
    #[error("measurement task failed: {0}")]
    Task(String),

    /// A measurement with this name is already registered.
    #[error("measurement already registered: {0}")]
    AlreadyRegistered(String),
}

impl MeasurementError {
    /// Whether this error should abort the whole process.
    ///
    /// A measurement without a place to write artifacts cannot do anything
    /// useful, so a missing output directory is treated as a broken setup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutputDirectory { .. })
    }
}

/// Result of stopping a measurement.
///
/// Carries both an exit code and an optional error: an error without a
/// non-zero code is logged but does not change the process status.
#[derive(Debug)]
pub struct StopStatus {
    /// Exit code; zero means success.
    pub code: i32,
    /// Error to report, if any.
    pub error: Option<MeasurementError>,
}

impl StopStatus {
    /// Stopped cleanly.
    pub fn ok() -> Self {
        Self {
            code: 0,
            error: None,
        }
    }

    /// Stopped with an error that does not affect the exit code.
    pub fn warn(error: MeasurementError) -> Self {
        Self {
            code: 0,
            error: Some(error),
        }
    }

    /// Stopped with an operational failure.
    pub fn failed(code: i32, error: MeasurementError) -> Self {
        Self {
            code,
            error: Some(error),
        }
    }
}

/// Core measurement trait.
///
/// # Lifecycle
///
/// 1. `set_config` is called exactly once by the registry before the
///    measurement becomes reachable; the `&mut self` receiver enforces this.
/// 2. `start` is run as an independent task by the lifecycle controller and
///    owns all subsequent execution. It returns once the measurement is
///    running; an error means it never started.
/// 3. `stop` ends the measurement and reports an exit code. Calling it before
///    `start` or twice must fail with an error rather than block.
#[async_trait::async_trait]
pub trait Measurement: Send + Sync + 'static {
    /// Implementation name, as referenced from configuration.
    fn kind(&self) -> &'static str;

    /// Apply the configured options.
    fn set_config(&mut self, config: MeasurementConfig) -> Result<(), MeasurementError>;

    /// Begin measuring.
    async fn start(&self) -> Result<(), MeasurementError>;

    /// Stop measuring and report an exit code.
    async fn stop(&self) -> StopStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_directory_error_is_fatal() {
        let err = MeasurementError::OutputDirectory {
            path: PathBuf::from("/proc/podprof"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("/proc/podprof"));

        assert!(!MeasurementError::NotStarted.is_fatal());
        assert!(!MeasurementError::StopTimeout(Duration::from_secs(1)).is_fatal());
    }

    #[test]
    fn test_stop_status_constructors() {
        let ok = StopStatus::ok();
        assert_eq!(ok.code, 0);
        assert!(ok.error.is_none());

        let warn = StopStatus::warn(MeasurementError::AlreadyStopped);
        assert_eq!(warn.code, 0);
        assert!(matches!(warn.error, Some(MeasurementError::AlreadyStopped)));

        let failed = StopStatus::failed(2, MeasurementError::Task("boom".into()));
        assert_eq!(failed.code, 2);
        assert!(failed.error.unwrap().to_string().contains("boom"));
    }
}
