//! Per-endpoint profile collection.
//!
//! One call of [`collect_endpoint`] produces at most one artifact: the
//! combined output of fetching the target URL from inside the endpoint.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cluster::{ClusterError, Endpoint, RemoteExecutor};
use crate::config::PprofTarget;

/// File extension of profile artifacts.
pub const ARTIFACT_EXTENSION: &str = "pprof";

/// Name variants tried before giving up on a colliding artifact.
const MAX_NAME_ATTEMPTS: u32 = 16;

/// Errors from one endpoint's collection. Never propagated past the pass.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The artifact file could not be created.
    #[error("failed to create artifact: {0}")]
    Artifact(#[source] io::Error),

    /// The remote command could not be dispatched or failed.
    #[error("remote command failed: {0}")]
    Remote(#[from] ClusterError),
}

/// Command run inside the endpoint to fetch the profile.
///
/// A bearer credential only adds an authorization header; the rest of the
/// command is identical.
pub fn profile_command(target: &PprofTarget) -> Vec<String> {
    let mut command = vec!["curl".to_string(), "-sSLk".to_string()];
    if let Some(token) = target.bearer_token.as_deref().filter(|t| !t.is_empty()) {
        command.push("-H".to_string());
        command.push(format!("Authorization: Bearer {token}"));
    }
    command.push(target.url.clone());
    command
}

/// Artifact file name for one `(target, endpoint, timestamp)` triple.
pub fn artifact_name(target: &str, endpoint: &str, timestamp: i64) -> String {
    format!("{target}-{endpoint}-{timestamp}.{ARTIFACT_EXTENSION}")
}

/// Create a new artifact, never overwriting an existing one.
///
/// A second collection for the same endpoint within the same second gets a
/// `-1`, `-2`, ... suffix before the extension.
fn create_artifact(
    directory: &Path,
    target: &str,
    endpoint: &str,
    timestamp: i64,
) -> io::Result<(PathBuf, File)> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            artifact_name(target, endpoint, timestamp)
        } else {
            format!("{target}-{endpoint}-{timestamp}-{attempt}.{ARTIFACT_EXTENSION}")
        };
        let path = directory.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!(
            "{} and {} variants already exist",
            artifact_name(target, endpoint, timestamp),
            MAX_NAME_ATTEMPTS - 1
        ),
    ))
}

/// Collect one profile from one endpoint into `directory`.
///
/// Failures are logged with target and endpoint context and returned for
/// accounting only; they never affect sibling collections.
pub async fn collect_endpoint(
    executor: &dyn RemoteExecutor,
    directory: &Path,
    target: &PprofTarget,
    endpoint: &Endpoint,
) -> Result<PathBuf, CollectError> {
    let timestamp = chrono::Utc::now().timestamp();

    let (path, file) = create_artifact(directory, &target.name, &endpoint.name, timestamp)
        .map_err(CollectError::Artifact)
        .inspect_err(|e| {
            tracing::error!(
                target_name = %target.name,
                endpoint = %endpoint,
                error = %e,
                "Error creating pprof artifact"
            );
        })?;

    let command = profile_command(target);
    executor
        .exec(endpoint, &command, file)
        .await
        .inspect_err(|e| {
            tracing::error!(
                target_name = %target.name,
                endpoint = %endpoint,
                artifact = %path.display(),
                error = %e,
                "Failed to get pprof results"
            );
        })?;

    tracing::debug!(
        target_name = %target.name,
        endpoint = %endpoint,
        artifact = %path.display(),
        "Collected pprof"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::testing::{FakeExecutor, fake_profile};

    fn target() -> PprofTarget {
        PprofTarget::new("api", "default", "https://localhost:6060/debug/pprof/heap")
    }

    #[test]
    fn test_profile_command_without_credential() {
        assert_eq!(
            profile_command(&target()),
            ["curl", "-sSLk", "https://localhost:6060/debug/pprof/heap"]
        );
    }

    #[test]
    fn test_profile_command_with_credential() {
        let with_token = target().with_bearer_token("s3cr3t");
        let command = profile_command(&with_token);
        assert_eq!(
            command,
            [
                "curl",
                "-sSLk",
                "-H",
                "Authorization: Bearer s3cr3t",
                "https://localhost:6060/debug/pprof/heap"
            ]
        );
        assert_ne!(command, profile_command(&target()));
    }

    #[test]
    fn test_profile_command_ignores_empty_credential() {
        let empty = target().with_bearer_token("");
        assert_eq!(profile_command(&empty), profile_command(&target()));
    }

    #[test]
    fn test_artifact_name() {
        assert_eq!(artifact_name("api", "e1", 1_700_000_000), "api-e1-1700000000.pprof");
    }

    #[test]
    fn test_create_artifact_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();

        let (first, _) = create_artifact(dir.path(), "api", "e1", 42).unwrap();
        std::fs::write(&first, "original").unwrap();
        let (second, _) = create_artifact(dir.path(), "api", "e1", 42).unwrap();
        let (third, _) = create_artifact(dir.path(), "api", "e1", 42).unwrap();

        assert_eq!(first, dir.path().join("api-e1-42.pprof"));
        assert_eq!(second, dir.path().join("api-e1-42-1.pprof"));
        assert_eq!(third, dir.path().join("api-e1-42-2.pprof"));
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "original");
    }

    #[test]
    fn test_create_artifact_gives_up_after_bound() {
        let dir = tempfile::tempdir().unwrap();
        for _ in 0..MAX_NAME_ATTEMPTS {
            create_artifact(dir.path(), "api", "e1", 7).unwrap();
        }
        let err = create_artifact(dir.path(), "api", "e1", 7).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_collect_endpoint_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let executor = FakeExecutor::default();
        let endpoint = Endpoint::new("e1", "default");

        let path = collect_endpoint(&executor, dir.path(), &target(), &endpoint)
            .await
            .unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("api-e1-"));
        assert!(name.ends_with(".pprof"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, fake_profile("e1", &profile_command(&target())));
    }

    #[tokio::test]
    async fn test_collect_endpoint_remote_failure_keeps_output() {
        let dir = tempfile::tempdir().unwrap();
        let executor = FakeExecutor::default().failing("e1");
        let endpoint = Endpoint::new("e1", "default");

        let err = collect_endpoint(&executor, dir.path(), &target(), &endpoint)
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::Remote(_)));

        // The error output streamed before the failure stays in the artifact.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_collect_endpoint_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let executor = FakeExecutor::default();

        let err = collect_endpoint(&executor, &missing, &target(), &Endpoint::new("e1", "ns"))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::Artifact(_)));
        assert!(executor.calls().is_empty());
    }
}
