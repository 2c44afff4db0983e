//! `kubectl`-backed cluster client.
//!
//! Pods are listed with `kubectl get pods -o json` and commands run through
//! `kubectl exec`, so whatever authentication the local kubeconfig carries
//! is reused as-is.

use std::path::PathBuf;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use crate::cluster::{ClusterError, Endpoint, EndpointResolver, LabelSelector, RemoteExecutor};
use crate::config::ClusterConfig;

/// Pod phase of endpoints that can accept commands.
const RUNNING_PHASE: &str = "Running";

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    metadata: PodMetadata,
    #[serde(default)]
    spec: Option<PodSpec>,
    #[serde(default)]
    status: Option<PodStatus>,
}

#[derive(Debug, Deserialize)]
struct PodMetadata {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PodSpec {
    #[serde(default)]
    containers: Vec<Container>,
}

#[derive(Debug, Deserialize)]
struct Container {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PodStatus {
    #[serde(default)]
    phase: Option<String>,
}

/// Decode a `kubectl get pods -o json` document into running endpoints.
///
/// The first declared container of each pod becomes the exec target.
fn parse_pod_list(json: &[u8], namespace: &str) -> Result<Vec<Endpoint>, ClusterError> {
    let list: PodList = serde_json::from_slice(json)?;
    let endpoints = list
        .items
        .into_iter()
        .filter(|pod| {
            pod.status
                .as_ref()
                .and_then(|s| s.phase.as_deref())
                .is_some_and(|phase| phase == RUNNING_PHASE)
        })
        .map(|pod| Endpoint {
            name: pod.metadata.name,
            namespace: pod
                .metadata
                .namespace
                .unwrap_or_else(|| namespace.to_string()),
            container: pod
                .spec
                .and_then(|s| s.containers.into_iter().next())
                .map(|c| c.name),
        })
        .collect();
    Ok(endpoints)
}

/// Cluster client that shells out to `kubectl`.
#[derive(Debug, Clone)]
pub struct KubectlClient {
    program: PathBuf,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
}

impl KubectlClient {
    /// Create a client using the given `kubectl` binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            kubeconfig: None,
            context: None,
        }
    }

    /// Create a client from the `cluster` configuration section.
    pub fn from_config(config: &ClusterConfig) -> Self {
        Self {
            program: PathBuf::from(&config.kubectl),
            kubeconfig: config.kubeconfig.clone(),
            context: config.context.clone(),
        }
    }

    /// Use an explicit kubeconfig file.
    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Use a named kubeconfig context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Global flags shared by every invocation.
    fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ref kubeconfig) = self.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.display().to_string());
        }
        if let Some(ref context) = self.context {
            args.push("--context".to_string());
            args.push(context.clone());
        }
        args
    }

    fn get_pods_args(&self, namespace: &str, selector: &LabelSelector) -> Vec<String> {
        let mut args = self.global_args();
        args.extend(["get", "pods", "--namespace", namespace].map(String::from));
        if !selector.is_empty() {
            args.push("--selector".to_string());
            args.push(selector.to_string());
        }
        args.extend(["--output", "json"].map(String::from));
        args
    }

    fn exec_args(&self, endpoint: &Endpoint, command: &[String]) -> Vec<String> {
        let mut args = self.global_args();
        args.extend(
            [
                "exec",
                "--namespace",
                endpoint.namespace.as_str(),
                endpoint.name.as_str(),
            ]
            .map(String::from),
        );
        if let Some(ref container) = endpoint.container {
            args.push("--container".to_string());
            args.push(container.clone());
        }
        args.push("--".to_string());
        args.extend(command.iter().cloned());
        args
    }
}

impl Default for KubectlClient {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

#[async_trait::async_trait]
impl EndpointResolver for KubectlClient {
    async fn resolve(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Endpoint>, ClusterError> {
        let output = Command::new(&self.program)
            .args(self.get_pods_args(namespace, selector))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ClusterError::Spawn {
                program: self.program_name(),
                source,
            })?;

        if !output.status.success() {
            return Err(ClusterError::CommandFailed {
                command: format!("kubectl get pods -n {namespace} -l {selector}"),
                status: output.status,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let endpoints = parse_pod_list(&output.stdout, namespace)?;
        tracing::debug!(
            namespace = %namespace,
            selector = %selector,
            count = endpoints.len(),
            "Resolved endpoints"
        );
        Ok(endpoints)
    }
}

#[async_trait::async_trait]
impl RemoteExecutor for KubectlClient {
    async fn exec(
        &self,
        endpoint: &Endpoint,
        command: &[String],
        output: std::fs::File,
    ) -> Result<(), ClusterError> {
        let stderr = output.try_clone()?;
        let status = Command::new(&self.program)
            .args(self.exec_args(endpoint, command))
            .stdin(Stdio::null())
            .stdout(Stdio::from(output))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| ClusterError::Spawn {
                program: self.program_name(),
                source,
            })?;

        if !status.success() {
            return Err(ClusterError::CommandFailed {
                command: format!("kubectl exec {endpoint}"),
                status,
                detail: "remote output captured in artifact".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POD_LIST: &str = r#"{
        "apiVersion": "v1",
        "kind": "List",
        "items": [
            {
                "metadata": {"name": "api-0", "namespace": "prod"},
                "spec": {"containers": [{"name": "server"}, {"name": "sidecar"}]},
                "status": {"phase": "Running"}
            },
            {
                "metadata": {"name": "api-1", "namespace": "prod"},
                "spec": {"containers": [{"name": "server"}]},
                "status": {"phase": "Pending"}
            },
            {
                "metadata": {"name": "api-2"},
                "spec": {"containers": []},
                "status": {"phase": "Running"}
            }
        ]
    }"#;

    #[test]
    fn test_parse_pod_list_keeps_running_pods() {
        let endpoints = parse_pod_list(POD_LIST.as_bytes(), "fallback").unwrap();
        assert_eq!(endpoints.len(), 2);

        assert_eq!(endpoints[0].name, "api-0");
        assert_eq!(endpoints[0].namespace, "prod");
        assert_eq!(endpoints[0].container.as_deref(), Some("server"));

        assert_eq!(endpoints[1].name, "api-2");
        assert_eq!(endpoints[1].namespace, "fallback");
        assert_eq!(endpoints[1].container, None);
    }

    #[test]
    fn test_parse_pod_list_empty_and_invalid() {
        assert!(parse_pod_list(br#"{"items": []}"#, "ns").unwrap().is_empty());
        assert!(parse_pod_list(b"{}", "ns").unwrap().is_empty());

        let err = parse_pod_list(b"not json", "ns").unwrap_err();
        assert!(matches!(err, ClusterError::Decode(_)));
    }

    #[test]
    fn test_get_pods_args() {
        let client = KubectlClient::default().with_context("staging");
        let selector = LabelSelector::new().with_label("app", "api");

        let args = client.get_pods_args("prod", &selector);
        assert_eq!(
            args,
            [
                "--context", "staging", "get", "pods", "--namespace", "prod", "--selector",
                "app=api", "--output", "json"
            ]
        );

        let args = client.get_pods_args("prod", &LabelSelector::new());
        assert!(!args.contains(&"--selector".to_string()));
    }

    #[test]
    fn test_exec_args() {
        let client = KubectlClient::new("/usr/local/bin/kubectl").with_kubeconfig("/tmp/kc");
        let endpoint = Endpoint::new("api-0", "prod").with_container("server");
        let command = vec!["curl".to_string(), "-sSLk".to_string(), "http://x".to_string()];

        let args = client.exec_args(&endpoint, &command);
        assert_eq!(
            args,
            [
                "--kubeconfig", "/tmp/kc", "exec", "--namespace", "prod", "api-0", "--container",
                "server", "--", "curl", "-sSLk", "http://x"
            ]
        );
    }

    #[test]
    fn test_from_config() {
        let config = ClusterConfig {
            kubectl: "/opt/kubectl".to_string(),
            kubeconfig: Some(PathBuf::from("/etc/kube/config")),
            context: None,
        };
        let client = KubectlClient::from_config(&config);
        assert_eq!(client.program, PathBuf::from("/opt/kubectl"));
        assert_eq!(client.global_args(), ["--kubeconfig", "/etc/kube/config"]);
    }

    #[tokio::test]
    async fn test_resolve_missing_binary_is_spawn_error() {
        let client = KubectlClient::new("/nonexistent/podprof-test-kubectl");
        let err = client
            .resolve("default", &LabelSelector::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Spawn { .. }));
        assert!(err.to_string().contains("podprof-test-kubectl"));
    }
}
