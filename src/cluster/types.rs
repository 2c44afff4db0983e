//! Endpoint and selector types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A live, addressable workload matched by a selector at resolution time.
///
/// Endpoints are never cached: every collection pass resolves them again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Endpoint identity (pod name). Used in artifact names.
    pub name: String,
    /// Namespace the endpoint lives in.
    pub namespace: String,
    /// Container to run commands in. `None` lets the executor pick.
    pub container: Option<String>,
}

impl Endpoint {
    /// Create an endpoint without an explicit container.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            container: None,
        }
    }

    /// Set the container.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Equality-based label selector.
///
/// Renders as `key=value` pairs joined by commas, keys in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSelector(BTreeMap<String, String>);

impl LabelSelector {
    /// Create an empty selector (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `key=value` requirement.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// True if the selector has no requirements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the requirements in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, String>> for LabelSelector {
    fn from(labels: BTreeMap<String, String>) -> Self {
        Self(labels)
    }
}

impl std::fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_renders_sorted() {
        let selector = LabelSelector::new()
            .with_label("tier", "backend")
            .with_label("app", "api");
        assert_eq!(selector.to_string(), "app=api,tier=backend");
    }

    #[test]
    fn test_selector_empty() {
        let selector = LabelSelector::new();
        assert!(selector.is_empty());
        assert_eq!(selector.to_string(), "");
    }

    #[test]
    fn test_selector_from_yaml_map() {
        let selector: LabelSelector = serde_yaml::from_str("{app: api, env: prod}").unwrap();
        assert_eq!(selector.to_string(), "app=api,env=prod");
    }

    #[test]
    fn test_endpoint_display() {
        let endpoint = Endpoint::new("api-0", "default").with_container("server");
        assert_eq!(endpoint.to_string(), "default/api-0");
        assert_eq!(endpoint.container.as_deref(), Some("server"));
    }
}
