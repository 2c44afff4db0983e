//! Measurement catalog and registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cluster::Cluster;
use crate::config::MeasurementConfig;
use crate::measurement::pprof::{PPROF_MEASUREMENT, PprofMeasurement};
use crate::measurement::{Measurement, MeasurementError};

type Constructor = Box<dyn Fn(&Cluster) -> Box<dyn Measurement> + Send + Sync>;

/// Table of available measurement implementations, keyed by name.
pub struct Catalog {
    constructors: BTreeMap<String, Constructor>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Catalog with every implementation shipped in this crate.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert(PPROF_MEASUREMENT, |cluster| {
            Box::new(PprofMeasurement::new(cluster.clone()))
        });
        catalog
    }

    /// Add or replace an implementation.
    pub fn insert<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&Cluster) -> Box<dyn Measurement> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    /// Names of all known implementations, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Whether an implementation with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Create a fresh, unconfigured instance.
    pub fn create(&self, name: &str, cluster: &Cluster) -> Option<Box<dyn Measurement>> {
        self.constructors.get(name).map(|ctor| ctor(cluster))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("names", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A configured, live measurement.
struct Entry {
    name: String,
    measurement: Arc<dyn Measurement>,
}

/// Registry of active measurements.
///
/// Names are unique: the first registration wins and later ones are
/// rejected. Entries keep registration order, so lifecycle operations walk
/// them deterministically.
#[derive(Default)]
pub struct MeasurementRegistry {
    entries: Vec<Entry>,
}

impl MeasurementRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration.
    ///
    /// Entries naming an unknown implementation, duplicates, and entries
    /// whose options are rejected are logged and skipped.
    pub fn build(configs: &[MeasurementConfig], catalog: &Catalog, cluster: &Cluster) -> Self {
        tracing::info!(count = configs.len(), "Creating measurement registry");
        let mut registry = Self::new();

        for config in configs {
            let Some(measurement) = catalog.create(&config.name, cluster) else {
                tracing::warn!(measurement = %config.name, "Measurement not found");
                continue;
            };
            // Failures are logged by `register`.
            let _ = registry.register(config.clone(), measurement);
        }

        registry
    }

    /// Configure and register a measurement under `config.name`.
    ///
    /// # Errors
    /// - `AlreadyRegistered` if the name is taken; the existing entry is kept.
    /// - Any error from the measurement's `set_config`.
    pub fn register(
        &mut self,
        config: MeasurementConfig,
        mut measurement: Box<dyn Measurement>,
    ) -> Result<(), MeasurementError> {
        let name = config.name.clone();
        if self.contains(&name) {
            tracing::warn!(measurement = %name, "Measurement already registered");
            return Err(MeasurementError::AlreadyRegistered(name));
        }

        measurement.set_config(config).inspect_err(|e| {
            tracing::warn!(measurement = %name, error = %e, "Measurement rejected its configuration");
        })?;

        self.entries.push(Entry {
            name: name.clone(),
            measurement: Arc::from(measurement),
        });
        tracing::info!(measurement = %name, "Registered measurement");
        Ok(())
    }

    /// Whether a measurement is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Look up a measurement by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Measurement>> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.measurement)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Number of registered measurements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no measurement is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, measurement)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Measurement>)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), &e.measurement))
    }
}

impl std::fmt::Debug for MeasurementRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementRegistry")
            .field("names", &self.names())
            .finish()
    }
}
