//! Explicit registry of available workloads.
//!
//! The registry is built once at start-up and handed to the driver. It is
//! append-only while being built and read-only afterwards, so lookups from
//! shared references need no synchronization.

use crate::error::RegistryError;
use crate::plugin::Workload;
use std::sync::Arc;

#[derive(Default, Clone)]
pub struct WorkloadRegistry {
    workloads: Vec<Arc<dyn Workload>>,
}

impl WorkloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workload. Names must be unique.
    pub fn register(&mut self, workload: Arc<dyn Workload>) -> Result<(), RegistryError> {
        if self.get(workload.name()).is_some() {
            return Err(RegistryError::Duplicate(workload.name().to_string()));
        }
        self.workloads.push(workload);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Workload>> {
        self.workloads.iter().find(|w| w.name() == name).cloned()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.workloads.iter().map(|w| w.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Workload>> {
        self.workloads.iter()
    }

    pub fn len(&self) -> usize {
        self.workloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workloads.is_empty()
    }
}

impl std::fmt::Debug for WorkloadRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkloadRegistry")
            .field("workloads", &self.names())
            .finish()
    }
}
