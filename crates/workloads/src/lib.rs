//! Workload plugins for vector database benchmarking.
//!
//! - [`Ecommerce`] - product catalogue with similarity search, carts and orders
//! - [`KnowledgeBase`] - article store with retrieval-style semantic search
//!
//! # Example
//!
//! ```rust
//! let registry = workloads::default_registry().unwrap();
//! assert_eq!(registry.names(), vec!["ecommerce", "knowledge_base"]);
//! ```

pub mod ecommerce;
pub mod knowledge_base;
pub mod support;
pub mod text;

pub use ecommerce::Ecommerce;
pub use knowledge_base::KnowledgeBase;

use std::sync::Arc;
use workload_core::{RegistryError, WorkloadRegistry};

/// Registry holding every built-in workload.
pub fn default_registry() -> Result<WorkloadRegistry, RegistryError> {
    let mut registry = WorkloadRegistry::new();
    registry.register(Arc::new(Ecommerce::new()))?;
    registry.register(Arc::new(KnowledgeBase::new()))?;
    Ok(registry)
}
