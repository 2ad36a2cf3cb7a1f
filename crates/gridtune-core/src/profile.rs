//! Node inventory types.
//!
//! A [`NodeProfile`] is produced by an external inventory source and handed
//! to the engine as-is. The engine never queries anything itself.

use serde::{Deserialize, Serialize};

/// Service classes deployed on a node.
///
/// A node can carry any combination; the primary role function allocates
/// for each class it finds present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceClasses {
    /// The primary application server (hosts the worker pool).
    pub server: bool,
    /// Web console service.
    pub console: bool,
    /// Data-store query service (command processing + read/write pools).
    pub datastore: bool,
    /// Backing relational database.
    pub database: bool,
    /// Job orchestrator service.
    pub orchestrator: bool,
    /// Legacy message-queue broker.
    pub broker: bool,
}

/// Deployment-shape flags that change allocation percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyFlags {
    /// Node is the primary in a monolithic deployment.
    pub monolithic_primary: bool,
    /// Node is a replica of the primary.
    pub replica_primary: bool,
    /// Node is a dedicated compile node.
    pub compile_node: bool,
    /// Node is a compiler (server plus co-located datastore).
    pub compiler: bool,
    /// The deployment has dedicated compile nodes elsewhere.
    pub with_compile_nodes: bool,
    /// The orchestrator runs its own worker pool.
    pub orchestrator_worker_pool: bool,
    /// The server runtime supports a reserved code cache.
    pub modern_worker_runtime: bool,
}

/// Hardware and service inventory for a single node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeProfile {
    /// Core count. Must be positive.
    pub cpu: u64,
    /// RAM in megabytes. Must be positive.
    pub ram_mb: u64,
    /// Service classes present on the node.
    pub classes: ServiceClasses,
    /// Deployment-shape flags.
    pub topology: TopologyFlags,
    /// Currently configured memory per worker in MB, if any. Takes effect
    /// when present and nonzero.
    pub current_memory_per_worker: Option<u64>,
}

impl NodeProfile {
    /// A bare profile with the given hardware and nothing deployed.
    pub fn new(cpu: u64, ram_mb: u64) -> Self {
        Self {
            cpu,
            ram_mb,
            classes: ServiceClasses::default(),
            topology: TopologyFlags::default(),
            current_memory_per_worker: None,
        }
    }
}

/// Caller-supplied overrides, fixed for the lifetime of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationOptions {
    /// Memory per worker in MB. Overrides the tiered default.
    pub memory_per_worker: Option<u64>,
    /// Memory reserved for the operating system in MB. Defaults to 1024
    /// when unset or zero.
    pub memory_reserved_for_os: Option<u64>,
}
