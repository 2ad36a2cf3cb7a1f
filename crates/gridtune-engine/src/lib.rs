//! Gridtune allocation engine.
//!
//! Converts a node's hardware inventory and service classes into a
//! validated set of named settings without overcommitting the node's CPU
//! or RAM budget, and estimates fleet-capacity bounds from observed
//! workload timing.
//!
//! # Components
//!
//! - **`memory`** — Tiered per-worker memory sizing with near-boundary rounding
//! - **`allocator`** — Per-role allocation functions and the budget validator
//! - **`capacity`** — Queueing-theory fleet-capacity estimates
//!
//! The engine is purely computational: no I/O, no shared state across
//! calls. Each calculation is an independent function of its inputs.

pub mod allocator;
pub mod capacity;
pub mod memory;

pub use allocator::Allocator;
pub use capacity::CapacityModel;
pub use memory::{fit_to_memory, nearest_power_of_two};
