//! Shared types used across Gridtune crates.
//!
//! These are the structures exchanged with the inventory source and the
//! orchestration layer: what a node looks like ([`NodeProfile`]), what the
//! caller may override ([`AllocationOptions`]), and what a calculation
//! produces ([`SettingsLedger`]) or why it produced nothing ([`Rejection`]).

pub mod error;
pub mod ledger;
pub mod profile;

pub use error::{Rejection, Resource, TuneResult};
pub use ledger::{LedgerTotals, ResourceBudget, SettingValue, SettingsLedger};
pub use profile::{AllocationOptions, NodeProfile, ServiceClasses, TopologyFlags};
