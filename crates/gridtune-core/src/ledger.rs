//! The settings ledger — what a calculation produced and what it cost.
//!
//! A ledger holds the named settings for one node plus a running account of
//! the CPU and RAM charged against the node's physical budget. Role
//! functions build a ledger in a single pass and the validator compares
//! `used` against `total` before the ledger is released to the caller.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single computed setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValue {
    /// A unitless count (threads, workers, connections).
    Count(u64),
    /// A memory size in megabytes.
    Megabytes(u64),
    /// A JVM heap min/max pair, in megabytes.
    JavaHeap { xms_mb: u64, xmx_mb: u64 },
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Count(n) => write!(f, "{n}"),
            SettingValue::Megabytes(mb) => write!(f, "{mb}MB"),
            SettingValue::JavaHeap { xms_mb, xmx_mb } => {
                write!(f, "-Xms{xms_mb}m -Xmx{xmx_mb}m")
            }
        }
    }
}

/// Total versus used for one resource dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBudget {
    pub total: u64,
    pub used: u64,
}

impl ResourceBudget {
    pub fn new(total: u64) -> Self {
        Self { total, used: 0 }
    }

    /// What remains of the budget, saturating at zero.
    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.used)
    }
}

/// The budget account attached to a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub cpu: ResourceBudget,
    pub ram: ResourceBudget,
    /// Resolved per-worker memory size in MB, recorded once by the primary
    /// role function.
    pub mb_per_worker: u64,
}

/// Settings computed for one node, plus the budget they consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsLedger {
    /// Setting name to value. Keys are unique; order is not significant.
    pub params: BTreeMap<String, SettingValue>,
    pub totals: LedgerTotals,
}

impl SettingsLedger {
    /// A fresh ledger for a node with the given physical budget.
    pub fn new(cpu: u64, ram_mb: u64) -> Self {
        Self {
            params: BTreeMap::new(),
            totals: LedgerTotals {
                cpu: ResourceBudget::new(cpu),
                ram: ResourceBudget::new(ram_mb),
                mb_per_worker: 0,
            },
        }
    }

    /// Publish a setting. A second insert under the same key replaces the
    /// first (used when an allocation is revised mid-calculation).
    pub fn set(&mut self, key: &str, value: SettingValue) {
        self.params.insert(key.to_string(), value);
    }

    /// Charge cores against the CPU budget.
    pub fn charge_cpu(&mut self, cores: u64) {
        self.totals.cpu.used += cores;
    }

    /// Charge megabytes against the RAM budget.
    pub fn charge_ram(&mut self, mb: u64) {
        self.totals.ram.used += mb;
    }

    /// Fold another ledger's settings and consumption into this one.
    ///
    /// Used when one role function composes another (a datastore host with
    /// a co-located database): the inner ledger is computed independently
    /// and merged here, never mutated in place.
    pub fn absorb(&mut self, other: &SettingsLedger) {
        for (key, value) in &other.params {
            self.params.insert(key.clone(), value.clone());
        }
        self.totals.cpu.used += other.totals.cpu.used;
        self.totals.ram.used += other.totals.ram.used;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charges_accumulate() {
        let mut ledger = SettingsLedger::new(8, 16384);
        ledger.charge_cpu(2);
        ledger.charge_cpu(5);
        ledger.charge_ram(4096);

        assert_eq!(ledger.totals.cpu.used, 7);
        assert_eq!(ledger.totals.cpu.remaining(), 1);
        assert_eq!(ledger.totals.ram.used, 4096);
    }

    #[test]
    fn set_replaces_existing_key() {
        let mut ledger = SettingsLedger::new(4, 8192);
        ledger.set("orchestrator.java_args", SettingValue::JavaHeap { xms_mb: 512, xmx_mb: 512 });
        ledger.set("orchestrator.java_args", SettingValue::JavaHeap { xms_mb: 1280, xmx_mb: 1280 });

        assert_eq!(ledger.params.len(), 1);
        assert_eq!(
            ledger.params["orchestrator.java_args"],
            SettingValue::JavaHeap { xms_mb: 1280, xmx_mb: 1280 }
        );
    }

    #[test]
    fn absorb_merges_params_and_used_totals() {
        let mut outer = SettingsLedger::new(8, 16384);
        outer.set("datastore.command_processing_threads", SettingValue::Count(4));
        outer.charge_cpu(4);

        let mut inner = SettingsLedger::new(8, 16384);
        inner.set("database.shared_buffers", SettingValue::Megabytes(4096));
        inner.charge_ram(4096);

        outer.absorb(&inner);

        assert_eq!(outer.params.len(), 2);
        assert_eq!(outer.totals.cpu.used, 4);
        assert_eq!(outer.totals.ram.used, 4096);
        // The inner ledger is untouched.
        assert_eq!(inner.totals.ram.used, 4096);
        assert_eq!(inner.params.len(), 1);
    }

    #[test]
    fn remaining_saturates() {
        let budget = ResourceBudget { total: 4, used: 9 };
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn setting_values_render() {
        assert_eq!(SettingValue::Count(3).to_string(), "3");
        assert_eq!(SettingValue::Megabytes(4096).to_string(), "4096MB");
        assert_eq!(
            SettingValue::JavaHeap { xms_mb: 768, xmx_mb: 768 }.to_string(),
            "-Xms768m -Xmx768m"
        );
    }

    #[test]
    fn ledger_round_trips_through_json() {
        let mut ledger = SettingsLedger::new(8, 16384);
        ledger.set("server.max_active_workers", SettingValue::Count(5));
        ledger.set("server.java_args", SettingValue::JavaHeap { xms_mb: 3840, xmx_mb: 3840 });
        ledger.charge_cpu(5);
        ledger.charge_ram(3840);
        ledger.totals.mb_per_worker = 768;

        let json = serde_json::to_string(&ledger).unwrap();
        let back: SettingsLedger = serde_json::from_str(&json).unwrap();

        assert_eq!(back, ledger);
    }
}
