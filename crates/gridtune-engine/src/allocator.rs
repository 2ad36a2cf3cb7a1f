//! Per-role allocation functions and the budget validator.
//!
//! One function per deployable role. Each starts a fresh [`SettingsLedger`]
//! against the node's physical budget, resolves proportional shares for the
//! services present, and runs the budget check before releasing the ledger.
//! A calculation that does not fit yields a [`Rejection`], never a partial
//! result.

use gridtune_core::{
    AllocationOptions, NodeProfile, Rejection, Resource, SettingValue, SettingsLedger, TuneResult,
};
use tracing::debug;

use crate::capacity::CapacityModel;
use crate::memory::{FIT_TO_MEMORY_PERCENT, fit_to_memory};

/// RAM left unallocated for the operating system and other applications.
const DEFAULT_MEMORY_RESERVED_FOR_OS_MB: u64 = 1024;

/// OS reservation on minimal test/dev hardware (under 3 cores).
const SMALL_HARDWARE_OS_RESERVE_MB: u64 = 256;

/// Worker memory tiers, selected by total node RAM.
const WORKER_TIERS_MB: (u64, u64, u64) = (512, 768, 1024);

/// A proportional RAM share with clamped bounds.
///
/// Resolved as `clamp(total * percent, min, max)` with a truncating
/// multiply. When a computed maximum lands below the minimum, the minimum
/// wins.
#[derive(Debug, Clone, Copy)]
struct RamShare {
    percent: f64,
    min_mb: u64,
    max_mb: u64,
}

impl RamShare {
    fn resolve(&self, total_mb: u64) -> u64 {
        let raw = (total_mb as f64 * self.percent) as u64;
        raw.clamp(self.min_mb, self.max_mb.max(self.min_mb))
    }
}

/// A proportional CPU share with clamped bounds.
#[derive(Debug, Clone, Copy)]
struct CpuShare {
    percent: f64,
    min: u64,
    max: u64,
}

impl CpuShare {
    fn resolve(&self, total: u64) -> u64 {
        let raw = (total as f64 * self.percent) as u64;
        raw.clamp(self.min, self.max.max(self.min))
    }
}

/// The allocation engine.
///
/// Stateless across calls: the only state is the caller-supplied overrides
/// and the capacity-model constants, fixed at construction. Concurrent
/// callers may share one `Allocator` freely.
#[derive(Debug, Clone)]
pub struct Allocator {
    options: AllocationOptions,
    capacity: CapacityModel,
}

impl Allocator {
    /// Create an engine with the given overrides and the default capacity
    /// model.
    pub fn new(options: AllocationOptions) -> Self {
        if let Some(mb) = options.memory_per_worker.filter(|&mb| mb != 0) {
            debug!(mb, "using optional memory per worker");
        }
        if let Some(mb) = options.memory_reserved_for_os.filter(|&mb| mb != 0) {
            debug!(mb, "using optional memory reserved for the operating system");
        }
        Self {
            options,
            capacity: CapacityModel::default(),
        }
    }

    /// Replace the capacity model.
    pub fn with_capacity_model(mut self, capacity: CapacityModel) -> Self {
        self.capacity = capacity;
        self
    }

    /// The capacity estimator attached to this engine.
    pub fn capacity(&self) -> &CapacityModel {
        &self.capacity
    }

    fn memory_reserved_for_os(&self) -> u64 {
        self.options
            .memory_reserved_for_os
            .filter(|&mb| mb != 0)
            .unwrap_or(DEFAULT_MEMORY_RESERVED_FOR_OS_MB)
    }

    /// Settings for a primary host: the application server plus whatever
    /// other services are co-located on it.
    ///
    /// The server is not given a fixed share of memory. Every other service
    /// takes its clamped percentage first; the server's worker pool is then
    /// sized by how many workers fit into what remains.
    pub fn calculate_primary_settings(&self, node: &NodeProfile) -> TuneResult<SettingsLedger> {
        let mut datastore_cpu = CpuShare {
            percent: 0.25,
            min: 1,
            max: (node.cpu as f64 * 0.50) as u64,
        };
        let mut server_cpu = CpuShare {
            percent: 0.75,
            min: 2,
            max: 24,
        };

        let database_ram = RamShare { percent: 0.25, min_mb: 2048, max_mb: 16384 };
        let mut datastore_ram = RamShare { percent: 0.10, min_mb: 512, max_mb: 8192 };
        let orchestrator_ram = RamShare { percent: 0.08, min_mb: 512, max_mb: 1024 };
        let console_ram = RamShare { percent: 0.08, min_mb: 512, max_mb: 1024 };
        let broker_ram = RamShare { percent: 0.08, min_mb: 512, max_mb: 1024 };

        let min_server_ram: u64 = 512;
        let mut min_code_cache: u64 = 128;
        let max_code_cache: u64 = 2048;
        let mut code_cache_per_worker: u64 = 128;

        let (small, medium, large) = WORKER_TIERS_MB;
        let mut ram_per_worker = fit_to_memory(node.ram_mb, small, medium, large, FIT_TO_MEMORY_PERCENT);
        let mut os_reserve = self.memory_reserved_for_os();

        // Worker-size overrides: the explicit option is applied first, the
        // node's currently configured value second, so the current value
        // wins when both are set.
        if let Some(mb) = self.options.memory_per_worker.filter(|&mb| mb != 0) {
            ram_per_worker = mb;
        }
        if let Some(mb) = node.current_memory_per_worker.filter(|&mb| mb != 0) {
            ram_per_worker = mb;
        }

        // A primary or replica serving dedicated compile nodes shifts budget
        // from its own server to the datastore the compilers all query.
        if (node.topology.monolithic_primary || node.topology.replica_primary)
            && node.topology.with_compile_nodes
        {
            datastore_ram.percent = 0.20;
            datastore_cpu.percent = 0.50;
            server_cpu.percent = 0.33;
        }

        // No datastore on this host: the server takes the full CPU share.
        if !node.classes.datastore {
            server_cpu.percent = 1.00;
        }

        // Recompute the server ceiling after reallocation, reserving one
        // core of headroom.
        server_cpu.max = ((node.cpu as f64 * server_cpu.percent - 1.0) as i64)
            .clamp(server_cpu.min as i64, server_cpu.max as i64) as u64;

        // An orchestrator running its own worker pool needs a core.
        if node.classes.orchestrator && node.topology.orchestrator_worker_pool {
            server_cpu.max = server_cpu.min.max(server_cpu.max - 1);
        }

        // Minimal test/dev hardware gets a single worker and a smaller OS
        // reservation.
        if node.cpu < 3 {
            server_cpu.min = 1;
            server_cpu.max = 1;
            os_reserve = SMALL_HARDWARE_OS_RESERVE_MB;
        }

        // Runtimes without a reserved code cache allocate none.
        if !node.topology.modern_worker_runtime {
            min_code_cache = 0;
            code_cache_per_worker = 0;
        }

        let mut ledger = SettingsLedger::new(node.cpu, node.ram_mb);

        if node.classes.database {
            let mb = database_ram.resolve(node.ram_mb);
            ledger.set("database.shared_buffers", SettingValue::Megabytes(mb));
            ledger.charge_ram(mb);
        }

        let mut command_processing_threads = 0;
        if node.classes.datastore {
            // On a compile node the datastore stays small; the server is
            // the point of the host.
            if node.topology.compile_node || node.topology.compiler {
                datastore_cpu = CpuShare { percent: 0.25, min: 1, max: 3 };
            }

            command_processing_threads = datastore_cpu.resolve(node.cpu);
            ledger.set(
                "datastore.command_processing_threads",
                SettingValue::Count(command_processing_threads),
            );
            ledger.charge_cpu(command_processing_threads);

            let mb = datastore_ram.resolve(node.ram_mb);
            ledger.set("datastore.java_args", SettingValue::JavaHeap { xms_mb: mb, xmx_mb: mb });
            ledger.charge_ram(mb);
        }

        if node.classes.orchestrator {
            let mut mb = orchestrator_ram.resolve(node.ram_mb);
            ledger.set("orchestrator.java_args", SettingValue::JavaHeap { xms_mb: mb, xmx_mb: mb });
            ledger.charge_ram(mb);
            if node.topology.orchestrator_worker_pool {
                // The pool holds one worker; grow the heap to hold it.
                mb += ram_per_worker;
                ledger.set("orchestrator.java_args", SettingValue::JavaHeap { xms_mb: mb, xmx_mb: mb });
                ledger.charge_ram(ram_per_worker);
            }
        }

        if node.classes.console {
            let mb = console_ram.resolve(node.ram_mb);
            ledger.set("console.java_args", SettingValue::JavaHeap { xms_mb: mb, xmx_mb: mb });
            ledger.charge_ram(mb);
        }

        if node.classes.broker {
            let mb = broker_ram.resolve(node.ram_mb);
            ledger.set("broker.heap_mb", SettingValue::Count(mb));
            ledger.charge_ram(mb);
        }

        // The server takes all memory the other services left behind.
        let available = node.ram_mb as i64 - os_reserve as i64 - ledger.totals.ram.used as i64;
        let required = min_server_ram + min_code_cache;
        if available < required as i64 {
            debug!(
                available_mb = available,
                required_mb = required,
                "not enough memory left for the server worker pool"
            );
            return Err(Rejection::BelowMinimum {
                available_mb: available.max(0) as u64,
                required_mb: required,
            });
        }
        let available = available as u64;

        // Workers are sized by how many of (worker heap + code cache) fit
        // into the remaining memory, not by core count.
        let max_workers_in_ram = available / (ram_per_worker + code_cache_per_worker);
        let workers = max_workers_in_ram.clamp(server_cpu.min, server_cpu.max);
        ledger.set("server.max_active_workers", SettingValue::Count(workers));
        ledger.charge_cpu(workers);

        let server_ram = min_server_ram.max(workers * ram_per_worker);
        ledger.set(
            "server.java_args",
            SettingValue::JavaHeap { xms_mb: server_ram, xmx_mb: server_ram },
        );
        ledger.charge_ram(server_ram);

        if node.topology.modern_worker_runtime {
            let code_cache = (workers * code_cache_per_worker).clamp(min_code_cache, max_code_cache);
            ledger.set("server.reserved_code_cache", SettingValue::Megabytes(code_cache));
            ledger.charge_ram(code_cache);
        }

        ledger.totals.mb_per_worker = ram_per_worker;

        // Detune a compile node's datastore: cap its database connections
        // off the worker count and disable periodic maintenance. These are
        // not steady-state allocations and stay off the ledger totals.
        if node.classes.datastore && (node.topology.compile_node || node.topology.compiler) {
            let read_pool = workers + (workers / 2).max(1);
            ledger.set("datastore.read_maximum_pool_size", SettingValue::Count(read_pool));
            ledger.set(
                "datastore.write_maximum_pool_size",
                SettingValue::Count(command_processing_threads * 2),
            );
            ledger.set("datastore.gc_interval", SettingValue::Count(0));
        }

        self.validate(ledger, os_reserve)
    }

    /// Settings for a dedicated console host.
    pub fn calculate_console_settings(&self, node: &NodeProfile) -> TuneResult<SettingsLedger> {
        let console_ram = RamShare { percent: 0.75, min_mb: 512, max_mb: 4096 };

        let mut ledger = SettingsLedger::new(node.cpu, node.ram_mb);

        let mb = console_ram.resolve(node.ram_mb);
        ledger.set("console.java_args", SettingValue::JavaHeap { xms_mb: mb, xmx_mb: mb });
        ledger.charge_ram(mb);

        self.validate(ledger, self.memory_reserved_for_os())
    }

    /// Settings for a dedicated datastore host, optionally with a
    /// co-located database.
    ///
    /// The database allocation is computed on its own ledger and folded in;
    /// the combined result is validated as a whole.
    pub fn calculate_datastore_settings(&self, node: &NodeProfile) -> TuneResult<SettingsLedger> {
        let datastore_cpu = CpuShare {
            percent: 0.50,
            min: 1,
            max: (node.cpu as f64 * 0.50) as u64,
        };
        let mut datastore_ram = RamShare { percent: 0.50, min_mb: 512, max_mb: 8192 };

        let mut ledger = SettingsLedger::new(node.cpu, node.ram_mb);

        if node.classes.database {
            // A co-located database takes its own share; the datastore heap
            // drops to a quarter of the node.
            datastore_ram.percent = 0.25;
            let database = self.calculate_database_settings(node)?;
            ledger.absorb(&database);
        }

        let command_processing_threads = datastore_cpu.min.max(datastore_cpu.max);
        ledger.set(
            "datastore.command_processing_threads",
            SettingValue::Count(command_processing_threads),
        );
        ledger.charge_cpu(command_processing_threads);

        let mb = datastore_ram.resolve(node.ram_mb);
        ledger.set("datastore.java_args", SettingValue::JavaHeap { xms_mb: mb, xmx_mb: mb });
        ledger.charge_ram(mb);

        self.validate(ledger, self.memory_reserved_for_os())
    }

    /// Settings for an external database host.
    ///
    /// Only the shared buffers are a steady-state reservation. The
    /// autovacuum, work-mem, connection, and log settings are per-session
    /// and are published without being charged to the ledger totals.
    pub fn calculate_database_settings(&self, node: &NodeProfile) -> TuneResult<SettingsLedger> {
        let database_ram = RamShare { percent: 0.25, min_mb: 2048, max_mb: 16384 };
        let autovacuum_cpu = CpuShare { percent: 0.33, min: 3, max: 8 };

        // Divisor for a dedicated database host; a host shared with other
        // services would divide by 8.
        let maintenance_work_mem_divisor: f64 = 3.0;
        let max_maintenance_work_mem: u64 = 1024;

        // Double the stock database defaults.
        let max_connections: u64 = 1000;
        let work_mem_mb: u64 = 8;

        let mut ledger = SettingsLedger::new(node.cpu, node.ram_mb);

        let shared_buffers = database_ram.resolve(node.ram_mb);
        ledger.set("database.shared_buffers", SettingValue::Megabytes(shared_buffers));
        ledger.charge_ram(shared_buffers);

        let autovacuum_workers = autovacuum_cpu.resolve(node.cpu);
        let maintenance_work_mem =
            max_maintenance_work_mem.min((node.ram_mb as f64 / maintenance_work_mem_divisor) as u64);
        let autovacuum_work_mem = maintenance_work_mem / autovacuum_workers;

        ledger.set("database.autovacuum_max_workers", SettingValue::Count(autovacuum_workers));
        ledger.set("database.autovacuum_work_mem", SettingValue::Megabytes(autovacuum_work_mem));
        ledger.set("database.maintenance_work_mem", SettingValue::Megabytes(maintenance_work_mem));
        ledger.set("database.max_connections", SettingValue::Count(max_connections));
        ledger.set("database.work_mem", SettingValue::Megabytes(work_mem_mb));
        ledger.set("database.log_temp_files", SettingValue::Count(work_mem_mb * 1024));

        self.validate(ledger, self.memory_reserved_for_os())
    }

    /// Reject any ledger whose allocations exceed the node's budget.
    fn validate(&self, ledger: SettingsLedger, os_reserve: u64) -> TuneResult<SettingsLedger> {
        let cpu = ledger.totals.cpu;
        if cpu.used > cpu.total {
            debug!(used = cpu.used, total = cpu.total, "calculations overallocated processors");
            return Err(Rejection::Overcommitted {
                resource: Resource::Cpu,
                used: cpu.used,
                total: cpu.total,
            });
        }
        let ram = ledger.totals.ram;
        if ram.used + os_reserve > ram.total {
            debug!(
                used = ram.used,
                os_reserve,
                total = ram.total,
                "calculations overallocated memory"
            );
            return Err(Rejection::Overcommitted {
                resource: Resource::Ram,
                used: ram.used + os_reserve,
                total: ram.total,
            });
        }
        Ok(ledger)
    }
}
