//! Tiered per-worker memory sizing.
//!
//! Total node RAM selects one of three per-worker memory sizes. Nodes
//! provisioned just under a power-of-two boundary (a 31.5 GB VM on a
//! "32 GB" flavor) are rounded up to that boundary for tier selection
//! only, so they land in the tier their hardware class intends.

use tracing::debug;

/// Default rounding tolerance for [`fit_to_memory`], in percent.
pub const FIT_TO_MEMORY_PERCENT: u64 = 5;

/// The nearest power of two to `n`, ties favoring the higher power.
/// Returns 0 for `n == 0`.
pub fn nearest_power_of_two(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let exponent = (n as f64).log2();
    let higher = 2u64.pow(exponent.ceil() as u32);
    let lower = 2u64.pow(exponent.floor() as u32);
    if higher - n <= n - lower { higher } else { lower }
}

/// True when `actual` is below `target` and within `percent` of it,
/// measured as `ceil((target - actual) / target * 100)`.
fn within_percent(actual: u64, target: u64, percent: u64) -> bool {
    if actual >= target {
        return false;
    }
    ((target - actual) as f64 / target as f64 * 100.0).ceil() as u64 <= percent
}

/// Select a per-worker memory size from the small/medium/large tiers based
/// on total node RAM in MB.
///
/// RAM strictly below its nearest power of two and within `tolerance_percent`
/// of it is treated as that power of two for tier selection. The tier
/// boundaries are: `<= 8192` small, `<= 16384` medium, `< 32768` medium,
/// `>= 32768` large (exactly 32768 is large).
pub fn fit_to_memory(ram_mb: u64, small: u64, medium: u64, large: u64, tolerance_percent: u64) -> u64 {
    let target = nearest_power_of_two(ram_mb);
    let ram_mb = if ram_mb < target && within_percent(ram_mb, target, tolerance_percent) {
        debug!(ram_mb, target, "rounding up for memory tier selection");
        target
    } else {
        ram_mb
    };
    if ram_mb <= 8192 {
        return small;
    }
    if ram_mb <= 16384 {
        return medium;
    }
    if ram_mb < 32768 {
        return medium;
    }
    large
}
