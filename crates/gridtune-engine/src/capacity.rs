//! Fleet-capacity estimation.
//!
//! Little's Law:
//!
//! ```text
//! L = λ * W
//! ```
//!
//! Where `L` is the number of requests in the queue, `λ` the average
//! effective arrival rate, and `W` the average time spent processing a
//! request. Here the "requests" are node check-ins competing for server
//! workers, and `W` is the compile time inflated by a safety factor.

use serde::{Deserialize, Serialize};

/// Cap on the number of runs sampled when estimating from history.
const MAXIMUM_SAMPLE: u64 = 10_000;

const SECONDS_PER_DAY: u64 = 86_400;

/// Queueing-theory capacity formulas, parameterized by the factor applied
/// to observed compile times to approximate worker lock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityModel {
    pub compile_time_factor: u64,
}

impl Default for CapacityModel {
    fn default() -> Self {
        Self { compile_time_factor: 2 }
    }
}

impl CapacityModel {
    /// Estimate a reasonable sample of runs based on node count and run
    /// interval in seconds. A zero interval means continuous runs.
    pub fn run_sample(&self, active_nodes: u64, run_interval_secs: u64) -> u64 {
        if run_interval_secs == 0 {
            return active_nodes.min(MAXIMUM_SAMPLE);
        }
        let runs_per_day = SECONDS_PER_DAY / run_interval_secs;
        // Less than one run per day: approximate a week of history.
        if runs_per_day < 1 {
            return (active_nodes * 7).min(MAXIMUM_SAMPLE);
        }
        (active_nodes * runs_per_day).min(MAXIMUM_SAMPLE)
    }

    /// Theoretical maximum number of nodes manageable by `available_workers`
    /// given the average compile time in seconds.
    ///
    /// `run_interval_secs` must be positive; the formula's domain excludes
    /// zero and the engine does not check for it.
    pub fn maximum_nodes(
        &self,
        average_compile_secs: f64,
        available_workers: u64,
        run_interval_secs: u64,
    ) -> u64 {
        let lock_time = average_compile_secs * self.compile_time_factor as f64;
        ((run_interval_secs as f64 * available_workers as f64) / lock_time).ceil() as u64
    }

    /// Theoretical minimum number of workers required to manage
    /// `active_nodes` given the average compile time in seconds.
    ///
    /// `run_interval_secs` must be positive; the formula's domain excludes
    /// zero and the engine does not check for it.
    pub fn minimum_workers(
        &self,
        active_nodes: u64,
        average_compile_secs: f64,
        run_interval_secs: u64,
    ) -> u64 {
        let lock_time = average_compile_secs * self.compile_time_factor as f64;
        ((active_nodes as f64 * lock_time) / run_interval_secs as f64).ceil() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuous_runs_sample_the_node_count() {
        let model = CapacityModel::default();
        assert_eq!(model.run_sample(10, 0), 10);
        assert_eq!(model.run_sample(100_000, 0), 10_000);
    }

    #[test]
    fn daily_runs_multiply_by_runs_per_day() {
        let model = CapacityModel::default();
        // 1800s interval: 48 runs/day.
        assert_eq!(model.run_sample(10, 1800), 480);
        assert_eq!(model.run_sample(1000, 1800), 10_000);
    }

    #[test]
    fn rarer_than_daily_approximates_a_week() {
        let model = CapacityModel::default();
        // Every two days: less than one run per day.
        assert_eq!(model.run_sample(10, 172_800), 70);
        assert_eq!(model.run_sample(5000, 172_800), 10_000);
    }

    #[test]
    fn maximum_nodes_follows_littles_law() {
        let model = CapacityModel::default();
        // lock_time = 5 * 2 = 10; ceil(1800 * 4 / 10) = 720.
        assert_eq!(model.maximum_nodes(5.0, 4, 1800), 720);
    }

    #[test]
    fn maximum_nodes_rounds_up() {
        let model = CapacityModel::default();
        // lock_time = 14; 1800 * 1 / 14 = 128.57... -> 129.
        assert_eq!(model.maximum_nodes(7.0, 1, 1800), 129);
    }

    #[test]
    fn minimum_workers_follows_littles_law() {
        let model = CapacityModel::default();
        // lock_time = 10; ceil(1000 * 10 / 1800) = ceil(5.55) = 6.
        assert_eq!(model.minimum_workers(1000, 5.0, 1800), 6);
    }

    #[test]
    fn custom_factor_changes_lock_time() {
        let model = CapacityModel { compile_time_factor: 4 };
        // lock_time = 20; ceil(1800 * 4 / 20) = 360.
        assert_eq!(model.maximum_nodes(5.0, 4, 1800), 360);
    }
}
