//! Rejection results.
//!
//! A role function never returns a partial ledger: when the computed
//! allocations do not fit the node, the whole calculation is rejected and
//! the caller decides whether to warn, skip the node, or abort a batch.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The resource dimension that was overcommitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resource {
    Cpu,
    Ram,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Cpu => write!(f, "CPU"),
            Resource::Ram => write!(f, "RAM"),
        }
    }
}

/// Why a calculation produced no settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Rejection {
    /// Computed allocations exceed the node's physical budget. For RAM,
    /// `used` includes the operating-system reservation.
    #[error("allocations overcommit {resource}: {used} used of {total} total")]
    Overcommitted {
        resource: Resource,
        used: u64,
        total: u64,
    },

    /// Memory left for the server worker pool, after the OS reservation and
    /// the other services, is below the minimum worker heap plus code cache.
    #[error(
        "available memory for the server worker pool ({available_mb} MB) \
         is less than the minimum required ({required_mb} MB)"
    )]
    BelowMinimum { available_mb: u64, required_mb: u64 },
}

/// Result alias used by every role function.
pub type TuneResult<T> = Result<T, Rejection>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overcommit_message_names_the_resource() {
        let rejection = Rejection::Overcommitted {
            resource: Resource::Ram,
            used: 7014,
            total: 6144,
        };
        assert_eq!(
            rejection.to_string(),
            "allocations overcommit RAM: 7014 used of 6144 total"
        );
    }

    #[test]
    fn below_minimum_message_carries_both_sides() {
        let rejection = Rejection::BelowMinimum {
            available_mb: 512,
            required_mb: 640,
        };
        assert!(rejection.to_string().contains("512 MB"));
        assert!(rejection.to_string().contains("640 MB"));
    }
}
