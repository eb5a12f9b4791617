//! Bounded-concurrency admission control for generation jobs.
//!
//! A single [`AdmissionLimiter`] is shared by every caller in the process.
//! Up to `capacity` tasks run at once; the rest wait in arrival order.

mod admission;

pub use admission::{Admission, AdmissionLimiter, AdmissionSlot, LimiterStats, PendingAdmission};

use thiserror::Error;

/// Errors raised by the admission limiter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimiterError {
    /// Capacity must be at least 1.
    #[error("invalid capacity {0}: must be at least 1")]
    InvalidCapacity(usize),
}
