//! Process-wide tally of request outcomes.
//!
//! Every classified request lands in exactly one [`Bucket`] and bumps the
//! total. Both updates happen under one lock, so any [`CounterSnapshot`]
//! satisfies `amount_total == amount_successful + amount_warning +
//! amount_error + amount_bad`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Mutually exclusive classification of a completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Successful,
    Warning,
    Error,
    Bad,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Successful => "successful",
            Bucket::Warning => "warning",
            Bucket::Error => "error",
            Bucket::Bad => "bad",
        }
    }
}

/// Point-in-time copy of the counters, serialized as the `status` block of
/// the status report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub amount_successful: u64,
    pub amount_warning: u64,
    pub amount_error: u64,
    pub amount_bad: u64,
    pub amount_total: u64,
}

impl CounterSnapshot {
    /// Count for one bucket
    pub fn get(&self, bucket: Bucket) -> u64 {
        match bucket {
            Bucket::Successful => self.amount_successful,
            Bucket::Warning => self.amount_warning,
            Bucket::Error => self.amount_error,
            Bucket::Bad => self.amount_bad,
        }
    }

    /// Check the total against the bucket sum.
    pub fn is_consistent(&self) -> bool {
        self.amount_total
            == self.amount_successful + self.amount_warning + self.amount_error + self.amount_bad
    }
}

/// The live counters. Owned by the dispatcher and shared by `Arc` with the
/// classifier and the status endpoint.
#[derive(Debug, Default)]
pub struct CounterSet {
    inner: Mutex<CounterSnapshot>,
}

impl CounterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one classified request.
    pub fn record(&self, bucket: Bucket) {
        let mut counts = self.inner.lock();
        match bucket {
            Bucket::Successful => counts.amount_successful += 1,
            Bucket::Warning => counts.amount_warning += 1,
            Bucket::Error => counts.amount_error += 1,
            Bucket::Bad => counts.amount_bad += 1,
        }
        counts.amount_total += 1;
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        *self.inner.lock()
    }
}
