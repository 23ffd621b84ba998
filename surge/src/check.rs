//! Per-iteration assertions.
//!
//! A check records a named boolean outcome and never aborts the calling iteration.
use crate::transaction::TRANSACTION_HOOK;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use surge_core::CheckSummary;

/// Record a named check and return `passed` so it can be used inline.
///
/// # Example
/// ```ignore
/// let res = get_post(&client, id).await;
/// check("detail 200", matches!(&res, Ok(r) if r.status() == 200));
/// ```
pub fn check(name: &str, passed: bool) -> bool {
    if TRANSACTION_HOOK
        .try_with(|hook| hook.checks.record(name, passed))
        .is_err()
    {
        tracing::warn!("No hook available for check '{name}'.");
    }

    if !passed {
        tracing::debug!("Check failed: {name}");
    }

    passed
}

#[derive(Default)]
struct CheckCounter {
    passes: AtomicU64,
    fails: AtomicU64,
}

/// Pass/fail counters keyed by check name, shared by every worker of a run.
#[derive(Default)]
pub(crate) struct CheckRegistry {
    counters: RwLock<HashMap<String, Arc<CheckCounter>>>,
}

impl CheckRegistry {
    pub fn record(&self, name: &str, passed: bool) {
        let counter = self.counter(name);
        if passed {
            counter.passes.fetch_add(1, Ordering::Relaxed);
        } else {
            counter.fails.fetch_add(1, Ordering::Relaxed);
        }

        #[cfg(feature = "metrics")]
        metrics::counter!(
            surge_core::CHECKS,
            "check" => name.to_string(),
            "result" => if passed { "pass" } else { "fail" }
        )
        .increment(1);
    }

    fn counter(&self, name: &str) -> Arc<CheckCounter> {
        {
            let read = self.counters.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(counter) = read.get(name) {
                return counter.clone();
            }
        }

        self.counters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    /// Totals per check, sorted by name.
    pub fn summaries(&self) -> Vec<CheckSummary> {
        let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        let mut summaries: Vec<_> = counters
            .iter()
            .map(|(name, counter)| CheckSummary {
                name: name.clone(),
                passes: counter.passes.load(Ordering::Relaxed),
                fails: counter.fails.load(Ordering::Relaxed),
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }
}
