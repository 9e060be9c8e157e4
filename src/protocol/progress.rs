//! Mining progress aggregation.
//!
//! Each share has a slot holding the best difficulty its current delivery
//! attempt has mined so far. Overall progress is a pure function of those
//! slots, so it can be recomputed from any thread on every update.

use std::sync::{Arc, Mutex};

use crate::net::OnBetterWork;

/// Receives overall progress in percent, `0.0..=100.0`.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Overall progress in percent.
///
/// Each slot contributes `(best / target)^3`, capped at 1; the sum is divided
/// by `max_signers`.
pub fn overall_progress(best: &[u32], target: u32, max_signers: usize) -> f64 {
    if target == 0 || max_signers == 0 {
        return 100.0;
    }
    let target = f64::from(target).powi(3);
    let sum: f64 = best
        .iter()
        .map(|&b| (f64::from(b).powi(3) / target).min(1.0))
        .sum();
    (sum / max_signers as f64 * 100.0).min(100.0)
}

pub(crate) struct ProgressTracker {
    best: Mutex<Vec<u32>>,
    target: u32,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub(crate) fn new(target: u32, max_signers: usize, callback: Option<ProgressCallback>) -> Arc<Self> {
        Arc::new(Self {
            best: Mutex::new(vec![0; max_signers]),
            target,
            callback,
        })
    }

    /// Records `difficulty` for `slot` and reports the new total.
    pub(crate) fn update(&self, slot: usize, difficulty: u32) {
        let percent = {
            let mut best = self.best.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(entry) = best.get_mut(slot) {
                *entry = difficulty;
            }
            overall_progress(&best, self.target, best.len())
        };
        log::debug!("Mining progress {:.1}% (slot {} at {})", percent, slot, difficulty);
        if let Some(callback) = &self.callback {
            callback(percent);
        }
    }

    /// Clears `slot` after a failed attempt; the share will be mined again.
    pub(crate) fn reset(&self, slot: usize) {
        let mut best = self.best.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(entry) = best.get_mut(slot) {
            *entry = 0;
        }
    }

    /// A miner callback feeding `slot`.
    pub(crate) fn reporter(self: &Arc<Self>, slot: usize) -> OnBetterWork {
        let tracker = Arc::clone(self);
        Arc::new(move |difficulty| tracker.update(slot, difficulty))
    }
}
