//! Admission control for share delivery.
//!
//! Tracks the claimable share pool, the delivery permits, the failure budget
//! and the accepted signers for one distribution run.
//!
//! # Permits
//! There are as many permits as shares. A claimed share holds one permit for
//! the length of its delivery attempt:
//! - failure or give-back returns both the share and the permit;
//! - success keeps the permit out of circulation, except for the success that
//!   completes the quorum, which releases it so blocked attempts can wake,
//!   find the pool empty and exit.
//!
//! Permits outstanding therefore never exceed the shares still claimable.
//!
//! # Security
//! A [`Slot`] dropped without being settled returns its share to the pool, so
//! a cancelled attempt can never lose a share. Accepted shares are dropped,
//! which zeroizes them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::{Semaphore, SemaphorePermit};

use super::DistributionError;
use crate::curve::PubKey;
use crate::mpc::KeyShare;

/// What an accepted delivery did with its permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settlement {
    /// Below quorum; the permit stays out of circulation.
    Withheld,
    /// This acceptance completed the quorum; the permit was released.
    Quorum,
}

pub(crate) struct Admission {
    pool: Mutex<VecDeque<KeyShare>>,
    permits: Semaphore,
    failures: AtomicUsize,
    budget: usize,
    aborted: AtomicBool,
    accepted: Mutex<Vec<(PubKey, String)>>,
    required: usize,
}

impl Admission {
    /// `candidates` is the number of distinct signers that will attempt a
    /// delivery; the failure budget is `candidates - shares`.
    pub(crate) fn new(shares: Vec<KeyShare>, candidates: usize) -> Self {
        let required = shares.len();
        Self {
            permits: Semaphore::new(required),
            pool: Mutex::new(shares.into()),
            failures: AtomicUsize::new(0),
            budget: candidates.saturating_sub(required),
            aborted: AtomicBool::new(candidates < required),
            accepted: Mutex::new(Vec::with_capacity(required)),
            required,
        }
    }

    /// Waits for a permit and claims one share.
    ///
    /// Returns `None` once the run is aborted or every share is placed; the
    /// permit is released before returning.
    pub(crate) async fn claim(&self) -> Option<Slot<'_>> {
        let permit = self.permits.acquire().await.ok()?;
        if self.is_aborted() {
            return None;
        }
        let share = lock(&self.pool).pop_front()?;
        Some(Slot {
            admission: self,
            permit: Some(permit),
            share: Some(share),
        })
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub(crate) fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    /// Post-fan-out check; hands back the accepted `(signer, public share hex)`
    /// pairs when every share was placed.
    pub(crate) fn finish(self) -> Result<Vec<(PubKey, String)>, DistributionError> {
        let accepted = self
            .accepted
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let pool_empty = lock(&self.pool).is_empty();
        let aborted = self.aborted.load(Ordering::SeqCst);

        if aborted || !pool_empty || accepted.len() < self.required {
            return Err(DistributionError::InsufficientSigners {
                accepted: accepted.len(),
                required: self.required,
            });
        }
        Ok(accepted)
    }

    #[cfg(test)]
    pub(crate) fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    #[cfg(test)]
    pub(crate) fn pooled(&self) -> usize {
        lock(&self.pool).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A claimed share and its delivery permit.
pub(crate) struct Slot<'a> {
    admission: &'a Admission,
    permit: Option<SemaphorePermit<'a>>,
    share: Option<KeyShare>,
}

impl<'a> Slot<'a> {
    pub(crate) fn share(&self) -> Option<&KeyShare> {
        self.share.as_ref()
    }

    /// Returns the share without charging the failure budget.
    pub(crate) fn give_back(self) {}

    /// Charges one failure and returns the share.
    ///
    /// Returns `true` if this failure exhausted the budget and aborted the run.
    pub(crate) fn fail(self) -> bool {
        let failures = self.admission.failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures > self.admission.budget {
            self.admission.aborted.store(true, Ordering::SeqCst);
            return true;
        }
        false
    }

    /// Records `signer` as holding this share.
    pub(crate) fn accept(mut self, signer: PubKey, public_share_hex: String) -> Settlement {
        self.share = None;

        let placed = {
            let mut accepted = lock(&self.admission.accepted);
            accepted.push((signer, public_share_hex));
            accepted.len()
        };

        let permit = self.permit.take();
        if placed >= self.admission.required {
            drop(permit);
            Settlement::Quorum
        } else {
            if let Some(permit) = permit {
                permit.forget();
            }
            Settlement::Withheld
        }
    }
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        if let Some(share) = self.share.take() {
            lock(&self.admission.pool).push_back(share);
        }
        // The permit, if still held, is released after the share is back.
        drop(self.permit.take());
    }
}
