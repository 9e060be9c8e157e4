//! Trusted-dealer key generation.
//!
//! Splits a secret key into `max_signers` shares with a `threshold`-of-n
//! reconstruction bound and commits to the dealing polynomial.
//!
//! # Security
//! - **Canonical key**: the secret is negated before any share is derived if
//!   `G·secret` has an odd Y.
//! - **Zeroization**: the polynomial is wiped when dealing returns.
//! - **Validation**: `1 <= threshold <= max_signers <= u16::MAX`.

use std::sync::Arc;

use k256::{AffinePoint, Scalar};
use rand_core::{CryptoRngCore, OsRng};

use super::polynomial::Polynomial;
use super::share::{KeyShare, PublicShare};
use super::MpcError;
use crate::curve::{has_odd_y, mul_base};

/// The output of one dealing.
#[derive(Debug)]
pub struct Dealing {
    /// Exactly `max_signers` shares with ids `1..=max_signers`.
    pub shares: Vec<KeyShare>,
    /// Aggregate public key, always with even Y.
    pub group_pubkey: AffinePoint,
    /// `threshold` commitment points, the same set every share references.
    pub commitments: Arc<[AffinePoint]>,
}

/// Deals `secret` into `max_signers` shares using the OS random source.
pub fn deal_shares(secret: &Scalar, threshold: u32, max_signers: u32) -> Result<Dealing, MpcError> {
    deal_shares_with_rng(secret, threshold, max_signers, &mut OsRng)
}

/// Deals `secret` into `max_signers` shares.
///
/// # Arguments
/// * `secret` - The secret key to split.
/// * `threshold` - Number of shares required to reconstruct.
/// * `max_signers` - Number of shares to produce.
/// * `rng` - Source for the non-constant coefficients.
///
/// # Returns
/// * `Ok(Dealing)` on success.
/// * `Err(MpcError::InvalidParameters)` if the threshold is zero or larger
///   than `max_signers`, or `max_signers` does not fit a share id.
/// * `Err(MpcError::ZeroSecret)` if `secret` is zero.
pub fn deal_shares_with_rng<R: CryptoRngCore>(
    secret: &Scalar,
    threshold: u32,
    max_signers: u32,
    rng: &mut R,
) -> Result<Dealing, MpcError> {
    if threshold == 0 || threshold > max_signers || max_signers > u32::from(u16::MAX) {
        return Err(MpcError::InvalidParameters);
    }
    if bool::from(secret.is_zero()) {
        return Err(MpcError::ZeroSecret);
    }

    let mut secret = *secret;
    let mut group_pubkey = mul_base(&secret);
    if has_odd_y(&group_pubkey) {
        secret = -secret;
        group_pubkey = mul_base(&secret);
    }

    let polynomial = Polynomial::random(secret, threshold as usize, rng);
    let commitments: Arc<[AffinePoint]> = Arc::from(polynomial.commitments());

    let mut shares = Vec::with_capacity(max_signers as usize);
    for id in 1..=max_signers as u16 {
        let share_secret = polynomial.evaluate(&Scalar::from(u64::from(id)));
        shares.push(KeyShare {
            secret: share_secret,
            group_pubkey,
            public_share: PublicShare {
                id,
                pubkey: mul_base(&share_secret),
                vss_commitments: Arc::clone(&commitments),
            },
        });
    }

    log::debug!(
        "Dealt {} shares with threshold {} ({} commitments)",
        shares.len(),
        threshold,
        polynomial.len()
    );

    Ok(Dealing { shares, group_pubkey, commitments })
}
