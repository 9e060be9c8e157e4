//! Secret reconstruction and share verification.
//!
//! This module implements Lagrange interpolation over the secp256k1 scalar
//! field to recover a dealt secret, and Feldman verification of a single
//! share against its dealing's commitments.
//!
//! # Security
//! - **Validation**: Rejects empty input, zero ids and duplicate ids.
//! - Reconstruction is a recovery tool; the distributor never calls it.

use k256::{AffinePoint, ProjectivePoint, Scalar};

use crate::curve::mul_base;
use crate::mpc::{share::PublicShare, MpcError};

/// Reconstructs the secret from `(id, secret)` share points.
///
/// Uses Lagrange interpolation at x=0. With at least `threshold` distinct
/// shares of one dealing the result is the dealt (parity-normalized) secret;
/// with fewer it is an unrelated scalar.
///
/// # Arguments
/// * `shares` - Share points to interpolate.
///
/// # Returns
/// * `Ok(Scalar)` - The polynomial intercept.
/// * `Err(MpcError)` - If the input is empty or an id is zero or repeated.
pub fn reconstruct_secret(shares: &[(u16, Scalar)]) -> Result<Scalar, MpcError> {
    if shares.is_empty() {
        return Err(MpcError::InsufficientShares);
    }

    for (i, (id, _)) in shares.iter().enumerate() {
        if *id == 0 {
            return Err(MpcError::InvalidShareId);
        }
        if shares[i + 1..].iter().any(|(other, _)| other == id) {
            return Err(MpcError::DuplicateShareId(*id));
        }
    }

    // lambda_j = prod_{m != j} x_m / (x_m - x_j)
    let mut secret = Scalar::ZERO;
    for (j, (id_j, y_j)) in shares.iter().enumerate() {
        let x_j = Scalar::from(u64::from(*id_j));
        let mut numerator = Scalar::ONE;
        let mut denominator = Scalar::ONE;
        for (m, (id_m, _)) in shares.iter().enumerate() {
            if m == j {
                continue;
            }
            let x_m = Scalar::from(u64::from(*id_m));
            numerator *= x_m;
            denominator *= x_m - x_j;
        }
        let inverse: Scalar =
            Option::from(denominator.invert()).ok_or(MpcError::InvalidShareId)?;
        secret += *y_j * numerator * inverse;
    }

    Ok(secret)
}

/// Checks a secret share against its public half.
///
/// Holds when `G·secret` equals the share's public key and the public key lies
/// on the committed polynomial, `Σ C_i·id^i`.
pub fn verify_share(public: &PublicShare, secret: &Scalar) -> bool {
    if public.id == 0 || public.vss_commitments.is_empty() {
        return false;
    }
    if mul_base(secret) != public.pubkey {
        return false;
    }

    let x = Scalar::from(u64::from(public.id));
    let mut power = Scalar::ONE;
    let mut expected = ProjectivePoint::IDENTITY;
    for commitment in public.vss_commitments.iter() {
        expected += ProjectivePoint::from(*commitment) * power;
        power *= x;
    }
    AffinePoint::from(expected) == public.pubkey
}
