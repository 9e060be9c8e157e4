//! Polynomial operations over the secp256k1 scalar field.

use k256::{AffinePoint, NonZeroScalar, Scalar};
use rand_core::CryptoRngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::curve::mul_base;

/// Coefficients `[a0, a1, ..., a_{t-1}]`, constant term first.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct Polynomial {
    coefficients: Vec<Scalar>,
}

impl Polynomial {
    /// Builds a polynomial of degree `threshold - 1` with `secret` as its
    /// constant term and the remaining coefficients uniform in `[1, n)`.
    pub(crate) fn random<R: CryptoRngCore>(secret: Scalar, threshold: usize, rng: &mut R) -> Self {
        let mut coefficients = Vec::with_capacity(threshold);
        coefficients.push(secret);
        for _ in 1..threshold {
            coefficients.push(*NonZeroScalar::random(&mut *rng));
        }
        Self { coefficients }
    }

    #[cfg(test)]
    pub(crate) fn from_coefficients(coefficients: Vec<Scalar>) -> Self {
        Self { coefficients }
    }

    pub(crate) fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// Evaluates the polynomial at `x` using Horner's method.
    ///
    /// Starts from the highest-degree coefficient and accumulates
    /// `value = value * x + coeff` down to the constant term.
    pub(crate) fn evaluate(&self, x: &Scalar) -> Scalar {
        let Some((last, rest)) = self.coefficients.split_last() else {
            return Scalar::ZERO;
        };
        let mut value = *last;
        for coeff in rest.iter().rev() {
            value = value * x + coeff;
        }
        value
    }

    /// Feldman commitments `G·a_i` for every coefficient.
    pub(crate) fn commitments(&self) -> Vec<AffinePoint> {
        self.coefficients.iter().map(mul_base).collect()
    }
}
