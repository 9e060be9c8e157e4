//! Trusted-dealer key sharding over secp256k1.
//!
//! This module implements Shamir secret sharing of a long-term secret key in
//! the scalar field of secp256k1, augmented with Feldman VSS commitments.
//!
//! # Components
//! - `share`: key shares and their public halves.
//! - `polynomial`: random polynomial generation, Horner evaluation, commitments.
//! - `dealer`: the dealing procedure itself.
//! - `reconstruct`: Lagrange interpolation and share verification.
//!
//! # Security
//! - **Canonical key**: the dealt secret is negated when its public key has an
//!   odd Y, so every share belongs to the even-Y group key.
//! - **Zeroization**: key shares and polynomial coefficients are wiped on drop.
//! - **Redaction**: `Debug` on key shares never prints the secret.

pub mod dealer;
pub(crate) mod polynomial;
pub mod reconstruct;
pub mod share;

pub use dealer::{deal_shares, deal_shares_with_rng, Dealing};
pub use reconstruct::{reconstruct_secret, verify_share};
pub use share::{KeyShare, PublicShare};

/// Errors for dealing and reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MpcError {
    /// Threshold is zero, exceeds the signer count, or the signer count does
    /// not fit a 16-bit share id.
    #[error("invalid number of signers or threshold")]
    InvalidParameters,
    /// The secret to deal is zero.
    #[error("secret key is zero")]
    ZeroSecret,
    /// No shares were supplied.
    #[error("not enough shares to reconstruct")]
    InsufficientShares,
    /// Two shares carry the same id.
    #[error("duplicate share id {0}")]
    DuplicateShareId(u16),
    /// A share id of zero would reveal the secret directly.
    #[error("share id must be non-zero")]
    InvalidShareId,
}
