//! Key share definitions.
//!
//! A key share is a point $(id, f(id))$ on the dealing polynomial plus the
//! public data a signer needs to use it:
//! - `PublicShare`: id, `G·f(id)`, and the dealing's VSS commitments.
//! - `KeyShare`: the secret `f(id)`, the group public key, and the public share.
//!
//! # Security
//! - `KeyShare` implements `ZeroizeOnDrop`; a share is scrubbed as soon as the
//!   last owner lets go of it.
//! - `Debug` redacts the secret.

use core::fmt;
use std::sync::Arc;

use k256::{AffinePoint, Scalar};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The public half of a key share.
///
/// `vss_commitments` is shared by every share of one dealing; cloning a
/// `PublicShare` only bumps the reference count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicShare {
    /// Share id, 1-indexed.
    pub id: u16,
    /// `G·secret` for this share.
    pub pubkey: AffinePoint,
    /// `G·a_i` for every polynomial coefficient.
    pub vss_commitments: Arc<[AffinePoint]>,
}

/// A signer's secret share of the group key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyShare {
    /// Polynomial evaluated at `public_share.id`.
    pub secret: Scalar,
    /// Aggregate public key common to all shares (always even Y).
    #[zeroize(skip)]
    pub group_pubkey: AffinePoint,
    #[zeroize(skip)]
    pub public_share: PublicShare,
}

impl KeyShare {
    pub fn id(&self) -> u16 {
        self.public_share.id
    }
}

impl fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyShare")
            .field("id", &self.public_share.id)
            .field("commitments", &self.public_share.vss_commitments.len())
            .field("secret", &"***SENSITIVE***")
            .finish()
    }
}
