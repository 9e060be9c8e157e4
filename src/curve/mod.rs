//! secp256k1 primitives shared by the dealer, the wire codec and the transport layer.
//!
//! # Components
//! - `point`: compressed (33-byte) point encoding and parity helpers.
//! - `keys`: Schnorr (BIP-340) keypairs and x-only public keys.
//!
//! Group arithmetic itself comes from `k256`; nothing here re-implements field
//! or scalar operations.

pub mod keys;
pub mod point;

pub use keys::{Keys, PubKey};
pub use point::{compress, decompress, has_odd_y, mul_base, COMPRESSED_POINT_LEN};

/// Errors for key parsing and key-based operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// Secret key is zero, out of range or not 32 bytes.
    #[error("invalid secret key")]
    InvalidSecretKey,
    /// Public key is not a valid x-only secp256k1 key.
    #[error("invalid public key")]
    InvalidPublicKey,
    /// Hex input could not be decoded.
    #[error("invalid hex encoding")]
    InvalidHex,
    /// Schnorr signing failed.
    #[error("signing failed")]
    SigningFailed,
}
