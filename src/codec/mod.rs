//! Binary wire format for key shares.
//!
//! # Layout
//! - `PublicShare`: `id (u16 LE) ‖ count (u32 LE) ‖ pubkey (33) ‖ commitments (33 × count)`
//! - `KeyShare`: `PublicShare ‖ secret (32, big-endian) ‖ group pubkey (33)`
//!
//! Points use the compressed form from [`crate::curve::point`]. Hex variants
//! wrap the same bytes in lowercase hexadecimal.
//!
//! # Security
//! - Decoding checks the exact total length before reading any point.
//! - Secret-bearing encodings are returned in `Zeroizing` buffers.

mod share;

pub use share::{KEY_SHARE_SUFFIX_LEN, PUBLIC_SHARE_HEADER_LEN};

/// Errors for share decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Total length does not match the length implied by the header.
    #[error("malformed encoding: expected {expected} bytes, got {got}")]
    MalformedEncoding { expected: usize, got: usize },
    /// A 33-byte field is not a valid compressed point.
    #[error("invalid curve point")]
    InvalidPoint,
    /// The secret is not a canonical scalar.
    #[error("invalid scalar")]
    InvalidScalar,
    /// Text input is not valid hexadecimal.
    #[error("invalid hex encoding")]
    InvalidHex,
}
