//! Compressed point representation.
//!
//! A point travels as a 1-byte parity tag (`2` for even Y, `3` for odd Y)
//! followed by its 32-byte big-endian X coordinate.

use k256::elliptic_curve::point::AffineCoordinates;
use k256::elliptic_curve::sec1::FromEncodedPoint;
use k256::{AffinePoint, EncodedPoint, ProjectivePoint, Scalar};

/// Length of a compressed point.
pub const COMPRESSED_POINT_LEN: usize = 33;

const TAG_EVEN: u8 = 2;
const TAG_ODD: u8 = 3;

/// Returns `G·scalar` in affine form.
#[inline]
pub fn mul_base(scalar: &Scalar) -> AffinePoint {
    (ProjectivePoint::GENERATOR * scalar).to_affine()
}

/// Whether the point's Y coordinate is odd.
#[inline]
pub fn has_odd_y(point: &AffinePoint) -> bool {
    bool::from(point.y_is_odd())
}

/// Compresses a point into its 33-byte form.
///
/// The identity has no affine coordinates; it is written as an even tag over a
/// zero X, which `decompress` rejects.
pub fn compress(point: &AffinePoint) -> [u8; COMPRESSED_POINT_LEN] {
    let mut out = [0u8; COMPRESSED_POINT_LEN];
    out[0] = if has_odd_y(point) { TAG_ODD } else { TAG_EVEN };
    out[1..].copy_from_slice(&point.x());
    out
}

/// Parses a 33-byte compressed point.
///
/// Returns `None` for a wrong length, an unknown tag, or an X with no
/// corresponding curve point.
pub fn decompress(bytes: &[u8]) -> Option<AffinePoint> {
    if bytes.len() != COMPRESSED_POINT_LEN || !matches!(bytes[0], TAG_EVEN | TAG_ODD) {
        return None;
    }
    let encoded = EncodedPoint::from_bytes(bytes).ok()?;
    Option::from(AffinePoint::from_encoded_point(&encoded))
}
