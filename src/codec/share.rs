use std::sync::Arc;

use k256::elliptic_curve::PrimeField;
use k256::{AffinePoint, FieldBytes, Scalar};
use zeroize::Zeroizing;

use super::CodecError;
use crate::curve::{compress, decompress, COMPRESSED_POINT_LEN};
use crate::mpc::{KeyShare, PublicShare};

/// `id` plus commitment count.
pub const PUBLIC_SHARE_HEADER_LEN: usize = 2 + 4;
/// Secret plus group public key, appended to a public share.
pub const KEY_SHARE_SUFFIX_LEN: usize = 32 + COMPRESSED_POINT_LEN;

const SCALAR_LEN: usize = 32;

/// Encoded length of a public share with `count` commitments, if it fits.
fn public_share_len(count: u32) -> Option<usize> {
    usize::try_from(count)
        .ok()?
        .checked_add(1)?
        .checked_mul(COMPRESSED_POINT_LEN)?
        .checked_add(PUBLIC_SHARE_HEADER_LEN)
}

fn read_point(bytes: &[u8]) -> Result<AffinePoint, CodecError> {
    decompress(bytes).ok_or(CodecError::InvalidPoint)
}

/// Reads the header and returns `(id, commitment count, encoded length)`.
fn read_header(bytes: &[u8]) -> Result<(u16, u32, usize), CodecError> {
    if bytes.len() < PUBLIC_SHARE_HEADER_LEN + COMPRESSED_POINT_LEN {
        return Err(CodecError::MalformedEncoding {
            expected: PUBLIC_SHARE_HEADER_LEN + COMPRESSED_POINT_LEN,
            got: bytes.len(),
        });
    }
    let id = u16::from_le_bytes([bytes[0], bytes[1]]);
    let count = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
    let len = public_share_len(count).ok_or(CodecError::MalformedEncoding {
        expected: usize::MAX,
        got: bytes.len(),
    })?;
    Ok((id, count, len))
}

/// Parses a public share occupying exactly `bytes[..len]`.
fn read_public_share(bytes: &[u8], count: u32, id: u16) -> Result<PublicShare, CodecError> {
    let mut chunks = bytes[PUBLIC_SHARE_HEADER_LEN..].chunks_exact(COMPRESSED_POINT_LEN);
    let pubkey = read_point(chunks.next().ok_or(CodecError::InvalidPoint)?)?;
    let commitments = chunks
        .take(count as usize)
        .map(read_point)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PublicShare {
        id,
        pubkey,
        vss_commitments: Arc::from(commitments),
    })
}

impl PublicShare {
    /// Encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        PUBLIC_SHARE_HEADER_LEN + COMPRESSED_POINT_LEN * (1 + self.vss_commitments.len())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_le_bytes());
        // Dealing caps commitments at u16::MAX, far below u32::MAX.
        out.extend_from_slice(&(self.vss_commitments.len() as u32).to_le_bytes());
        out.extend_from_slice(&compress(&self.pubkey));
        for commitment in self.vss_commitments.iter() {
            out.extend_from_slice(&compress(commitment));
        }
    }

    /// Decodes a public share; the buffer must hold exactly one share.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let (id, count, expected) = read_header(bytes)?;
        if bytes.len() != expected {
            return Err(CodecError::MalformedEncoding { expected, got: bytes.len() });
        }
        read_public_share(bytes, count, id)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.encode())
    }

    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(s).map_err(|_| CodecError::InvalidHex)?;
        Self::decode(&bytes)
    }
}

impl KeyShare {
    pub fn encode(&self) -> Zeroizing<Vec<u8>> {
        let mut out =
            Zeroizing::new(Vec::with_capacity(self.public_share.encoded_len() + KEY_SHARE_SUFFIX_LEN));
        self.public_share.encode_into(&mut out);
        out.extend_from_slice(&self.secret.to_bytes());
        out.extend_from_slice(&compress(&self.group_pubkey));
        out
    }

    /// Decodes a key share; the buffer must hold exactly one share.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let (id, count, public_len) = read_header(bytes)?;
        let expected = public_len
            .checked_add(KEY_SHARE_SUFFIX_LEN)
            .ok_or(CodecError::MalformedEncoding { expected: usize::MAX, got: bytes.len() })?;
        if bytes.len() != expected {
            return Err(CodecError::MalformedEncoding { expected, got: bytes.len() });
        }

        let public_share = read_public_share(&bytes[..public_len], count, id)?;
        let (secret_bytes, group_bytes) = bytes[public_len..].split_at(SCALAR_LEN);
        let secret: Scalar = Option::from(Scalar::from_repr(FieldBytes::clone_from_slice(secret_bytes)))
            .ok_or(CodecError::InvalidScalar)?;

        Ok(KeyShare {
            secret,
            group_pubkey: read_point(group_bytes)?,
            public_share,
        })
    }

    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.encode().as_slice()))
    }

    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        let bytes = Zeroizing::new(hex::decode(s).map_err(|_| CodecError::InvalidHex)?);
        Self::decode(&bytes)
    }
}
