//! Schnorr keypairs and x-only public keys.
//!
//! Identities on the messaging layer are BIP-340 x-only public keys. A `Keys`
//! value owns the 32-byte secret and is used both to sign events and to derive
//! per-peer payload keys through ECDH.
//!
//! # Security
//! - The secret bytes are wrapped in `Zeroizing` and wiped on drop.
//! - `Debug` never prints the secret.

use core::fmt;
use core::str::FromStr;

use k256::elliptic_curve::sec1::FromEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::schnorr::{Signature, SigningKey, VerifyingKey};
use k256::{AffinePoint, EncodedPoint, FieldBytes, NonZeroScalar, Scalar};
use rand_core::{OsRng, RngCore};
use serde::{Serialize, Serializer};
use zeroize::Zeroizing;

use super::KeyError;

/// A 32-byte x-only public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PubKey([u8; 32]);

impl PubKey {
    /// Parses and validates raw x-only bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        VerifyingKey::from_bytes(bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidHex)?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Lifts the x-only key to the curve point with even Y.
    pub fn to_affine(&self) -> Result<AffinePoint, KeyError> {
        let mut sec1 = [0u8; 33];
        sec1[0] = 0x02;
        sec1[1..].copy_from_slice(&self.0);
        let encoded = EncodedPoint::from_bytes(sec1).map_err(|_| KeyError::InvalidPublicKey)?;
        Option::from(AffinePoint::from_encoded_point(&encoded)).ok_or(KeyError::InvalidPublicKey)
    }

    /// Verifies a BIP-340 signature over a 32-byte message (an event id).
    pub fn verify(&self, msg: &[u8; 32], sig: &[u8; 64]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let Ok(sig) = Signature::try_from(&sig[..]) else {
            return false;
        };
        key.verify_raw(msg, &sig).is_ok()
    }
}

impl fmt::Display for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey({})", self.to_hex())
    }
}

impl FromStr for PubKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for PubKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// A secret key together with its x-only public key.
#[derive(Clone)]
pub struct Keys {
    secret: Zeroizing<[u8; 32]>,
    signing: SigningKey,
    public: PubKey,
}

impl Keys {
    /// Generates a fresh random keypair.
    pub fn generate() -> Self {
        loop {
            let scalar = *NonZeroScalar::random(&mut OsRng);
            let bytes = Zeroizing::new(<[u8; 32]>::from(scalar.to_bytes()));
            if let Ok(keys) = Self::from_secret_bytes(bytes.as_slice()) {
                return keys;
            }
        }
    }

    /// Builds a keypair from a 32-byte big-endian secret.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != 32 {
            return Err(KeyError::InvalidSecretKey);
        }
        let signing = SigningKey::from_bytes(bytes).map_err(|_| KeyError::InvalidSecretKey)?;
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(bytes);
        let public = PubKey(signing.verifying_key().to_bytes().into());
        Ok(Self { secret, signing, public })
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = Zeroizing::new(hex::decode(s).map_err(|_| KeyError::InvalidHex)?);
        Self::from_secret_bytes(&bytes)
    }

    pub fn public_key(&self) -> PubKey {
        self.public
    }

    /// The secret as a scalar, exactly as supplied (no parity normalization).
    pub fn secret_scalar(&self) -> Result<Scalar, KeyError> {
        let repr = FieldBytes::clone_from_slice(self.secret.as_slice());
        Option::from(Scalar::from_repr(repr)).ok_or(KeyError::InvalidSecretKey)
    }

    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.secret.as_slice()))
    }

    /// Signs a 32-byte message (an event id) with BIP-340.
    pub fn sign(&self, msg: &[u8; 32]) -> Result<[u8; 64], KeyError> {
        let mut aux_rand = [0u8; 32];
        OsRng.fill_bytes(&mut aux_rand);
        let sig = self
            .signing
            .sign_raw(msg, &aux_rand)
            .map_err(|_| KeyError::SigningFailed)?;
        Ok(sig.to_bytes())
    }

    /// X coordinate of the ECDH point between this secret and `peer`.
    ///
    /// Symmetric: `a.shared_x(B) == b.shared_x(A)` because both sides lift the
    /// x-only keys the same way and negation does not change X.
    pub fn shared_x(&self, peer: &PubKey) -> Result<Zeroizing<[u8; 32]>, KeyError> {
        let repr = FieldBytes::clone_from_slice(self.secret.as_slice());
        let secret: NonZeroScalar =
            Option::from(NonZeroScalar::from_repr(repr)).ok_or(KeyError::InvalidSecretKey)?;
        let point = peer.to_affine()?;
        let shared = k256::ecdh::diffie_hellman(secret, point);
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(shared.raw_secret_bytes().as_slice());
        Ok(out)
    }
}

impl fmt::Debug for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keys")
            .field("public", &self.public)
            .field("secret", &"***SENSITIVE***")
            .finish()
    }
}
