//! Per-peer payload encryption (NIP-44 version 2).
//!
//! The conversation key is HKDF-SHA256 extract over the X coordinate of the
//! secp256k1 ECDH point, salted with `nip44-v2`, so both parties derive the
//! same key. Every message draws a 32-byte nonce that HKDF expands into a
//! ChaCha20 key, a ChaCha20 nonce and an HMAC-SHA256 key. The plaintext is
//! length-prefixed and padded before encryption.
//!
//! Payload: `base64(0x02 ‖ nonce(32) ‖ ciphertext ‖ mac(32))`, the MAC
//! covering `nonce ‖ ciphertext`.
//!
//! # Security
//! - A fresh nonce is drawn from `OsRng` for every message.
//! - The MAC is checked in constant time before decryption.
//! - Conversation keys, message keys and plaintexts are wiped after use.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand_core::{OsRng, RngCore};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::NetError;
use crate::curve::{Keys, PubKey};

type HmacSha256 = Hmac<Sha256>;

const VERSION: u8 = 2;
const SALT: &[u8] = b"nip44-v2";
const NONCE_LEN: usize = 32;
const MAC_LEN: usize = 32;
const MIN_PADDED_LEN: usize = 32;
const MAX_PLAINTEXT_LEN: usize = u16::MAX as usize;
const MIN_PAYLOAD_LEN: usize = 1 + NONCE_LEN + 2 + MIN_PADDED_LEN + MAC_LEN;
const MAX_PAYLOAD_LEN: usize = 1 + NONCE_LEN + 2 + (MAX_PLAINTEXT_LEN + 1) + MAC_LEN;

#[derive(Zeroize, ZeroizeOnDrop)]
struct MessageKeys {
    chacha_key: [u8; 32],
    chacha_nonce: [u8; 12],
    hmac_key: [u8; 32],
}

impl MessageKeys {
    fn derive(conversation_key: &[u8; 32], nonce: &[u8]) -> Result<Self, NetError> {
        let hkdf = Hkdf::<Sha256>::from_prk(conversation_key).map_err(|_| NetError::Encryption)?;
        let mut okm = Zeroizing::new([0u8; 76]);
        hkdf.expand(nonce, okm.as_mut_slice())
            .map_err(|_| NetError::Encryption)?;

        let mut keys = Self {
            chacha_key: [0; 32],
            chacha_nonce: [0; 12],
            hmac_key: [0; 32],
        };
        keys.chacha_key.copy_from_slice(&okm[..32]);
        keys.chacha_nonce.copy_from_slice(&okm[32..44]);
        keys.hmac_key.copy_from_slice(&okm[44..]);
        Ok(keys)
    }

    fn apply_keystream(&self, buffer: &mut [u8]) -> Result<(), NetError> {
        let mut cipher = ChaCha20::new_from_slices(&self.chacha_key, &self.chacha_nonce)
            .map_err(|_| NetError::Encryption)?;
        cipher.apply_keystream(buffer);
        Ok(())
    }

    fn mac(&self, nonce: &[u8], ciphertext: &[u8]) -> Result<HmacSha256, NetError> {
        let mut mac = HmacSha256::new_from_slice(&self.hmac_key).map_err(|_| NetError::Encryption)?;
        mac.update(nonce);
        mac.update(ciphertext);
        Ok(mac)
    }
}

/// Padded size of a plaintext of `len` bytes, excluding the length prefix.
fn padded_len(len: usize) -> usize {
    if len <= MIN_PADDED_LEN {
        return MIN_PADDED_LEN;
    }
    let next_power = 1usize << (usize::BITS - (len - 1).leading_zeros());
    let chunk = if next_power <= 256 { 32 } else { next_power / 8 };
    chunk * ((len - 1) / chunk + 1)
}

fn pad(plaintext: &[u8]) -> Result<Zeroizing<Vec<u8>>, NetError> {
    let prefix = u16::try_from(plaintext.len())
        .ok()
        .filter(|len| *len > 0)
        .ok_or(NetError::Encryption)?;
    let total = 2 + padded_len(plaintext.len());

    let mut padded = Zeroizing::new(Vec::with_capacity(total));
    padded.extend_from_slice(&prefix.to_be_bytes());
    padded.extend_from_slice(plaintext);
    padded.resize(total, 0);
    Ok(padded)
}

fn unpad(padded: &[u8]) -> Result<&[u8], NetError> {
    let [hi, lo, rest @ ..] = padded else {
        return Err(NetError::Decryption);
    };
    let len = usize::from(u16::from_be_bytes([*hi, *lo]));
    if len == 0 || rest.len() != padded_len(len) {
        return Err(NetError::Decryption);
    }
    Ok(&rest[..len])
}

/// Symmetric key shared by `keys` and `peer`.
pub fn conversation_key(keys: &Keys, peer: &PubKey) -> Result<Zeroizing<[u8; 32]>, NetError> {
    let shared_x = keys.shared_x(peer)?;
    let (prk, _) = Hkdf::<Sha256>::extract(Some(SALT), shared_x.as_slice());
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&prk);
    Ok(key)
}

/// Encrypts `plaintext` (1 to 65535 bytes) for `peer`.
pub fn encrypt(keys: &Keys, peer: &PubKey, plaintext: &[u8]) -> Result<String, NetError> {
    let key = conversation_key(keys, peer)?;
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    encrypt_with_nonce(&key, &nonce, plaintext)
}

fn encrypt_with_nonce(
    conversation_key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<String, NetError> {
    let message = MessageKeys::derive(conversation_key, nonce)?;
    let mut buffer = pad(plaintext)?;
    message.apply_keystream(&mut buffer)?;
    let tag = message.mac(nonce, &buffer)?.finalize().into_bytes();

    let mut out = Vec::with_capacity(1 + NONCE_LEN + buffer.len() + MAC_LEN);
    out.push(VERSION);
    out.extend_from_slice(nonce);
    out.extend_from_slice(&buffer);
    out.extend_from_slice(&tag);
    Ok(BASE64.encode(out))
}

/// Decrypts a payload `peer` encrypted for `keys`.
///
/// # Returns
/// * `Err(NetError::Decryption)` - Unknown version, bad length or padding,
///   or a MAC mismatch.
pub fn decrypt(keys: &Keys, peer: &PubKey, payload: &str) -> Result<Zeroizing<Vec<u8>>, NetError> {
    let key = conversation_key(keys, peer)?;
    decrypt_with_key(&key, payload)
}

fn decrypt_with_key(conversation_key: &[u8; 32], payload: &str) -> Result<Zeroizing<Vec<u8>>, NetError> {
    // '#' flags a non-base64 future version.
    if payload.starts_with('#') {
        return Err(NetError::Decryption);
    }
    let bytes = BASE64.decode(payload).map_err(|_| NetError::Decryption)?;
    if !(MIN_PAYLOAD_LEN..=MAX_PAYLOAD_LEN).contains(&bytes.len()) || bytes[0] != VERSION {
        return Err(NetError::Decryption);
    }
    let (nonce, rest) = bytes[1..].split_at(NONCE_LEN);
    let (ciphertext, tag) = rest.split_at(rest.len() - MAC_LEN);

    let message = MessageKeys::derive(conversation_key, nonce)?;
    message
        .mac(nonce, ciphertext)?
        .verify_slice(tag)
        .map_err(|_| NetError::Decryption)?;

    let mut padded = Zeroizing::new(ciphertext.to_vec());
    message.apply_keystream(&mut padded)?;
    Ok(Zeroizing::new(unpad(&padded)?.to_vec()))
}
