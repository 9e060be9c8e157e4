//! Signed relay events.
//!
//! An event id is the SHA-256 of the compact JSON array
//! `[0, pubkey, created_at, kind, tags, content]`; the signature is BIP-340
//! over that id. Both match what relays and signers compute, so an event built
//! here can be relayed and verified unchanged.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;
use sha2::{Digest, Sha256};

use super::NetError;
use crate::curve::{Keys, PubKey};

/// A tag: a name followed by its values.
pub type Tag = Vec<String>;

/// Current unix time in seconds.
pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn compute_id(pubkey: &PubKey, created_at: u64, kind: u16, tags: &[Tag], content: &str) -> [u8; 32] {
    let canonical = json!([0, pubkey.to_hex(), created_at, kind, tags, content]).to_string();
    Sha256::digest(canonical.as_bytes()).into()
}

fn first_tag<'a>(tags: &'a [Tag], name: &str) -> Option<&'a Tag> {
    tags.iter().find(|t| t.first().map(String::as_str) == Some(name))
}

/// An event before signing. Miners mutate its tags and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedEvent {
    pub pubkey: PubKey,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Tag>,
    pub content: String,
}

impl UnsignedEvent {
    pub fn new(pubkey: PubKey, kind: u16, tags: Vec<Tag>, content: String) -> Self {
        Self { pubkey, created_at: now(), kind, tags, content }
    }

    pub fn id(&self) -> [u8; 32] {
        compute_id(&self.pubkey, self.created_at, self.kind, &self.tags, &self.content)
    }

    pub fn first_tag(&self, name: &str) -> Option<&Tag> {
        first_tag(&self.tags, name)
    }

    /// Signs the event with `keys`, which must own `self.pubkey`.
    pub fn sign(self, keys: &Keys) -> Result<Event, NetError> {
        if keys.public_key() != self.pubkey {
            return Err(NetError::InvalidEvent);
        }
        let id = self.id();
        let sig = keys.sign(&id)?;
        Ok(Event {
            id,
            pubkey: self.pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig,
        })
    }
}

/// A signed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: [u8; 32],
    pub pubkey: PubKey,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: [u8; 64],
}

impl Event {
    pub fn id_hex(&self) -> String {
        hex::encode(self.id)
    }

    /// Checks both the id and the signature.
    pub fn verify(&self) -> bool {
        let id = compute_id(&self.pubkey, self.created_at, self.kind, &self.tags, &self.content);
        id == self.id && self.pubkey.verify(&self.id, &self.sig)
    }

    pub fn first_tag(&self, name: &str) -> Option<&Tag> {
        first_tag(&self.tags, name)
    }

    /// All tags named `name`.
    pub fn tags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
        self.tags.iter().filter(move |t| t.first().map(String::as_str) == Some(name))
    }

    /// Wire JSON object as relays expect it.
    pub fn to_json(&self) -> String {
        json!({
            "id": self.id_hex(),
            "pubkey": self.pubkey,
            "created_at": self.created_at,
            "kind": self.kind,
            "tags": self.tags,
            "content": self.content,
            "sig": hex::encode(self.sig),
        })
        .to_string()
    }
}
