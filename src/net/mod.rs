//! Messaging layer used to deliver shares.
//!
//! # Components
//! - `event`: signed relay events (id, BIP-340 signature, tags).
//! - `filter`: subscription filters and local matching.
//! - `transport`: the publish/subscribe seam to relays.
//! - `cipher`: per-peer payload encryption.
//! - `pow`: proof-of-work mining on event ids.

pub mod cipher;
pub mod event;
pub mod filter;
pub mod pow;
pub mod transport;

pub use event::{Event, Tag, UnsignedEvent};
pub use filter::Filter;
pub use pow::{difficulty_of, Nip13Miner, OnBetterWork, PowMiner};
pub use transport::{publish_to_any, PublishOutcome, Transport};

use crate::curve::KeyError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetError {
    /// No relay accepted the event.
    #[error("publish failed: {0}")]
    PublishFailed(String),
    /// The event does not belong to the signing key.
    #[error("invalid event")]
    InvalidEvent,
    #[error("encryption failed")]
    Encryption,
    #[error("decryption failed")]
    Decryption,
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("mining failed: {0}")]
    Mining(String),
}
