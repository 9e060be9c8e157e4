//! Configuration for share distribution.
//!
//! Defines the settings the host application hands to the distributor.

use std::time::Duration;

/// Relays listened on for acknowledgements when the caller supplies none.
pub const DEFAULT_FALLBACK_RELAYS: [&str; 4] = [
    "wss://relay.primal.net",
    "wss://pyramid.fiatjaf.com",
    "wss://relay.damus.io",
    "wss://nostr-pub.wellorder.net",
];

/// Event kinds used by the distribution protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventKinds {
    /// Encrypted share sent to a signer.
    pub shard: u16,
    /// Signer's acknowledgement of a shard.
    pub shard_ack: u16,
    /// Coordination record sent to the coordinator.
    pub registration: u16,
}

impl Default for EventKinds {
    fn default() -> Self {
        Self {
            shard: 26428,
            shard_ack: 26429,
            registration: 16430,
        }
    }
}

/// Main configuration structure for the distributor.
///
/// This struct should be populated by the host application and passed to
/// [`crate::protocol::Distributor::new`].
#[derive(Debug, Clone)]
pub struct DistributorConfig {
    /// Deadline for one delivery attempt, covering publish and acknowledgement
    /// (default 7 s).
    pub ack_timeout: Duration,

    /// Relays advertised to signers in the `reply` tag and listened on for
    /// acknowledgements, in addition to the sender's own inbox.
    /// An empty list means [`DEFAULT_FALLBACK_RELAYS`].
    pub fallback_relays: Vec<String>,

    /// Event kinds of shards, acknowledgements and the coordination record.
    pub kinds: EventKinds,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(7),
            fallback_relays: DEFAULT_FALLBACK_RELAYS.iter().map(|r| r.to_string()).collect(),
            kinds: EventKinds::default(),
        }
    }
}

impl DistributorConfig {
    /// Fallback relays, substituting the defaults for an empty list.
    pub fn reply_relays(&self) -> Vec<String> {
        if self.fallback_relays.is_empty() {
            DEFAULT_FALLBACK_RELAYS.iter().map(|r| r.to_string()).collect()
        } else {
            self.fallback_relays.clone()
        }
    }
}
