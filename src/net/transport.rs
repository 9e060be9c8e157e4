//! Relay transport seam.
//!
//! The distributor never talks to sockets directly; it publishes and
//! subscribes through a [`Transport`]. Applications plug in a websocket relay
//! pool, tests plug in an in-memory network.

use futures::stream::BoxStream;
use futures::StreamExt;

use super::event::Event;
use super::filter::Filter;
use super::NetError;

/// Result of publishing to one relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub relay: String,
    /// `Err` carries the relay's rejection reason.
    pub result: Result<(), String>,
}

/// Publish/subscribe access to a set of relays.
pub trait Transport: Send + Sync {
    /// Publishes `event` to every relay, yielding one outcome per relay as it
    /// settles.
    fn publish<'a>(&'a self, relays: &'a [String], event: &'a Event) -> BoxStream<'a, PublishOutcome>;

    /// Streams events matching `filter` from `relays` until the stream is
    /// dropped.
    fn subscribe(&self, relays: &[String], filter: Filter) -> BoxStream<'static, Event>;
}

/// Publishes `event` and resolves as soon as one relay accepts it.
///
/// # Returns
/// * `Ok(relay)` - The first relay that accepted.
/// * `Err(NetError::PublishFailed)` - No relay accepted; lists every reason.
pub async fn publish_to_any(
    transport: &dyn Transport,
    relays: &[String],
    event: &Event,
) -> Result<String, NetError> {
    if relays.is_empty() {
        return Err(NetError::PublishFailed("no relays".into()));
    }

    let mut outcomes = transport.publish(relays, event);
    let mut reasons = Vec::new();
    while let Some(outcome) = outcomes.next().await {
        match outcome.result {
            Ok(()) => return Ok(outcome.relay),
            Err(reason) => reasons.push(format!("{}: {}", outcome.relay, reason)),
        }
    }
    Err(NetError::PublishFailed(reasons.join("; ")))
}
