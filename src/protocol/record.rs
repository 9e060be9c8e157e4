//! Coordination record.
//!
//! Announces a completed distribution to the coordinator: which signer holds
//! which public share, the threshold, and a one-time handler keypair naming
//! this dealing session.
//!
//! # Tags
//! - `["p", <signer>, <public share hex>]` per accepted signer
//! - `["threshold", <t>]`
//! - `["handlersecret", <hex>]`
//! - `["h", <handler pubkey>]`

use super::DistributionError;
use crate::curve::{Keys, PubKey};
use crate::mpc::PublicShare;
use crate::net::{Event, Tag, UnsignedEvent};

/// Largest threshold a coordinator accepts.
pub const MAX_RECORD_THRESHOLD: u32 = 20;

#[derive(Debug, Clone)]
pub struct CoordinationRecord {
    /// Accepted signers with the hex of the public share each holds.
    pub signers: Vec<(PubKey, String)>,
    pub threshold: u32,
    /// One-time session keypair.
    pub handler: Keys,
    /// The signed announcement, authored by the dealer.
    pub event: Event,
}

impl CoordinationRecord {
    /// Builds and signs the record with the dealer's keys.
    pub(crate) fn build(
        dealer: &Keys,
        signers: Vec<(PubKey, String)>,
        threshold: u32,
        handler: Keys,
        kind: u16,
    ) -> Result<Self, DistributionError> {
        let mut tags: Vec<Tag> = signers
            .iter()
            .map(|(signer, share)| vec!["p".into(), signer.to_hex(), share.clone()])
            .collect();
        tags.push(vec!["threshold".into(), threshold.to_string()]);
        tags.push(vec!["handlersecret".into(), handler.secret_hex().to_string()]);
        tags.push(vec!["h".into(), handler.public_key().to_hex()]);

        let event = UnsignedEvent::new(dealer.public_key(), kind, tags, String::new()).sign(dealer)?;
        Ok(Self { signers, threshold, handler, event })
    }

    pub fn handler_pubkey(&self) -> PubKey {
        self.handler.public_key()
    }

    /// Parses and validates a received record.
    ///
    /// # Returns
    /// * `Err(DistributionError::InvalidRecord)` if the kind or signature is
    ///   wrong, the handler secret does not match `h`, the threshold is outside
    ///   `1..=20`, a `p` tag is malformed, or there are fewer signers than the
    ///   threshold.
    /// * `Err(DistributionError::MalformedEncoding)` if a public share does not
    ///   decode.
    pub fn from_event(event: &Event, kind: u16) -> Result<Self, DistributionError> {
        let invalid = |reason: &str| DistributionError::InvalidRecord(reason.to_string());

        if event.kind != kind {
            return Err(invalid("unexpected kind"));
        }
        if !event.verify() {
            return Err(invalid("bad signature"));
        }

        let secret = event
            .first_tag("handlersecret")
            .and_then(|t| t.get(1))
            .ok_or_else(|| invalid("missing handler secret"))?;
        let handler = Keys::from_hex(secret).map_err(|_| invalid("bad handler secret"))?;
        let announced = event
            .first_tag("h")
            .and_then(|t| t.get(1))
            .ok_or_else(|| invalid("missing handler pubkey"))?;
        if handler.public_key().to_hex() != *announced {
            return Err(invalid("handler secret does not match pubkey"));
        }

        let threshold: u32 = event
            .first_tag("threshold")
            .and_then(|t| t.get(1))
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| invalid("missing threshold"))?;
        if threshold == 0 || threshold > MAX_RECORD_THRESHOLD {
            return Err(invalid("threshold out of range"));
        }

        let mut signers = Vec::new();
        for tag in event.tags_named("p") {
            let [_, signer, share] = tag.as_slice() else {
                return Err(invalid("p tag must have 3 items"));
            };
            let signer = PubKey::from_hex(signer).map_err(|_| invalid("bad signer pubkey"))?;
            PublicShare::from_hex(share)?;
            signers.push((signer, share.clone()));
        }
        if signers.len() < threshold as usize {
            return Err(invalid("fewer signers than threshold"));
        }

        Ok(Self {
            signers,
            threshold,
            handler,
            event: event.clone(),
        })
    }

    /// Decodes every signer's public share.
    pub fn public_shares(&self) -> Result<Vec<(PubKey, PublicShare)>, DistributionError> {
        self.signers
            .iter()
            .map(|(signer, share)| Ok((*signer, PublicShare::from_hex(share)?)))
            .collect()
    }
}
