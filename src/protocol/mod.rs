//! Protocol Layer.
//!
//! This module implements share distribution to remote signers:
//! - Admission control over the share pool and the failure budget (`admission`)
//! - Mining progress aggregation (`progress`)
//! - Concurrent delivery and quorum detection (`distributor`)
//! - The coordination record announced once a quorum accepted (`record`)
//!
//! # Guarantees
//! - A share is claimed by at most one attempt at a time and is never lost: a
//!   failed or abandoned attempt returns it to the pool.
//! - An accepted share is never reassigned.
//! - No coordination record is published unless every share was accepted.

pub(crate) mod admission;
pub mod distributor;
pub mod progress;
pub mod record;

pub use distributor::{DistributionRequest, Distributor, OutcomeCallback};
pub use progress::{overall_progress, ProgressCallback};
pub use record::CoordinationRecord;

use crate::codec::CodecError;
use crate::curve::KeyError;
use crate::mpc::MpcError;
use crate::net::NetError;

/// Errors related to share distribution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DistributionError {
    /// Bad threshold or signer count; surfaced before any delivery.
    #[error("invalid number of signers or threshold")]
    InvalidParameters,
    /// Wire data failed to decode.
    #[error(transparent)]
    MalformedEncoding(#[from] CodecError),
    /// The signer has no known inbox relay. Never charged to the failure budget.
    #[error("signer has no known relays")]
    SignerUnreachable,
    /// No acknowledgement arrived before the deadline.
    #[error("timed out waiting for acknowledgement")]
    DeliveryTimeout,
    /// None of the signer's relays accepted the shard.
    #[error("publish failed: {0}")]
    PublishFailure(String),
    /// The quorum was not reached or became unreachable.
    #[error("not enough signers accepted: {accepted} of {required}")]
    InsufficientSigners { accepted: usize, required: usize },
    /// Every share was placed but the coordinator rejected the record.
    /// The message always starts with `Error:`.
    #[error("{0}")]
    CoordinatorPublishFailure(String),
    #[error("mining failed: {0}")]
    Mining(String),
    #[error("crypto failure: {0}")]
    Crypto(String),
    #[error("invalid coordination record: {0}")]
    InvalidRecord(String),
}

impl From<MpcError> for DistributionError {
    fn from(err: MpcError) -> Self {
        match err {
            MpcError::InvalidParameters => DistributionError::InvalidParameters,
            other => DistributionError::Crypto(other.to_string()),
        }
    }
}

impl From<KeyError> for DistributionError {
    fn from(err: KeyError) -> Self {
        DistributionError::Crypto(err.to_string())
    }
}

impl From<NetError> for DistributionError {
    fn from(err: NetError) -> Self {
        match err {
            NetError::PublishFailed(reason) => DistributionError::PublishFailure(reason),
            NetError::Mining(reason) => DistributionError::Mining(reason),
            other => DistributionError::Crypto(other.to_string()),
        }
    }
}
