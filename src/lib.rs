//! Threshold key dealer and shard distribution.
//!
//! Splits a secp256k1 secret key into `t`-of-`n` Shamir shares with Feldman
//! commitments, delivers each share to a remote signer over encrypted,
//! proof-of-work gated relay events, and announces a coordination record once
//! every share is acknowledged.
//!
//! # Components
//! - `curve`: compressed points and BIP-340 keys.
//! - `mpc`: dealing, reconstruction and share verification.
//! - `codec`: binary and hex wire format of shares.
//! - `net`: events, filters, payload encryption, proof of work, transport seam.
//! - `protocol`: admission control, distribution, coordination record.
//! - `config`: distributor settings.

pub mod codec;
pub mod config;
pub mod curve;
pub mod mpc;
pub mod net;
pub mod protocol;

pub use config::DistributorConfig;
pub use curve::{Keys, PubKey};
pub use mpc::{deal_shares, Dealing, KeyShare, PublicShare};
pub use protocol::{CoordinationRecord, DistributionError, DistributionRequest, Distributor};
