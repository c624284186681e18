//! SmartPool client
//!
//! Client side of a trustless mining pool:
//! - miners fetch work and submit solutions over JSON-RPC
//! - valid shares are batched into claims, ordered by counter
//! - each claim is committed to the pool contract as an augmented Merkle root
//! - one share per claim is later proven with a claim branch plus a
//!   proof-of-work dataset branch

pub mod claim;
pub mod config;
pub mod contract;
pub mod crypto;
pub mod error;
pub mod mtree;
pub mod node;
pub mod pow;
pub mod retry;
pub mod server;
pub mod share;
pub mod txs;
pub mod types;
pub mod utils;
pub mod work;

pub use claim::{Claim, ClaimRepository, ClaimStatus, ClaimSummary, VerificationProof};
pub use config::Config;
pub use error::{Error, Result};
pub use share::{BlockHeader, Share, SolutionState};
pub use types::*;

/// Application information
pub const APP_NAME: &str = "smartpool-client";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
