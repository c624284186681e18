//! Pool contract collaborator

use crate::claim::{ClaimSummary, VerificationProof};
use crate::types::H256;
use crate::Result;
use async_trait::async_trait;
use num_bigint::BigUint;

/// Transactions the client sends to the on-chain pool contract.
///
/// Both submissions return the transaction hash; inclusion is checked
/// separately through [`crate::txs::TxWatcher`].
#[async_trait]
pub trait PoolContract: Send + Sync {
    async fn submit_claim(&self, claim: &ClaimSummary) -> Result<H256>;

    async fn verify_claim(&self, proof: &VerificationProof) -> Result<H256>;

    /// Randomness the contract fixed for the latest submitted claim
    async fn claim_seed(&self) -> Result<BigUint>;
}
