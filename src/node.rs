//! Ethereum node collaborator

use crate::share::BlockHeader;
use crate::types::{BlockNonce, H256};
use crate::Result;
use async_trait::async_trait;

/// Block template handed out by the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWork {
    pub header: BlockHeader,
    pub pow_hash: H256,
    pub seed_hash: H256,
}

#[async_trait]
pub trait EthereumNode: Send + Sync {
    async fn get_work(&self) -> Result<PendingWork>;

    /// Forward a full block solution; the node's acceptance verdict
    async fn submit_work(&self, nonce: BlockNonce, pow_hash: H256, mix_digest: H256)
        -> Result<bool>;

    async fn submit_hashrate(&self, rate: u64, id: H256) -> Result<bool>;

    /// Whether the transaction has been included in a block
    async fn is_confirmed(&self, tx: H256) -> Result<bool>;
}
