//! Miner-facing solution submission

use crate::claim::{ClaimRepository, ShareOutcome};
use crate::node::EthereumNode;
use crate::pow::Ethash;
use crate::share::{Share, SolutionState};
use crate::types::{BlockNonce, H256};
use crate::work::{Work, WorkPool};
use crate::{Error, Result};
use num_bigint::BigUint;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Hands out work and classifies returned solutions
pub struct PoolService {
    node: Arc<dyn EthereumNode>,
    pow: Arc<dyn Ethash>,
    repository: Arc<ClaimRepository>,
    works: WorkPool,
    share_difficulty: BigUint,
    shutdown: CancellationToken,
}

impl PoolService {
    pub fn new(
        node: Arc<dyn EthereumNode>,
        pow: Arc<dyn Ethash>,
        repository: Arc<ClaimRepository>,
        share_difficulty: BigUint,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            node,
            pow,
            repository,
            works: WorkPool::new(),
            share_difficulty,
            shutdown,
        }
    }

    pub fn works(&self) -> &WorkPool {
        &self.works
    }

    pub fn repository(&self) -> &Arc<ClaimRepository> {
        &self.repository
    }

    /// Fetch a template from the node and remember it for later submissions
    pub async fn get_work(&self) -> Result<[H256; 3]> {
        let pending = self.node.get_work().await?;
        let work = self
            .works
            .insert(Work::new(pending, self.share_difficulty.clone())?);
        debug!(pow_hash = %work.pow_hash(), block = work.header().number, "Work handed out");
        Ok(work.package())
    }

    /// Classify a solution.
    ///
    /// Full blocks go to the node and are not kept as shares. Valid shares
    /// go to the claim repository. Unknown work, invalid shares and shares
    /// the open claim already holds are rejected with `false`.
    #[instrument(skip(self), fields(pow_hash = %pow_hash))]
    pub async fn submit_work(
        &self,
        nonce: BlockNonce,
        pow_hash: H256,
        mix_digest: H256,
    ) -> Result<bool> {
        let Some(work) = self.works.get(&pow_hash) else {
            warn!("Solution submitted for unknown work");
            return Ok(false);
        };

        let share = Share::new(
            Arc::clone(work.header()),
            work.share_difficulty().clone(),
            nonce,
            mix_digest,
        );
        let pow = Arc::clone(&self.pow);
        let share = tokio::task::spawn_blocking(move || {
            pow.solution_state(&share).map(|state| share.classified(state))
        })
        .await
        .map_err(|e| Error::invalid_state(format!("classification task failed: {}", e)))??;
        debug!(%nonce, state = %share.solution_state(), "Solution classified");

        match share.solution_state() {
            SolutionState::FullBlock => {
                let accepted = self.node.submit_work(nonce, pow_hash, mix_digest).await?;
                if accepted {
                    info!(block = work.header().number, "Full block solution accepted");
                    self.works.remove(&pow_hash);
                } else {
                    warn!(block = work.header().number, "Node rejected full block solution");
                }
                Ok(accepted)
            }
            SolutionState::ValidShare => {
                match self.repository.add_share(share).await {
                    Ok(ShareOutcome::Duplicate) => {
                        warn!(%nonce, "Duplicate share rejected");
                        return Ok(false);
                    }
                    Ok(ShareOutcome::Added(Some(submission))) => {
                        debug!(claim = submission.claim_number, "Share completed a claim")
                    }
                    Ok(ShareOutcome::Added(None)) => {}
                    Err(e) if e.is_fatal() => {
                        error!(category = e.category(), "Claim repository failed: {}", e);
                        self.shutdown.cancel();
                        return Err(e);
                    }
                    Err(e) => warn!("Claim submission deferred: {}", e),
                }
                Ok(true)
            }
            SolutionState::Invalid => Ok(false),
        }
    }

    pub async fn submit_hashrate(&self, rate: u64, id: H256) -> Result<bool> {
        self.node.submit_hashrate(rate, id).await
    }
}
