//! Claim lifecycle: accumulate, rotate, submit, audit
//!
//! All repository state sits behind one async mutex. A rotation holds it
//! from reading the current claim until the contract has accepted the
//! summary and the next claim is open, so readers never observe a claim
//! that is half rotated. If submission fails nothing is changed and the
//! next share or tick tries again. Audits run one at a time under a
//! separate lock so share ingestion is never blocked on a proof.

use super::{build_verification_proof, Claim, ClaimSummary};
use crate::config::AuditPolicy;
use crate::contract::PoolContract;
use crate::node::EthereumNode;
use crate::pow::{DatasetLocator, Ethash};
use crate::retry::RetryPolicy;
use crate::share::Share;
use crate::txs::TxWatcher;
use crate::types::{Counter, H256};
use crate::{Error, Result};
use num_traits::ToPrimitive;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Repository settings
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Shares per claim before it is submitted
    pub share_threshold: usize,
    pub audit_policy: AuditPolicy,
    /// Fixed audit position; `None` derives it from the contract's claim seed
    pub audit_index: Option<usize>,
    pub datasets: DatasetLocator,
    pub submit_interval: Duration,
    pub confirmation_poll: Duration,
    pub confirmation_timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

/// Lifecycle of one claim slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    Open,
    Submitted { tx: H256 },
    Verified { tx: H256 },
}

/// A rotation the contract accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSubmission {
    pub claim_number: u64,
    pub tx: H256,
    pub summary: ClaimSummary,
}

/// What happened to a share handed to [`ClaimRepository::add_share`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    /// The open claim already holds a share with this counter
    Duplicate,
    /// Appended; carries the submission when the share completed the claim
    Added(Option<ClaimSubmission>),
}

impl ShareOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ShareOutcome::Duplicate)
    }

    pub fn submission(self) -> Option<ClaimSubmission> {
        match self {
            ShareOutcome::Added(submission) => submission,
            ShareOutcome::Duplicate => None,
        }
    }
}

/// A verification the contract confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimVerification {
    pub claim_number: u64,
    pub share_index: usize,
    pub tx: H256,
}

#[derive(Debug, Clone)]
struct ClaimSlot {
    claim: Claim,
    status: ClaimStatus,
}

impl ClaimSlot {
    fn open() -> Self {
        Self {
            claim: Claim::new(),
            status: ClaimStatus::Open,
        }
    }
}

struct RepositoryState {
    claims: BTreeMap<u64, ClaimSlot>,
    current: u64,
    /// Counters already in the open claim
    counters: HashSet<Counter>,
}

impl RepositoryState {
    fn current_slot(&self) -> Result<&ClaimSlot> {
        self.claims
            .get(&self.current)
            .ok_or_else(|| Error::invalid_state(format!("claim {} has no slot", self.current)))
    }

    fn current_slot_mut(&mut self) -> Result<&mut ClaimSlot> {
        let current = self.current;
        self.claims
            .get_mut(&current)
            .ok_or_else(|| Error::invalid_state(format!("claim {} has no slot", current)))
    }

    /// Submitted claim to audit next, with its submission tx
    fn audit_target(&self, policy: AuditPolicy) -> Option<(u64, Claim, H256)> {
        let submitted = |number: u64, slot: &ClaimSlot| match slot.status {
            ClaimStatus::Submitted { tx } => Some((number, slot.claim.clone(), tx)),
            _ => None,
        };
        match policy {
            AuditPolicy::Previous => {
                let number = self.current.checked_sub(1)?;
                submitted(number, self.claims.get(&number)?)
            }
            AuditPolicy::OldestUnverified => self
                .claims
                .iter()
                .find_map(|(&number, slot)| submitted(number, slot)),
        }
    }
}

/// Owns every claim and drives rotation and auditing
pub struct ClaimRepository {
    config: RepositoryConfig,
    state: Mutex<RepositoryState>,
    audit: Mutex<()>,
    contract: Arc<dyn PoolContract>,
    node: Arc<dyn EthereumNode>,
    pow: Arc<dyn Ethash>,
}

impl ClaimRepository {
    pub fn new(
        config: RepositoryConfig,
        contract: Arc<dyn PoolContract>,
        node: Arc<dyn EthereumNode>,
        pow: Arc<dyn Ethash>,
    ) -> Self {
        let mut claims = BTreeMap::new();
        claims.insert(0, ClaimSlot::open());
        Self {
            config,
            state: Mutex::new(RepositoryState {
                claims,
                current: 0,
                counters: HashSet::new(),
            }),
            audit: Mutex::new(()),
            contract,
            node,
            pow,
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub async fn current_claim_number(&self) -> u64 {
        self.state.lock().await.current
    }

    pub async fn next_claim_number(&self) -> u64 {
        self.state.lock().await.current + 1
    }

    /// Snapshot of the claim collecting shares
    pub async fn current_claim(&self) -> Result<Claim> {
        let state = self.state.lock().await;
        Ok(state.current_slot()?.claim.clone())
    }

    pub async fn claim(&self, number: u64) -> Option<Claim> {
        let state = self.state.lock().await;
        state.claims.get(&number).map(|slot| slot.claim.clone())
    }

    pub async fn claim_status(&self, number: u64) -> Option<ClaimStatus> {
        let state = self.state.lock().await;
        state.claims.get(&number).map(|slot| slot.status)
    }

    /// Append a share to the current claim and rotate once the threshold is
    /// reached.
    ///
    /// A share whose counter is already in the open claim is refused. The
    /// share is kept even when the rotation fails.
    #[instrument(skip_all, fields(nonce = %share.nonce()))]
    pub async fn add_share(&self, share: Share) -> Result<ShareOutcome> {
        let mut state = self.state.lock().await;
        if !state.counters.insert(share.counter()) {
            debug!("Duplicate share refused");
            return Ok(ShareOutcome::Duplicate);
        }
        let slot = state.current_slot_mut()?;
        slot.claim.push(share);
        debug!(shares = slot.claim.len(), "Share added to claim");
        self.rotate_locked(&mut state).await.map(ShareOutcome::Added)
    }

    /// Timer-driven rotation
    pub async fn rotate_if_due(&self) -> Result<Option<ClaimSubmission>> {
        let mut state = self.state.lock().await;
        self.rotate_locked(&mut state).await
    }

    async fn rotate_locked(&self, state: &mut RepositoryState) -> Result<Option<ClaimSubmission>> {
        let number = state.current;
        let slot = state.current_slot()?;
        if slot.claim.len() < self.config.share_threshold {
            return Ok(None);
        }

        let sorted = slot.claim.sorted();
        let summary = sorted.summary()?;
        info!(
            claim = number,
            shares = summary.num_shares,
            root = %summary.root_hash,
            "Submitting claim"
        );
        let tx = self
            .config
            .retry
            .execute(|| self.contract.submit_claim(&summary))
            .await?;

        state.claims.insert(
            number,
            ClaimSlot {
                claim: sorted,
                status: ClaimStatus::Submitted { tx },
            },
        );
        state.current = number + 1;
        state.claims.insert(state.current, ClaimSlot::open());
        state.counters.clear();
        info!(claim = number, %tx, "Claim submitted");

        Ok(Some(ClaimSubmission {
            claim_number: number,
            tx,
            summary,
        }))
    }

    /// Prove one share of the claim selected by the audit policy.
    ///
    /// Returns `None` when no submitted claim is waiting for verification.
    pub async fn verify_next(&self) -> Result<Option<ClaimVerification>> {
        self.audit(&CancellationToken::new()).await
    }

    async fn audit(&self, cancel: &CancellationToken) -> Result<Option<ClaimVerification>> {
        let _audit = self.audit.lock().await;
        let target = self.state.lock().await.audit_target(self.config.audit_policy);
        let Some((number, claim, submit_tx)) = target else {
            return Ok(None);
        };

        self.wait_for(submit_tx, cancel).await?;
        let index = self.audit_index(&claim).await?;
        info!(claim = number, share_index = index, "Building verification proof");

        let pow = Arc::clone(&self.pow);
        let datasets = self.config.datasets.clone();
        let proof = tokio::task::spawn_blocking(move || {
            build_verification_proof(&claim, index, pow.as_ref(), &datasets)
        })
        .await
        .map_err(|e| Error::invalid_state(format!("proof construction task failed: {}", e)))??;

        let tx = self
            .config
            .retry
            .execute(|| self.contract.verify_claim(&proof))
            .await?;
        info!(claim = number, share_index = index, %tx, "Verification submitted");
        self.wait_for(tx, cancel).await?;

        let mut state = self.state.lock().await;
        if let Some(slot) = state.claims.get_mut(&number) {
            slot.status = ClaimStatus::Verified { tx };
        }
        info!(claim = number, "Claim verified");

        Ok(Some(ClaimVerification {
            claim_number: number,
            share_index: index,
            tx,
        }))
    }

    async fn audit_index(&self, claim: &Claim) -> Result<usize> {
        if claim.is_empty() {
            return Err(Error::invalid_state("submitted claim holds no shares"));
        }
        match self.config.audit_index {
            Some(index) if index < claim.len() => Ok(index),
            Some(index) => Err(Error::invalid_state(format!(
                "audit index {} outside claim of {} shares",
                index,
                claim.len()
            ))),
            None => {
                let seed = self
                    .config
                    .retry
                    .execute(|| self.contract.claim_seed())
                    .await?;
                (seed % claim.len())
                    .to_usize()
                    .ok_or_else(|| Error::invalid_state("claim seed reduction overflowed"))
            }
        }
    }

    async fn wait_for(&self, tx: H256, cancel: &CancellationToken) -> Result<()> {
        TxWatcher::new(self.node.as_ref(), self.config.confirmation_poll)
            .with_timeout(self.config.confirmation_timeout)
            .with_cancel(cancel.clone())
            .wait(tx)
            .await
    }

    /// Timer loop: rotate a due claim, then audit one submitted claim.
    ///
    /// Returns when `shutdown` fires or on a fatal error.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<()> {
        let mut ticker = interval(self.config.submit_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        info!(interval = ?self.config.submit_interval, "Claim repository started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Claim repository stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            match self.tick(&shutdown).await {
                Ok(()) => {}
                Err(Error::Cancelled { .. }) => {
                    info!("Claim repository stopped while waiting for a transaction");
                    return Ok(());
                }
                Err(e) if e.is_fatal() => {
                    error!(category = e.category(), "Claim repository failed: {}", e);
                    return Err(e);
                }
                Err(e) => warn!(category = e.category(), "Claim repository tick failed: {}", e),
            }
        }
    }

    async fn tick(&self, cancel: &CancellationToken) -> Result<()> {
        self.rotate_if_due().await?;
        self.audit(cancel).await?;
        Ok(())
    }
}
