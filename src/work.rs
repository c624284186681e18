//! Work handed to miners and the pool of outstanding work

use crate::crypto::biguint_pad32;
use crate::node::PendingWork;
use crate::share::BlockHeader;
use crate::types::H256;
use crate::{Error, Result};
use dashmap::DashMap;
use num_bigint::BigUint;
use num_traits::Zero;
use std::sync::Arc;

/// Blocks a work package stays claimable after newer work arrives
pub const WORK_RETENTION_BLOCKS: u64 = 8;

/// `((1 << 255) / difficulty) << 1`, saturating at the all-ones target
pub fn share_target(difficulty: &BigUint) -> Result<H256> {
    if difficulty.is_zero() {
        return Err(Error::invalid_params("share difficulty must be positive"));
    }
    let target = ((BigUint::from(1u8) << 255u32) / difficulty) << 1u32;
    if target.bits() > 256 {
        return Ok(H256([0xff; 32]));
    }
    Ok(H256(biguint_pad32(&target)))
}

/// A block template with the pool's share difficulty attached
#[derive(Debug, Clone)]
pub struct Work {
    header: Arc<BlockHeader>,
    pow_hash: H256,
    seed_hash: H256,
    share_difficulty: BigUint,
    target: H256,
}

impl Work {
    pub fn new(pending: PendingWork, share_difficulty: BigUint) -> Result<Self> {
        let target = share_target(&share_difficulty)?;
        Ok(Self {
            header: Arc::new(pending.header),
            pow_hash: pending.pow_hash,
            seed_hash: pending.seed_hash,
            share_difficulty,
            target,
        })
    }

    pub fn header(&self) -> &Arc<BlockHeader> {
        &self.header
    }

    pub fn pow_hash(&self) -> H256 {
        self.pow_hash
    }

    pub fn seed_hash(&self) -> H256 {
        self.seed_hash
    }

    pub fn share_difficulty(&self) -> &BigUint {
        &self.share_difficulty
    }

    pub fn share_target(&self) -> H256 {
        self.target
    }

    /// `[pow hash, seed hash, share target]` as returned to miners
    pub fn package(&self) -> [H256; 3] {
        [self.pow_hash, self.seed_hash, self.target]
    }
}

/// Outstanding work keyed by pow hash
#[derive(Debug, Default)]
pub struct WorkPool {
    works: DashMap<H256, Arc<Work>>,
}

impl WorkPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `work`, forgetting packages more than
    /// [`WORK_RETENTION_BLOCKS`] behind it
    pub fn insert(&self, work: Work) -> Arc<Work> {
        let work = Arc::new(work);
        let oldest = work.header.number.saturating_sub(WORK_RETENTION_BLOCKS);
        self.works.retain(|_, w| w.header.number >= oldest);
        self.works.insert(work.pow_hash, Arc::clone(&work));
        work
    }

    pub fn get(&self, pow_hash: &H256) -> Option<Arc<Work>> {
        self.works.get(pow_hash).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, pow_hash: &H256) -> Option<Arc<Work>> {
        self.works.remove(pow_hash).map(|(_, work)| work)
    }

    pub fn len(&self) -> usize {
        self.works.len()
    }

    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }
}
