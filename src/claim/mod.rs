//! Claims: batches of shares committed to the pool contract as one tree
//!
//! Tree construction always uses counter order, never arrival order, so the
//! min/max range of every subtree is bounded by its position.

use crate::mtree::{AugTree, FinalizedAugTree};
use crate::share::Share;
use crate::types::{Counter, NodeHash};
use crate::{Error, Result};
use num_bigint::BigUint;

pub mod proof;
pub mod repository;

pub use proof::{build_verification_proof, VerificationProof};
pub use repository::{
    ClaimRepository, ClaimStatus, ClaimSubmission, ClaimVerification, RepositoryConfig,
    ShareOutcome,
};

/// Shares collected for one on-chain commitment, in insertion order
#[derive(Debug, Clone, Default)]
pub struct Claim {
    shares: Vec<Share>,
}

impl Claim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, share: Share) {
        self.shares.push(share);
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn shares(&self) -> &[Share] {
        &self.shares
    }

    /// Smallest share difficulty, `None` for an empty claim
    pub fn min_difficulty(&self) -> Option<&BigUint> {
        self.shares.iter().map(Share::share_difficulty).min()
    }

    /// Sort shares by ascending counter
    pub fn sort_by_counter(&mut self) {
        self.shares.sort_by_cached_key(Share::counter);
    }

    /// Copy of this claim in counter order
    pub fn sorted(&self) -> Claim {
        let mut sorted = self.clone();
        sorted.sort_by_counter();
        sorted
    }

    /// Build the augmented tree over the shares in their current order
    pub fn build_tree(&self, registered: Option<u32>) -> Result<FinalizedAugTree> {
        let mut tree = AugTree::new();
        tree.register(registered);
        for (i, share) in self.shares.iter().enumerate() {
            let index = u32::try_from(i)
                .map_err(|_| Error::invalid_state("claim holds more shares than a u32 index"))?;
            tree.insert(share, index)?;
        }
        tree.finalize()
    }

    /// Values submitted to the contract for this claim, taken in counter order
    pub fn summary(&self) -> Result<ClaimSummary> {
        let min_difficulty = self
            .min_difficulty()
            .cloned()
            .ok_or_else(|| Error::invalid_state("cannot summarize an empty claim"))?;
        let tree = self.sorted().build_tree(None)?;
        Ok(ClaimSummary {
            num_shares: self.len() as u64,
            min_difficulty,
            min_counter: tree.root_min().clone(),
            max_counter: tree.root_max().clone(),
            root_hash: tree.root_hash(),
        })
    }
}

/// Arguments of the contract's claim submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSummary {
    pub num_shares: u64,
    pub min_difficulty: BigUint,
    pub min_counter: Counter,
    pub max_counter: Counter,
    pub root_hash: NodeHash,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mtree::{AugNode, HashNode};
    use crate::share::test_support::{share_with_counter, share_with_difficulty};
    use assert_matches::assert_matches;

    fn claim_of(nonces: &[u64]) -> Claim {
        let mut claim = Claim::new();
        for n in nonces {
            claim.push(share_with_counter(1, *n));
        }
        claim
    }

    #[test]
    fn test_min_difficulty_ignores_insertion_order() {
        let mut claim = Claim::new();
        for (nonce, diff) in [(1, 500), (2, 120), (3, 900), (4, 120), (5, 300)] {
            claim.push(share_with_difficulty(nonce, diff));
        }
        assert_eq!(claim.min_difficulty(), Some(&BigUint::from(120u32)));
        assert_eq!(Claim::new().min_difficulty(), None);
    }

    #[test]
    fn test_sorted_orders_by_counter() {
        let claim = claim_of(&[5, 1, 3]);
        let nonces: Vec<u64> = claim.sorted().shares().iter().map(|s| s.nonce().0).collect();
        assert_eq!(nonces, vec![1, 3, 5]);
        // receiver keeps insertion order
        assert_eq!(claim.shares()[0].nonce().0, 5);
    }

    #[test]
    fn test_summary_uses_sorted_tree() {
        let claim = claim_of(&[5, 1, 3]);
        let summary = claim.summary().unwrap();
        assert_eq!(summary.num_shares, 3);
        assert_eq!(summary.min_counter, share_with_counter(1, 1).counter());
        assert_eq!(summary.max_counter, share_with_counter(1, 5).counter());

        let leaves: Vec<AugNode> = [1, 3, 5]
            .iter()
            .map(|n| AugNode::leaf(&share_with_counter(1, *n)))
            .collect();
        let root = AugNode::combine(
            &AugNode::combine(&leaves[0], &leaves[1]),
            &AugNode::combine(&leaves[2], &leaves[2]),
        );
        assert_eq!(summary.root_hash, root.hash);
    }

    #[test]
    fn test_empty_claim_has_no_summary() {
        assert_matches!(Claim::new().summary(), Err(Error::InvalidState { .. }));
    }
}
