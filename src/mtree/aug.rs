//! Augmented payload: subtree hash plus the counter range it covers
//!
//! Parent hashes mix the left child's minimum with the right child's
//! maximum. The pool contract re-derives exactly this layout, so the
//! asymmetry is part of the commitment.

use super::{FinalizedTree, HashNode, MerkleTree};
use crate::crypto::{biguint_pad32, pad32, truncated_keccak};
use crate::share::Share;
use crate::types::{Counter, NodeHash};
use crate::Result;
use num_bigint::BigUint;

/// Payload of a claim tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugNode {
    pub min: Counter,
    pub max: Counter,
    pub hash: NodeHash,
}

impl HashNode for AugNode {
    type Element = Share;

    fn leaf(share: &Share) -> Self {
        let counter = share.counter();
        AugNode {
            min: counter.clone(),
            max: counter,
            hash: share.hash(),
        }
    }

    fn combine(left: &Self, right: &Self) -> Self {
        let hash = truncated_keccak(&[
            &biguint_pad32(&left.min),
            &pad32(&left.hash.0),
            &biguint_pad32(&right.max),
            &pad32(&right.hash.0),
        ]);
        AugNode {
            min: (&left.min).min(&right.min).clone(),
            max: (&left.max).max(&right.max).clone(),
            hash,
        }
    }
}

pub type AugTree = MerkleTree<AugNode>;
pub type FinalizedAugTree = FinalizedTree<AugNode>;

impl FinalizedTree<AugNode> {
    pub fn root_min(&self) -> &Counter {
        &self.root().min
    }

    pub fn root_max(&self) -> &Counter {
        &self.root().max
    }

    pub fn root_hash(&self) -> NodeHash {
        self.root().hash
    }

    /// Per level, the sibling's max counter when the leaf is a left child,
    /// otherwise its min counter. One array for all registered leaves.
    pub fn counter_branch(&self) -> Result<Vec<[u8; 32]>> {
        let mut out = Vec::new();
        for (&index, branch) in self.registered().iter().zip(self.branches()?) {
            let mut position = index;
            for sibling in branch.siblings() {
                let counter = if position % 2 == 0 {
                    &sibling.node.max
                } else {
                    &sibling.node.min
                };
                out.push(biguint_pad32(counter));
                position >>= 1;
            }
        }
        Ok(out)
    }

    /// Sibling hashes of every registered leaf, zero-padded to 32 bytes
    pub fn hash_branch(&self) -> Result<Vec<[u8; 32]>> {
        let mut out = Vec::new();
        for branch in self.branches()? {
            out.extend(branch.siblings().iter().map(|s| pad32(&s.node.hash.0)));
        }
        Ok(out)
    }
}

/// Integer view of 32-byte branch entries, as the contract ABI takes them
pub fn to_biguints(entries: &[[u8; 32]]) -> Vec<BigUint> {
    entries.iter().map(|e| BigUint::from_bytes_be(e)).collect()
}
