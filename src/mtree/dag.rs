//! Plain hash payload over proof-of-work dataset words

use super::{FinalizedTree, HashNode, MerkleTree};
use crate::crypto::{pad32, truncated_keccak};
use crate::types::{BranchElement, NodeHash, Word};
use crate::Result;

/// Payload of a dataset tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DagNode(pub NodeHash);

impl HashNode for DagNode {
    type Element = Word;

    fn leaf(element: &Word) -> Self {
        DagNode(truncated_keccak(&[&element.conventional()]))
    }

    fn combine(left: &Self, right: &Self) -> Self {
        DagNode(truncated_keccak(&[&pad32(&left.0 .0), &pad32(&right.0 .0)]))
    }
}

pub type DagTree = MerkleTree<DagNode>;
pub type FinalizedDagTree = FinalizedTree<DagNode>;

impl FinalizedTree<DagNode> {
    pub fn root_hash(&self) -> NodeHash {
        self.root().0
    }

    /// Packed sibling hashes of every registration, in registration order.
    ///
    /// Siblings are taken two levels at a time and packed as
    /// `(upper ∥ lower)`; an unpaired top sibling is packed behind an
    /// all-zero hash.
    pub fn branch_elements(&self) -> Result<Vec<BranchElement>> {
        let mut out = Vec::new();
        for branch in self.branches()? {
            let hashes: Vec<NodeHash> = branch.siblings().iter().map(|s| s.node.0).collect();
            for pair in hashes.chunks(2) {
                match pair {
                    [lower, upper] => out.push(BranchElement::from_hashes(upper, lower)),
                    [lower] => out.push(BranchElement::from_hashes(&NodeHash::ZERO, lower)),
                    _ => {}
                }
            }
        }
        Ok(out)
    }

    /// Raw dataset words of every registration, in registration order
    pub fn dag_elements(&self) -> Result<Vec<Word>> {
        Ok(self.branches()?.into_iter().map(|b| *b.raw()).collect())
    }
}
