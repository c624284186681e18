//! Streaming Merkle tree engine
//!
//! Leaves are consumed one at a time and merged left-to-right like carry
//! propagation in binary addition: the working buffer holds at most one
//! pending subtree per size class, so memory stays logarithmic in the number
//! of leaves. Leaves registered before insertion keep their authentication
//! path as siblings are merged around them.
//!
//! The payload kind is fixed by the tree type:
//! - [`DagNode`]: plain 16-byte hashes over proof-of-work dataset words
//! - [`AugNode`]: hashes plus the min/max share counter of the subtree
//!
//! A [`MerkleTree`] only accepts input. [`MerkleTree::finalize`] consumes it
//! and returns a [`FinalizedTree`], the only type that exposes roots and
//! branches.

use crate::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

pub mod aug;
pub mod branch;
pub mod dag;
pub mod dataset;

#[cfg(test)]
mod tests_property;

pub use aug::{AugNode, AugTree, FinalizedAugTree};
pub use branch::{ProofBranch, Side, Sibling};
pub use dag::{DagNode, DagTree, FinalizedDagTree};
pub use dataset::{build_dataset_tree, read_dataset, DatasetSummary};

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::DagNode {}
    impl Sealed for super::AugNode {}
}

/// Node payload combinable with an order-sensitive binary operator.
///
/// Implemented by exactly [`DagNode`] and [`AugNode`].
pub trait HashNode: sealed::Sealed + Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Input a leaf is built from
    type Element: Clone + Send + Sync;

    /// Payload of a single leaf
    fn leaf(element: &Self::Element) -> Self;

    /// Payload of the parent of `left` (earlier) and `right` (later)
    fn combine(left: &Self, right: &Self) -> Self;
}

struct PendingNode<N: HashNode> {
    data: N,
    leaves: u64,
    branches: BTreeMap<u32, ProofBranch<N>>,
}

impl<N: HashNode> PendingNode<N> {
    fn merge(left: PendingNode<N>, right: PendingNode<N>) -> PendingNode<N> {
        let data = N::combine(&left.data, &right.data);
        let mut branches = BTreeMap::new();
        for (index, branch) in left.branches {
            branches.insert(index, branch.accept_right_sibling(right.data.clone()));
        }
        for (index, branch) in right.branches {
            branches.insert(index, branch.accept_left_sibling(left.data.clone()));
        }
        PendingNode {
            data,
            leaves: left.leaves + right.leaves,
            branches,
        }
    }

    fn duplicate(&self) -> PendingNode<N> {
        PendingNode {
            data: self.data.clone(),
            leaves: self.leaves,
            branches: BTreeMap::new(),
        }
    }
}

/// Merkle tree under construction
pub struct MerkleTree<N: HashNode> {
    buffer: Vec<PendingNode<N>>,
    registered: HashSet<u32>,
    ordered: Vec<u32>,
    inserted: u64,
}

impl<N: HashNode> MerkleTree<N> {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            registered: HashSet::new(),
            ordered: Vec::new(),
            inserted: 0,
        }
    }

    /// Mark leaf positions whose branch must be retained.
    ///
    /// A repeated index tracks a single branch but keeps its place in the
    /// lookup order, so the array methods emit it once per registration.
    /// Registration only applies to leaves inserted afterwards.
    pub fn register(&mut self, indices: impl IntoIterator<Item = u32>) {
        for index in indices {
            self.registered.insert(index);
            self.ordered.push(index);
        }
    }

    /// Hash `element` into a leaf at position `index` and merge it in.
    ///
    /// Positions must be consecutive starting at zero.
    pub fn insert(&mut self, element: &N::Element, index: u32) -> Result<()> {
        if u64::from(index) != self.inserted {
            return Err(Error::tree(format!(
                "leaf {} inserted out of order, expected position {}",
                index, self.inserted
            )));
        }
        let data = N::leaf(element);
        let mut branches = BTreeMap::new();
        if self.registered.contains(&index) {
            branches.insert(index, ProofBranch::new(element.clone(), data.clone()));
        }
        self.push_node(PendingNode {
            data,
            leaves: 1,
            branches,
        });
        self.inserted += 1;
        Ok(())
    }

    /// Number of leaves inserted so far
    pub fn len(&self) -> u64 {
        self.inserted
    }

    pub fn is_empty(&self) -> bool {
        self.inserted == 0
    }

    fn push_node(&mut self, mut node: PendingNode<N>) {
        while self
            .buffer
            .last()
            .is_some_and(|prev| prev.leaves == node.leaves)
        {
            let Some(prev) = self.buffer.pop() else { break };
            node = PendingNode::merge(prev, node);
        }
        self.buffer.push(node);
    }

    /// Close the tree, duplicating unmatched subtrees until one root remains
    pub fn finalize(mut self) -> Result<FinalizedTree<N>> {
        loop {
            match self.buffer.len() {
                0 => return Err(Error::tree("cannot finalize a tree without leaves")),
                1 => break,
                _ => {
                    let dup = self
                        .buffer
                        .last()
                        .map(PendingNode::duplicate)
                        .ok_or_else(|| Error::tree("working buffer emptied during finalize"))?;
                    self.push_node(dup);
                }
            }
        }
        let root = self
            .buffer
            .pop()
            .ok_or_else(|| Error::tree("working buffer emptied during finalize"))?;

        Ok(FinalizedTree {
            root: root.data,
            leaf_count: self.inserted,
            padded_leaves: root.leaves,
            branches: root.branches,
            ordered: self.ordered,
        })
    }
}

impl<N: HashNode> Default for MerkleTree<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A closed tree with its root and the branches of registered leaves
pub struct FinalizedTree<N: HashNode> {
    root: N,
    leaf_count: u64,
    padded_leaves: u64,
    branches: BTreeMap<u32, ProofBranch<N>>,
    ordered: Vec<u32>,
}

impl<N: HashNode> FinalizedTree<N> {
    /// Root payload
    pub fn root(&self) -> &N {
        &self.root
    }

    /// Number of leaves actually inserted
    pub fn leaf_count(&self) -> u64 {
        self.leaf_count
    }

    /// Levels between a leaf and the root
    pub fn depth(&self) -> u32 {
        self.padded_leaves.trailing_zeros()
    }

    /// Registered indices in registration order, repeats included
    pub fn registered(&self) -> &[u32] {
        &self.ordered
    }

    /// Branch of a registered leaf
    pub fn branch(&self, index: u32) -> Result<&ProofBranch<N>> {
        if !self.ordered.contains(&index) {
            return Err(Error::tree(format!("leaf {} was not registered", index)));
        }
        self.branches.get(&index).ok_or_else(|| {
            Error::tree(format!(
                "leaf {} was registered but the tree only has {} leaves",
                index, self.leaf_count
            ))
        })
    }

    /// Branches of all registered leaves, one per registration
    pub fn branches(&self) -> Result<Vec<&ProofBranch<N>>> {
        self.ordered.iter().map(|&index| self.branch(index)).collect()
    }
}

impl<N: HashNode> fmt::Debug for FinalizedTree<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalizedTree")
            .field("root", &self.root)
            .field("leaf_count", &self.leaf_count)
            .field("depth", &self.depth())
            .field("registered", &self.ordered)
            .finish()
    }
}
