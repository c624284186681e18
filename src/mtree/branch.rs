//! Proof branches retained for registered leaves
//!
//! A branch starts as a single leaf and grows one level per merge: when the
//! subtree holding the leaf is combined with a sibling subtree, the sibling's
//! payload is wrapped around the existing branch on the correct side. The
//! flat sibling sequence is only produced on demand.

use super::HashNode;

/// Side on which a sibling sits relative to the path to the leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One step of an authentication path, bottom-up
#[derive(Debug, Clone, Copy)]
pub struct Sibling<'a, N> {
    pub side: Side,
    pub node: &'a N,
}

#[derive(Debug, Clone)]
enum BranchNode<N> {
    Leaf(N),
    Inner {
        left: Box<BranchNode<N>>,
        right: Box<BranchNode<N>>,
        element_on_left: bool,
    },
}

impl<N: Clone> BranchNode<N> {
    fn collect(&self, out: &mut Vec<N>) {
        match self {
            BranchNode::Leaf(node) => out.push(node.clone()),
            BranchNode::Inner {
                left,
                right,
                element_on_left,
            } => {
                if *element_on_left {
                    left.collect(out);
                    right.collect(out);
                } else {
                    right.collect(out);
                    left.collect(out);
                }
            }
        }
    }

    fn as_leaf(&self) -> Option<&N> {
        match self {
            BranchNode::Leaf(node) => Some(node),
            BranchNode::Inner { .. } => None,
        }
    }
}

/// Authentication path of one registered leaf
#[derive(Clone)]
pub struct ProofBranch<N: HashNode> {
    raw: N::Element,
    tree: BranchNode<N>,
}

impl<N: HashNode> ProofBranch<N> {
    pub(crate) fn new(raw: N::Element, leaf: N) -> Self {
        Self {
            raw,
            tree: BranchNode::Leaf(leaf),
        }
    }

    /// Wrap the branch with a sibling that precedes it
    pub(crate) fn accept_left_sibling(self, sibling: N) -> Self {
        Self {
            raw: self.raw,
            tree: BranchNode::Inner {
                left: Box::new(BranchNode::Leaf(sibling)),
                right: Box::new(self.tree),
                element_on_left: false,
            },
        }
    }

    /// Wrap the branch with a sibling that follows it
    pub(crate) fn accept_right_sibling(self, sibling: N) -> Self {
        Self {
            raw: self.raw,
            tree: BranchNode::Inner {
                left: Box::new(self.tree),
                right: Box::new(BranchNode::Leaf(sibling)),
                element_on_left: true,
            },
        }
    }

    /// The input element the leaf was built from
    pub fn raw(&self) -> &N::Element {
        &self.raw
    }

    /// Leaf payload at the bottom of the path
    pub fn leaf(&self) -> &N {
        let mut cur = &self.tree;
        loop {
            match cur {
                BranchNode::Leaf(node) => return node,
                BranchNode::Inner {
                    left,
                    right,
                    element_on_left,
                } => {
                    cur = if *element_on_left {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    }
                }
            }
        }
    }

    /// Leaf payload followed by every sibling, bottom-up
    pub fn to_node_array(&self) -> Vec<N> {
        let mut out = Vec::new();
        self.tree.collect(&mut out);
        out
    }

    /// Siblings with their sides, bottom-up
    pub fn siblings(&self) -> Vec<Sibling<'_, N>> {
        let mut path = Vec::new();
        let mut cur = &self.tree;
        while let BranchNode::Inner {
            left,
            right,
            element_on_left,
        } = cur
        {
            if *element_on_left {
                path.push((Side::Right, right.as_ref()));
                cur = left.as_ref();
            } else {
                path.push((Side::Left, left.as_ref()));
                cur = right.as_ref();
            }
        }
        path.into_iter()
            .rev()
            .filter_map(|(side, node)| node.as_leaf().map(|node| Sibling { side, node }))
            .collect()
    }

    /// Number of levels between the leaf and the root
    pub fn depth(&self) -> usize {
        self.siblings().len()
    }

    /// Recombine the leaf with its siblings
    pub fn compute_root(&self) -> N {
        self.siblings()
            .into_iter()
            .fold(self.leaf().clone(), |acc, sibling| match sibling.side {
                Side::Right => N::combine(&acc, sibling.node),
                Side::Left => N::combine(sibling.node, &acc),
            })
    }
}

impl<N: HashNode> std::fmt::Debug for ProofBranch<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofBranch")
            .field("leaf", self.leaf())
            .field("depth", &self.depth())
            .finish()
    }
}
