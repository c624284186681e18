//! Property-based tests for the streaming tree engine

use super::*;
use crate::share::test_support::share_with_counter;
use crate::types::{BranchElement, NodeHash, Word};
use num_bigint::BigUint;
use proptest::prelude::*;

fn words(seeds: &[u8]) -> Vec<Word> {
    seeds
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut raw = [*s; 128];
            raw[0] = i as u8;
            Word::new(raw)
        })
        .collect()
}

fn dag_tree(words: &[Word], registered: &[u32]) -> FinalizedDagTree {
    let mut tree = DagTree::new();
    tree.register(registered.iter().copied());
    for (i, w) in words.iter().enumerate() {
        tree.insert(w, i as u32).unwrap();
    }
    tree.finalize().unwrap()
}

/// Level-by-level reference: an odd level repeats its last node
fn reference_root(words: &[Word]) -> DagNode {
    let mut level: Vec<DagNode> = words.iter().map(DagNode::leaf).collect();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1];
            level.push(last);
        }
        level = level
            .chunks(2)
            .map(|pair| DagNode::combine(&pair[0], &pair[1]))
            .collect();
    }
    level[0]
}

/// Rebuild the root from packed branch elements the way the verifier does
fn root_from_elements(leaf: DagNode, index: u32, depth: u32, elements: &[BranchElement]) -> DagNode {
    let mut hashes: Vec<NodeHash> = Vec::new();
    for e in elements {
        hashes.push(e.second_half());
        hashes.push(e.first_half());
    }
    hashes.truncate(depth as usize);

    let mut position = index;
    let mut acc = leaf;
    for h in hashes {
        acc = if position % 2 == 0 {
            DagNode::combine(&acc, &DagNode(h))
        } else {
            DagNode::combine(&DagNode(h), &acc)
        };
        position >>= 1;
    }
    acc
}

proptest! {
    #[test]
    fn root_matches_level_by_level_reference(seeds in prop::collection::vec(any::<u8>(), 1..70)) {
        let words = words(&seeds);
        let tree = dag_tree(&words, &[]);
        prop_assert_eq!(tree.root(), &reference_root(&words));
    }

    #[test]
    fn root_does_not_depend_on_registration(
        seeds in prop::collection::vec(any::<u8>(), 1..70),
        picks in prop::collection::vec(any::<u32>(), 0..8),
    ) {
        let words = words(&seeds);
        let registered: Vec<u32> = picks.iter().map(|p| p % seeds.len() as u32).collect();
        let plain = dag_tree(&words, &[]);
        let tracked = dag_tree(&words, &registered);
        prop_assert_eq!(plain.root(), tracked.root());
    }

    #[test]
    fn every_branch_recombines_to_root(
        seeds in prop::collection::vec(any::<u8>(), 1..70),
        pick in any::<u32>(),
    ) {
        let words = words(&seeds);
        let index = pick % seeds.len() as u32;
        let tree = dag_tree(&words, &[index]);
        let branch = tree.branch(index).unwrap();
        prop_assert_eq!(&branch.compute_root(), tree.root());
        prop_assert_eq!(branch.depth() as u32, tree.depth());

        let elements = tree.branch_elements().unwrap();
        prop_assert_eq!(elements.len() as u32, tree.depth().div_ceil(2));
        let rebuilt = root_from_elements(DagNode::leaf(&words[index as usize]), index, tree.depth(), &elements);
        prop_assert_eq!(&rebuilt, tree.root());
    }

    #[test]
    fn odd_count_equals_duplicated_last_leaf(seeds in prop::collection::vec(any::<u8>(), 3..35)) {
        // a single leaf is its own root, so closure only applies from three leaves up
        let mut words = words(&seeds);
        if words.len() % 2 == 0 {
            words.pop();
        }
        let odd = dag_tree(&words, &[]);
        let mut even = words.clone();
        even.push(words[words.len() - 1]);
        let even_tree = dag_tree(&even, &[]);
        prop_assert_eq!(odd.root(), even_tree.root());
    }

    #[test]
    fn augmented_range_covers_every_leaf(
        nonces in prop::collection::vec(any::<u64>(), 1..40),
        pick in any::<u32>(),
    ) {
        let index = pick % nonces.len() as u32;
        let shares: Vec<_> = nonces.iter().map(|n| share_with_counter(7, *n)).collect();

        let mut tree = AugTree::new();
        tree.register([index]);
        for (i, s) in shares.iter().enumerate() {
            tree.insert(s, i as u32).unwrap();
        }
        let tree = tree.finalize().unwrap();

        let counters: Vec<BigUint> = shares.iter().map(|s| s.counter()).collect();
        prop_assert_eq!(tree.root_min(), counters.iter().min().unwrap());
        prop_assert_eq!(tree.root_max(), counters.iter().max().unwrap());

        let branch = tree.branch(index).unwrap();
        let leaf_counter = &counters[index as usize];
        let mut acc = branch.leaf().clone();
        for sibling in branch.siblings() {
            prop_assert!(sibling.node.min <= sibling.node.max);
            acc = match sibling.side {
                Side::Right => AugNode::combine(&acc, sibling.node),
                Side::Left => AugNode::combine(sibling.node, &acc),
            };
            prop_assert!(&acc.min <= leaf_counter && leaf_counter <= &acc.max);
        }
        prop_assert_eq!(&acc, tree.root());
    }
}
