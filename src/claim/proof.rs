//! Verification proof for one audited share of a submitted claim

use super::Claim;
use crate::mtree::aug::to_biguints;
use crate::mtree::dataset::epoch;
use crate::mtree::{build_dataset_tree, FinalizedAugTree, FinalizedDagTree};
use crate::pow::{DatasetLocator, Ethash};
use crate::{Error, Result};
use num_bigint::BigUint;
use tracing::{debug, info};

/// Arguments of the contract's claim verification entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationProof {
    /// Header RLP without nonce and mix digest
    pub rlp_header: Vec<u8>,
    pub nonce: BigUint,
    pub share_index: BigUint,
    /// Four integers per dataset word, in verification index order
    pub dataset_elements: Vec<BigUint>,
    pub dataset_branch: Vec<BigUint>,
    pub counter_branch: Vec<BigUint>,
    pub hash_branch: Vec<BigUint>,
}

/// Build the proof for share `index` of `claim` in counter order.
///
/// Streams the share's dataset file, so this blocks. Both branches are
/// recombined against their roots before the proof is returned.
pub fn build_verification_proof(
    claim: &Claim,
    index: usize,
    pow: &dyn Ethash,
    datasets: &DatasetLocator,
) -> Result<VerificationProof> {
    let sorted = claim.sorted();
    let share = sorted.shares().get(index).ok_or_else(|| {
        Error::invalid_state(format!(
            "audit index {} outside claim of {} shares",
            index,
            sorted.len()
        ))
    })?;
    let leaf = u32::try_from(index)
        .map_err(|_| Error::invalid_state("audit index exceeds u32 range"))?;

    let claim_tree = sorted.build_tree(Some(leaf))?;
    check_claim_branch(&claim_tree, leaf)?;

    let indices = pow.verification_indices(share)?;
    let seed = pow.seed_hash(share.block_number())?;
    let path = datasets.path_for(&seed);
    debug!(
        block = share.block_number(),
        epoch = epoch(share.block_number()),
        lookups = indices.len(),
        "Building dataset branches from {}",
        path.display()
    );
    let dag_tree = build_dataset_tree(&path, &indices)?;
    check_dataset_branches(&dag_tree)?;

    let dataset_elements = dag_tree
        .dag_elements()?
        .iter()
        .flat_map(|word| word.to_uint256_array())
        .collect();
    let dataset_branch = dag_tree
        .branch_elements()?
        .iter()
        .map(|element| element.to_biguint())
        .collect();

    info!(
        share_index = index,
        dataset_words = indices.len(),
        claim_depth = claim_tree.depth(),
        "Verification proof assembled"
    );

    Ok(VerificationProof {
        rlp_header: share.rlp_header_without_nonce(),
        nonce: share.nonce_big(),
        share_index: BigUint::from(leaf),
        dataset_elements,
        dataset_branch,
        counter_branch: to_biguints(&claim_tree.counter_branch()?),
        hash_branch: to_biguints(&claim_tree.hash_branch()?),
    })
}

fn check_claim_branch(tree: &FinalizedAugTree, index: u32) -> Result<()> {
    if &tree.branch(index)?.compute_root() != tree.root() {
        return Err(Error::tree(format!(
            "claim branch of share {} does not reach the root",
            index
        )));
    }
    Ok(())
}

fn check_dataset_branches(tree: &FinalizedDagTree) -> Result<()> {
    for (&index, branch) in tree.registered().iter().zip(tree.branches()?) {
        if &branch.compute_root() != tree.root() {
            return Err(Error::tree(format!(
                "dataset branch of word {} does not reach the root",
                index
            )));
        }
    }
    Ok(())
}
