//! Streaming the proof-of-work dataset file into a dataset tree
//!
//! File layout: an 8-byte magic number, then 128-byte words back to back.

use super::dag::{DagTree, FinalizedDagTree};
use crate::types::{NodeHash, Word, WORD_LENGTH};
use crate::{Error, Result};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Bytes of magic number preceding the first word
pub const DATASET_MAGIC_LENGTH: usize = 8;

/// Blocks per dataset epoch
pub const EPOCH_LENGTH: u64 = 30_000;

const PROGRESS_INTERVAL: u32 = 1 << 20;

fn read_block<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Insert every word of a dataset stream into `tree`, returning the count.
///
/// A trailing partial word is a [`Error::MalformedDataset`].
pub fn read_dataset<R: Read>(reader: R, tree: &mut DagTree) -> Result<u32> {
    let mut reader = BufReader::new(reader);
    let mut magic = [0u8; DATASET_MAGIC_LENGTH];
    let n = read_block(&mut reader, &mut magic)?;
    if n != DATASET_MAGIC_LENGTH {
        return Err(Error::malformed_dataset(format!(
            "file ends after {} bytes, inside the magic number",
            n
        )));
    }

    let mut buf = [0u8; WORD_LENGTH];
    let mut index: u32 = 0;
    loop {
        let n = read_block(&mut reader, &mut buf)?;
        if n == 0 {
            break;
        }
        if n != WORD_LENGTH {
            return Err(Error::malformed_dataset(format!(
                "trailing partial word of {} bytes after {} words",
                n, index
            )));
        }
        tree.insert(&Word::new(buf), index)?;
        index = index
            .checked_add(1)
            .ok_or_else(|| Error::malformed_dataset("more words than a u32 index can address"))?;
        if index % PROGRESS_INTERVAL == 0 {
            debug!("Streamed {} dataset words", index);
        }
    }
    Ok(index)
}

/// Build the dataset tree of the file at `path`, keeping branches for `indices`
pub fn build_dataset_tree(path: &Path, indices: &[u32]) -> Result<FinalizedDagTree> {
    let file = File::open(path)?;
    let mut tree = DagTree::new();
    tree.register(indices.iter().copied());
    let count = read_dataset(file, &mut tree)?;
    info!("Read {} dataset words from {}", count, path.display());
    tree.finalize()
}

/// Per-epoch data the pool contract needs to check dataset branches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSummary {
    pub root: NodeHash,
    /// Dataset size in 128-byte words
    pub element_count: u64,
    /// Binary digits of the largest word index
    pub branch_depth: u32,
}

impl DatasetSummary {
    pub fn from_tree(tree: &FinalizedDagTree) -> Self {
        let element_count = tree.leaf_count();
        Self {
            root: tree.root_hash(),
            element_count,
            branch_depth: binary_digits(element_count.saturating_sub(1)),
        }
    }
}

/// Epoch a block number belongs to
pub fn epoch(block_number: u64) -> u64 {
    block_number / EPOCH_LENGTH
}

fn binary_digits(n: u64) -> u32 {
    (u64::BITS - n.leading_zeros()).max(1)
}
