//! Proof-of-work collaborator and dataset file naming

use crate::share::{Share, SolutionState};
use crate::types::H256;
use crate::Result;
use std::path::{Path, PathBuf};

/// Revision embedded in dataset file names
pub const DEFAULT_DATASET_REVISION: u32 = 23;

/// Ethash verification used by the pool.
///
/// Implementations are synchronous and may be CPU heavy; async callers run
/// them on a blocking thread when they touch the dataset.
pub trait Ethash: Send + Sync {
    /// Classify a share against its block target and share target
    fn solution_state(&self, share: &Share) -> Result<SolutionState>;

    /// Dataset word indices touched while hashing this share
    fn verification_indices(&self, share: &Share) -> Result<Vec<u32>>;

    /// Seed hash of the epoch containing `block_number`
    fn seed_hash(&self, block_number: u64) -> Result<H256>;
}

/// Finds full dataset files on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLocator {
    dir: PathBuf,
    revision: u32,
}

impl DatasetLocator {
    pub fn new(dir: impl Into<PathBuf>, revision: u32) -> Self {
        Self {
            dir: dir.into(),
            revision,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// `<dir>/full-R<revision>-<first 8 seed bytes as hex>`
    pub fn path_for(&self, seed: &H256) -> PathBuf {
        self.dir.join(format!(
            "full-R{}-{}",
            self.revision,
            hex::encode(&seed.0[..8])
        ))
    }
}
