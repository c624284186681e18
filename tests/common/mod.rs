//! In-memory collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use num_bigint::BigUint;
use smartpool_client::claim::RepositoryConfig;
use smartpool_client::config::AuditPolicy;
use smartpool_client::contract::PoolContract;
use smartpool_client::node::{EthereumNode, PendingWork};
use smartpool_client::pow::{DatasetLocator, Ethash};
use smartpool_client::retry::RetryPolicy;
use smartpool_client::{
    BlockHeader, BlockNonce, ClaimSummary, Error, Result, Share, SolutionState,
    VerificationProof, H256,
};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SEED: H256 = H256([0x42; 32]);

#[derive(Default)]
pub struct FakeContract {
    pub fail_submissions: AtomicBool,
    tx_counter: AtomicU8,
    pub claims: Mutex<Vec<ClaimSummary>>,
    pub proofs: Mutex<Vec<VerificationProof>>,
}

impl FakeContract {
    fn next_tx(&self) -> H256 {
        H256([self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1; 32])
    }
}

#[async_trait]
impl PoolContract for FakeContract {
    async fn submit_claim(&self, claim: &ClaimSummary) -> Result<H256> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(Error::contract("execution reverted"));
        }
        self.claims.lock().unwrap().push(claim.clone());
        Ok(self.next_tx())
    }

    async fn verify_claim(&self, proof: &VerificationProof) -> Result<H256> {
        self.proofs.lock().unwrap().push(proof.clone());
        Ok(self.next_tx())
    }

    async fn claim_seed(&self) -> Result<BigUint> {
        Ok(BigUint::from(1u8))
    }
}

pub struct FakeNode {
    pub work: PendingWork,
    pub accept_blocks: AtomicBool,
    pub submitted_blocks: Mutex<Vec<(BlockNonce, H256)>>,
    pub hashrates: Mutex<Vec<(u64, H256)>>,
}

impl FakeNode {
    pub fn new(work: PendingWork) -> Self {
        Self {
            work,
            accept_blocks: AtomicBool::new(true),
            submitted_blocks: Mutex::new(Vec::new()),
            hashrates: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EthereumNode for FakeNode {
    async fn get_work(&self) -> Result<PendingWork> {
        Ok(self.work.clone())
    }

    async fn submit_work(&self, nonce: BlockNonce, pow_hash: H256, _mix: H256) -> Result<bool> {
        self.submitted_blocks.lock().unwrap().push((nonce, pow_hash));
        Ok(self.accept_blocks.load(Ordering::SeqCst))
    }

    async fn submit_hashrate(&self, rate: u64, id: H256) -> Result<bool> {
        self.hashrates.lock().unwrap().push((rate, id));
        Ok(true)
    }

    async fn is_confirmed(&self, _tx: H256) -> Result<bool> {
        Ok(true)
    }
}

/// Classifies by nonce and reads fixed dataset indices
#[derive(Default)]
pub struct FakePow {
    pub full_blocks: HashSet<u64>,
    pub invalid: HashSet<u64>,
    pub indices: Vec<u32>,
}

impl Ethash for FakePow {
    fn solution_state(&self, share: &Share) -> Result<SolutionState> {
        let nonce = share.nonce().0;
        Ok(if self.full_blocks.contains(&nonce) {
            SolutionState::FullBlock
        } else if self.invalid.contains(&nonce) {
            SolutionState::Invalid
        } else {
            SolutionState::ValidShare
        })
    }

    fn verification_indices(&self, _share: &Share) -> Result<Vec<u32>> {
        Ok(self.indices.clone())
    }

    fn seed_hash(&self, _block_number: u64) -> Result<H256> {
        Ok(SEED)
    }
}

pub fn header(timestamp: u64) -> BlockHeader {
    BlockHeader {
        parent_hash: H256([0x11; 32]),
        difficulty: BigUint::from(131_072u32),
        number: 42,
        gas_limit: 3_141_592,
        timestamp,
        extra_data: b"SmartPool".to_vec(),
        ..BlockHeader::default()
    }
}

pub fn share(timestamp: u64, nonce: u64) -> Share {
    Share::new(
        Arc::new(header(timestamp)),
        BigUint::from(100_000u32),
        BlockNonce(nonce),
        H256::default(),
    )
    .classified(SolutionState::ValidShare)
}

pub fn repository_config(threshold: usize, dir: &Path) -> RepositoryConfig {
    RepositoryConfig {
        share_threshold: threshold,
        audit_policy: AuditPolicy::Previous,
        audit_index: Some(0),
        datasets: DatasetLocator::new(dir, 23),
        submit_interval: Duration::from_millis(20),
        confirmation_poll: Duration::from_millis(1),
        confirmation_timeout: Some(Duration::from_secs(5)),
        retry: RetryPolicy::no_retry(),
    }
}

/// Dataset file for [`SEED`] whose word `i` is filled with byte `i`
pub fn write_dataset(dir: &Path, words: u8) -> std::path::PathBuf {
    let path = DatasetLocator::new(dir, 23).path_for(&SEED);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(&[0xfe; 8]).unwrap();
    for i in 0..words {
        file.write_all(&[i; 128]).unwrap();
    }
    path
}
