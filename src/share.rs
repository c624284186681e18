//! Shares: accepted proof-of-work solutions and their ordering key

use crate::crypto::{keccak256, truncated_keccak};
use crate::types::{Address, BlockNonce, Bloom, Counter, NodeHash, H256};
use num_bigint::BigUint;
use rlp::RlpStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Number of header fields committed to by the proof-of-work hash
const HEADER_FIELDS_WITHOUT_NONCE: usize = 13;

/// Block header fields a share commits to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockHeader {
    pub parent_hash: H256,
    pub uncle_hash: H256,
    pub coinbase: Address,
    pub state_root: H256,
    pub tx_root: H256,
    pub receipt_root: H256,
    pub bloom: Bloom,
    pub difficulty: BigUint,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Vec<u8>,
}

impl BlockHeader {
    /// RLP list of every header field except nonce and mix digest
    pub fn rlp_without_nonce(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(HEADER_FIELDS_WITHOUT_NONCE);
        stream
            .append(&self.parent_hash.0.to_vec())
            .append(&self.uncle_hash.0.to_vec())
            .append(&self.coinbase.0.to_vec())
            .append(&self.state_root.0.to_vec())
            .append(&self.tx_root.0.to_vec())
            .append(&self.receipt_root.0.to_vec())
            .append(&self.bloom.0.to_vec())
            .append(&integer_bytes(&self.difficulty))
            .append(&self.number)
            .append(&self.gas_limit)
            .append(&self.gas_used)
            .append(&self.timestamp)
            .append(&self.extra_data);
        stream.out().to_vec()
    }

    /// Proof-of-work seal hash
    pub fn hash_no_nonce(&self) -> H256 {
        H256(keccak256(&[&self.rlp_without_nonce()]))
    }
}

/// Minimal big-endian bytes; zero encodes as the empty string
fn integer_bytes(value: &BigUint) -> Vec<u8> {
    if value.bits() == 0 {
        Vec::new()
    } else {
        value.to_bytes_be()
    }
}

/// Outcome of checking a solution against the block and share targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolutionState {
    Invalid = 0,
    ValidShare = 1,
    FullBlock = 2,
}

impl fmt::Display for SolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionState::Invalid => write!(f, "invalid"),
            SolutionState::ValidShare => write!(f, "valid-share"),
            SolutionState::FullBlock => write!(f, "full-block"),
        }
    }
}

/// One proof-of-work solution submitted by a miner
#[derive(Debug, Clone)]
pub struct Share {
    header: Arc<BlockHeader>,
    nonce: BlockNonce,
    mix_digest: H256,
    share_difficulty: BigUint,
    state: SolutionState,
}

impl Share {
    /// Create an unclassified share
    pub fn new(
        header: Arc<BlockHeader>,
        share_difficulty: BigUint,
        nonce: BlockNonce,
        mix_digest: H256,
    ) -> Self {
        Self {
            header,
            nonce,
            mix_digest,
            share_difficulty,
            state: SolutionState::Invalid,
        }
    }

    /// Record the classification; the share is not changed afterwards
    pub fn classified(self, state: SolutionState) -> Self {
        Self { state, ..self }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn nonce(&self) -> BlockNonce {
        self.nonce
    }

    pub fn nonce_big(&self) -> BigUint {
        BigUint::from(self.nonce.0)
    }

    pub fn mix_digest(&self) -> H256 {
        self.mix_digest
    }

    pub fn share_difficulty(&self) -> &BigUint {
        &self.share_difficulty
    }

    pub fn solution_state(&self) -> SolutionState {
        self.state
    }

    pub fn block_number(&self) -> u64 {
        self.header.number
    }

    /// `(timestamp << 64) + nonce`
    pub fn counter(&self) -> Counter {
        (BigUint::from(self.header.timestamp) << 64u32) + BigUint::from(self.nonce.0)
    }

    /// Low 16 bytes of the header's seal hash
    pub fn hash(&self) -> NodeHash {
        truncated_keccak(&[&self.header.rlp_without_nonce()])
    }

    pub fn rlp_header_without_nonce(&self) -> Vec<u8> {
        self.header.rlp_without_nonce()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_header() -> BlockHeader {
        BlockHeader {
            parent_hash: H256([0x11; 32]),
            uncle_hash: H256([0x22; 32]),
            coinbase: Address([0x33; 20]),
            state_root: H256([0x44; 32]),
            tx_root: H256([0x55; 32]),
            receipt_root: H256([0x66; 32]),
            bloom: Bloom::default(),
            difficulty: BigUint::from(131_072u32),
            number: 1,
            gas_limit: 3_141_592,
            gas_used: 0,
            timestamp: 1_438_269_988,
            extra_data: b"SmartPool".to_vec(),
        }
    }

    #[test]
    fn test_rlp_header_layout() {
        let rlp = fixture_header().rlp_without_nonce();
        assert_eq!(rlp.len(), 473);
        assert_eq!(&rlp[..3], &[0xf9, 0x01, 0xd6]);
        assert_eq!(
            hex::encode(&rlp[rlp.len() - 30..]),
            "00000000008302000001832fefd8808455ba422489536d617274506f6f6c"
        );
    }

    #[test]
    fn test_seal_hash_and_share_hash() {
        let header = fixture_header();
        assert_eq!(
            hex::encode(header.hash_no_nonce().0),
            "87d75172d183b80eb864fccb0a59119b9d002d5f3b7c7879f22fc3aabb807d4d"
        );
        let share = Share::new(
            Arc::new(header),
            BigUint::from(1u8),
            BlockNonce(7),
            H256::default(),
        );
        assert_eq!(hex::encode(share.hash().0), "9d002d5f3b7c7879f22fc3aabb807d4d");
    }

    #[test]
    fn test_counter_concatenates_timestamp_and_nonce() {
        let share = test_support::share_with_counter(2, 5);
        let expected = (BigUint::from(2u8) << 64u32) + BigUint::from(5u8);
        assert_eq!(share.counter(), expected);
        assert_eq!(share.nonce_big(), BigUint::from(5u8));

        let later = test_support::share_with_counter(3, 0);
        assert!(later.counter() > test_support::share_with_counter(2, u64::MAX).counter());
    }

    #[test]
    fn test_classification_is_recorded() {
        let share = Share::new(
            Arc::new(test_support::header(1)),
            BigUint::from(10u8),
            BlockNonce(1),
            H256::default(),
        );
        assert_eq!(share.solution_state(), SolutionState::Invalid);
        let share = share.classified(SolutionState::FullBlock);
        assert_eq!(share.solution_state(), SolutionState::FullBlock);
        assert_eq!(share.solution_state().to_string(), "full-block");
    }
}
