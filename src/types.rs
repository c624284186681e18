//! Core types for the smartpool client
//!
//! Fixed-size byte values used by the proof machinery and the chain
//! interfaces, with hex display and `0x`-prefixed JSON serialization.

use crate::{Error, Result};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of a tree node hash
pub const HASH_LENGTH: usize = 16;
/// Length of a dataset word
pub const WORD_LENGTH: usize = 128;
/// Length of a packed branch element
pub const BRANCH_ELEMENT_LENGTH: usize = 32;

/// Total-ordering key of a share: `(timestamp << 64) + nonce`
pub type Counter = BigUint;

/// One 128-byte block of the proof-of-work dataset
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Word(pub [u8; WORD_LENGTH]);

impl Word {
    /// Create a word from raw dataset bytes
    pub fn new(bytes: [u8; WORD_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw bytes as stored in the dataset file
    pub fn as_bytes(&self) -> &[u8; WORD_LENGTH] {
        &self.0
    }

    /// The word with every 32-byte quarter byte-reversed.
    ///
    /// The dataset stores quarters little-endian; the verifier hashes them as
    /// big-endian 256-bit words.
    pub fn conventional(&self) -> [u8; WORD_LENGTH] {
        let mut out = self.0;
        for quarter in out.chunks_exact_mut(32) {
            quarter.reverse();
        }
        out
    }

    /// The four 256-bit integers the verifier reads out of this word
    pub fn to_uint256_array(&self) -> [BigUint; 4] {
        let q = |i: usize| BigUint::from_bytes_le(&self.0[i * 32..(i + 1) * 32]);
        [q(0), q(1), q(2), q(3)]
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word(0x{})", hex::encode(self.0))
    }
}

/// 16-byte truncated Keccak-256 value stored in tree nodes
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeHash(pub [u8; HASH_LENGTH]);

impl NodeHash {
    /// All-zero hash, used for missing siblings
    pub const ZERO: NodeHash = NodeHash([0u8; HASH_LENGTH]);

    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }
}

impl fmt::Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeHash({})", self)
    }
}

/// Two 16-byte values packed into the 32-byte unit the verifier consumes
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BranchElement(pub [u8; BRANCH_ELEMENT_LENGTH]);

impl BranchElement {
    /// Pack `first ∥ second`
    pub fn from_hashes(first: &NodeHash, second: &NodeHash) -> Self {
        let mut out = [0u8; BRANCH_ELEMENT_LENGTH];
        out[..HASH_LENGTH].copy_from_slice(&first.0);
        out[HASH_LENGTH..].copy_from_slice(&second.0);
        Self(out)
    }

    pub fn first_half(&self) -> NodeHash {
        let mut h = [0u8; HASH_LENGTH];
        h.copy_from_slice(&self.0[..HASH_LENGTH]);
        NodeHash(h)
    }

    pub fn second_half(&self) -> NodeHash {
        let mut h = [0u8; HASH_LENGTH];
        h.copy_from_slice(&self.0[HASH_LENGTH..]);
        NodeHash(h)
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }
}

impl fmt::Display for BranchElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for BranchElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BranchElement({})", self)
    }
}

/// Decode a hex string with an optional `0x` prefix into exactly `N` bytes
pub fn decode_hex_fixed<const N: usize>(s: &str) -> Result<[u8; N]> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    if stripped.len() != N * 2 {
        return Err(Error::invalid_params(format!(
            "expected {} hex characters, got {}",
            N * 2,
            stripped.len()
        )));
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(stripped, &mut out)
        .map_err(|e| Error::invalid_params(format!("invalid hex: {}", e)))?;
    Ok(out)
}

macro_rules! hex_bytes_type {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_biguint(&self) -> BigUint {
                BigUint::from_bytes_be(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                decode_hex_fixed::<$len>(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $name::from_str(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_bytes_type!(
    /// 32-byte hash (block hashes, transaction hashes, seed hashes)
    H256,
    32
);

hex_bytes_type!(
    /// 20-byte account address
    Address,
    20
);

/// 8-byte block nonce, big-endian on the wire
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct BlockNonce(pub u64);

impl BlockNonce {
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl FromStr for BlockNonce {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        decode_hex_fixed::<8>(s).map(|b| Self(u64::from_be_bytes(b)))
    }
}

impl fmt::Display for BlockNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// 2048-bit log bloom of a block header
#[derive(Clone, PartialEq, Eq)]
pub struct Bloom(pub [u8; 256]);

impl Default for Bloom {
    fn default() -> Self {
        Self([0u8; 256])
    }
}

impl fmt::Debug for Bloom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bloom(0x{}..)", hex::encode(&self.0[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventional_reverses_each_quarter() {
        let mut raw = [0u8; WORD_LENGTH];
        for (i, b) in raw.iter_mut().enumerate() {
            *b = i as u8;
        }
        let conv = Word::new(raw).conventional();
        assert_eq!(conv[0], 31);
        assert_eq!(conv[31], 0);
        assert_eq!(conv[32], 63);
        assert_eq!(conv[127], 96);
    }

    #[test]
    fn test_uint256_array_reads_reversed_quarters() {
        let mut raw = [0u8; WORD_LENGTH];
        raw[0] = 1;
        raw[32 + 31] = 1;
        let arr = Word::new(raw).to_uint256_array();
        assert_eq!(arr[0], BigUint::from(1u8));
        assert_eq!(arr[1], BigUint::from(1u8) << 248);
        assert_eq!(arr[2], BigUint::from(0u8));
    }

    #[test]
    fn test_branch_element_halves() {
        let a = NodeHash([0xaa; HASH_LENGTH]);
        let b = NodeHash([0xbb; HASH_LENGTH]);
        let e = BranchElement::from_hashes(&a, &b);
        assert_eq!(e.first_half(), a);
        assert_eq!(e.second_half(), b);
        assert_eq!(e.0[0], 0xaa);
        assert_eq!(e.0[31], 0xbb);
    }

    #[test]
    fn test_h256_hex_serde() {
        let h: H256 = "0x00000000000000000000000000000000000000000000000000000000000000ff"
            .parse()
            .unwrap();
        assert_eq!(h.0[31], 0xff);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(
            json,
            "\"0x00000000000000000000000000000000000000000000000000000000000000ff\""
        );
        let back: H256 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn test_hex_length_is_checked() {
        assert!("0x1234".parse::<H256>().is_err());
        assert!("0xzz".parse::<BlockNonce>().is_err());
        let nonce: BlockNonce = "0x0000000000000105".parse().unwrap();
        assert_eq!(nonce.0, 0x105);
        assert_eq!(nonce.to_string(), "0x0000000000000105");
    }
}
