//! Hashing primitives shared by the Merkle trees and the share model

use crate::types::{NodeHash, HASH_LENGTH};
use num_bigint::BigUint;
use sha3::{Digest, Keccak256};

/// Keccak-256 over the concatenation of `parts`
pub fn keccak256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Keccak-256 truncated to its low 16 bytes (digest bytes `[16..32]`)
pub fn truncated_keccak(parts: &[&[u8]]) -> NodeHash {
    let digest = keccak256(parts);
    let mut out = [0u8; HASH_LENGTH];
    out.copy_from_slice(&digest[HASH_LENGTH..]);
    NodeHash(out)
}

/// Left-pad `bytes` with zeros to 32 bytes.
///
/// Inputs longer than 32 bytes keep their low-order 32 bytes.
pub fn pad32(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let src = if bytes.len() > 32 {
        &bytes[bytes.len() - 32..]
    } else {
        bytes
    };
    out[32 - src.len()..].copy_from_slice(src);
    out
}

/// Big-endian, left-zero-padded 32-byte form of an integer
pub fn biguint_pad32(value: &BigUint) -> [u8; 32] {
    if value.bits() == 0 {
        return [0u8; 32];
    }
    pad32(&value.to_bytes_be())
}
