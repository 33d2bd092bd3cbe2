//! # SHA-2 Hashing
//!
//! One-shot digests used across the subsystem:
//!
//! - SHA-256: the message digest secp256k1 ECDSA signs
//! - SHA-224: the principal identifier hash

use sha2::{Digest, Sha224, Sha256};

/// SHA-256 digest (256-bit).
pub type Sha256Hash = [u8; 32];

/// SHA-224 digest (224-bit).
pub type Sha224Hash = [u8; 28];

/// Hash data with SHA-256 (one-shot).
pub fn sha256(data: &[u8]) -> Sha256Hash {
    Sha256::digest(data).into()
}

/// Hash data with SHA-224 (one-shot).
pub fn sha224(data: &[u8]) -> Sha224Hash {
    Sha224::digest(data).into()
}
