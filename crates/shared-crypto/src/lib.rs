//! # Shared Crypto - Signature Primitives
//!
//! Key material and raw signature checks used by the marketplace
//! authentication subsystem and its client-side signer.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signatures` | Ed25519 | Author signatures over the raw canonical payload |
//! | `ecdsa` | secp256k1 | Author signatures over SHA-256(canonical payload) |
//! | `hashing` | SHA-256, SHA-224 | ECDSA prehash, principal derivation |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency
//! - **secp256k1**: RFC 6979 deterministic, low-S only on both sign and verify
//! - Secret key exports are wrapped in `Zeroizing`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod signatures;

// Re-exports
pub use ecdsa::{Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature};
pub use errors::CryptoError;
pub use hashing::{sha224, sha256};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
