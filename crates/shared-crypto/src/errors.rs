//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Public key has a length no supported encoding uses
    #[error("Invalid public key length: {actual} bytes")]
    InvalidPublicKeyLength {
        /// Actual key length in bytes
        actual: usize,
    },

    /// Signature has the wrong length
    #[error("Invalid signature length: expected {expected}, got {actual}")]
    InvalidSignatureLength {
        /// Expected signature length in bytes
        expected: usize,
        /// Actual signature length in bytes
        actual: usize,
    },

    /// Public key bytes do not decode to a curve point
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Public key is a small-order point
    #[error("Weak public key")]
    WeakPublicKey,

    /// Secret key bytes are not a valid scalar
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Signature bytes are not a valid encoding
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Signing failed
    #[error("Signing failed")]
    SigningFailed,
}
