//! # ECDSA Signatures (secp256k1)
//!
//! ECDSA over the secp256k1 curve, always applied to the SHA-256 digest of
//! the message.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S signatures only: `k256` emits normalized signatures and its
//!   verifier rejects high-S values, which closes the `s -> n - s`
//!   malleability
//! - Public keys accepted in compressed (33 bytes) or uncompressed
//!   (65 bytes) SEC1 form

use crate::hashing::sha256;
use crate::CryptoError;
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use zeroize::Zeroizing;

/// Compressed SEC1 public key length (0x02/0x03 || x).
pub const SECP256K1_COMPRESSED_KEY_LEN: usize = 33;

/// Uncompressed SEC1 public key length (0x04 || x || y).
pub const SECP256K1_UNCOMPRESSED_KEY_LEN: usize = 65;

/// Compact signature length (r || s).
pub const SECP256K1_SIGNATURE_LEN: usize = 64;

/// Parsed secp256k1 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1PublicKey(VerifyingKey);

impl Secp256k1PublicKey {
    /// Parse a SEC1 encoded key (compressed or uncompressed).
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SECP256K1_COMPRESSED_KEY_LEN
            && bytes.len() != SECP256K1_UNCOMPRESSED_KEY_LEN
        {
            return Err(CryptoError::InvalidPublicKeyLength {
                actual: bytes.len(),
            });
        }

        VerifyingKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Compressed SEC1 bytes (33 bytes).
    pub fn to_compressed(&self) -> [u8; SECP256K1_COMPRESSED_KEY_LEN] {
        let point = self.0.to_encoded_point(true);
        let mut bytes = [0u8; SECP256K1_COMPRESSED_KEY_LEN];
        bytes.copy_from_slice(point.as_bytes());
        bytes
    }

    /// Uncompressed SEC1 bytes (65 bytes).
    pub fn to_uncompressed(&self) -> [u8; SECP256K1_UNCOMPRESSED_KEY_LEN] {
        let point = self.0.to_encoded_point(false);
        let mut bytes = [0u8; SECP256K1_UNCOMPRESSED_KEY_LEN];
        bytes.copy_from_slice(point.as_bytes());
        bytes
    }

    /// Verify a signature over SHA-256(`message`).
    pub fn verify(
        &self,
        message: &[u8],
        signature: &Secp256k1Signature,
    ) -> Result<(), CryptoError> {
        let sig = Signature::from_slice(&signature.0).map_err(|_| CryptoError::InvalidSignature)?;
        let digest = sha256(message);

        self.0
            .verify_prehash(&digest, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// ECDSA signature (64 bytes, r||s format).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1Signature([u8; SECP256K1_SIGNATURE_LEN]);

impl Secp256k1Signature {
    /// Create from bytes (64 bytes).
    pub fn from_bytes(bytes: [u8; SECP256K1_SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from an untrusted slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; SECP256K1_SIGNATURE_LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidSignatureLength {
                    expected: SECP256K1_SIGNATURE_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; SECP256K1_SIGNATURE_LEN] {
        &self.0
    }
}

/// secp256k1 ECDSA keypair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get the public key.
    pub fn public_key(&self) -> Secp256k1PublicKey {
        Secp256k1PublicKey(*self.signing_key.verifying_key())
    }

    /// Sign SHA-256(`message`) (deterministic RFC 6979, low-S).
    pub fn sign(&self, message: &[u8]) -> Result<Secp256k1Signature, CryptoError> {
        let digest = sha256(message);
        let sig: Signature = self
            .signing_key
            .sign_prehash(&digest)
            .map_err(|_| CryptoError::SigningFailed)?;
        let bytes: [u8; SECP256K1_SIGNATURE_LEN] = sig.to_bytes().into();
        Ok(Secp256k1Signature(bytes))
    }

    /// Export the secret key bytes.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes().into())
    }
}
