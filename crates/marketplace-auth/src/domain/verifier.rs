//! # Signature Verifier
//!
//! Checks a signature over canonical payload bytes under Ed25519 (raw
//! message) or secp256k1 ECDSA (SHA-256 prehash, low-S only).
//!
//! ## Dispatch
//!
//! - Recognized hint: that algorithm only, no fallback.
//! - No hint: [`Algorithm::TRY_ORDER`] (Ed25519, then secp256k1), skipping
//!   algorithms whose key length does not fit.
//!
//! The hint only selects which check runs. Acceptance always depends on the
//! cryptographic result.

use super::entities::Algorithm;
use super::errors::RejectionReason;
use shared_crypto::signatures::ED25519_SIGNATURE_LEN;
use shared_crypto::{Ed25519PublicKey, Ed25519Signature, Secp256k1PublicKey, Secp256k1Signature};
use subtle::ConstantTimeEq;

/// Sentinel signature accepted without cryptographic checks when the
/// development bypass is active. 64 zero bytes.
pub const BYPASS_SIGNATURE: [u8; ED25519_SIGNATURE_LEN] = [0u8; ED25519_SIGNATURE_LEN];

/// Whether the bypass sentinel is honored. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BypassPolicy {
    /// The sentinel is an ordinary (invalid) signature.
    #[default]
    Disabled,
    /// The sentinel skips cryptographic verification.
    AllowSentinel,
}

/// A successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verified {
    /// Algorithm the principal must be derived under.
    pub algorithm: Algorithm,
    /// True if the bypass sentinel was accepted.
    pub bypassed: bool,
}

/// Stateless signature verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier {
    bypass: BypassPolicy,
}

impl SignatureVerifier {
    /// Create a verifier with the given bypass policy.
    pub const fn new(bypass: BypassPolicy) -> Self {
        Self { bypass }
    }

    /// Whether the bypass sentinel is honored.
    pub const fn bypass_enabled(&self) -> bool {
        matches!(self.bypass, BypassPolicy::AllowSentinel)
    }

    /// Verify `signature` over `payload` for `public_key`.
    ///
    /// # Errors
    ///
    /// - [`RejectionReason::MalformedPayload`] for wrong signature/key
    ///   lengths or keys that are not curve points
    /// - [`RejectionReason::SignatureMismatch`] if no attempted algorithm verifies
    pub fn verify(
        &self,
        payload: &[u8],
        signature: &[u8],
        public_key: &[u8],
        hint: Option<Algorithm>,
    ) -> Result<Verified, RejectionReason> {
        if signature.len() != ED25519_SIGNATURE_LEN {
            return Err(RejectionReason::MalformedPayload);
        }
        let key_fits = match hint {
            Some(algorithm) => algorithm.accepts_key_len(public_key.len()),
            None => Algorithm::TRY_ORDER
                .iter()
                .any(|a| a.accepts_key_len(public_key.len())),
        };
        if !key_fits {
            return Err(RejectionReason::MalformedPayload);
        }

        if self.bypass_enabled() && bool::from(signature.ct_eq(&BYPASS_SIGNATURE)) {
            return Ok(Verified {
                algorithm: hint.unwrap_or(Algorithm::infer_from_key_len(public_key.len())),
                bypassed: true,
            });
        }

        let candidates: &[Algorithm] = match &hint {
            Some(algorithm) => std::slice::from_ref(algorithm),
            None => &Algorithm::TRY_ORDER,
        };

        let mut any_key_decoded = false;
        for &algorithm in candidates {
            if !algorithm.accepts_key_len(public_key.len()) {
                continue;
            }
            match Self::check(algorithm, payload, signature, public_key) {
                Check::Valid => {
                    return Ok(Verified {
                        algorithm,
                        bypassed: false,
                    })
                }
                Check::Invalid => any_key_decoded = true,
                Check::BadKey => {}
            }
        }

        if any_key_decoded {
            Err(RejectionReason::SignatureMismatch)
        } else {
            Err(RejectionReason::MalformedPayload)
        }
    }

    /// Run one algorithm's check, ignoring policy and hints.
    pub fn verify_with(
        algorithm: Algorithm,
        payload: &[u8],
        signature: &[u8],
        public_key: &[u8],
    ) -> bool {
        matches!(
            Self::check(algorithm, payload, signature, public_key),
            Check::Valid
        )
    }

    fn check(algorithm: Algorithm, payload: &[u8], signature: &[u8], public_key: &[u8]) -> Check {
        match algorithm {
            Algorithm::Ed25519 => {
                let Ok(key) = Ed25519PublicKey::from_slice(public_key) else {
                    return Check::BadKey;
                };
                let Ok(sig) = Ed25519Signature::from_slice(signature) else {
                    return Check::Invalid;
                };
                key.verify(payload, &sig).map_or(Check::Invalid, |()| Check::Valid)
            }
            Algorithm::Secp256k1 => {
                let Ok(key) = Secp256k1PublicKey::from_sec1_bytes(public_key) else {
                    return Check::BadKey;
                };
                let Ok(sig) = Secp256k1Signature::from_slice(signature) else {
                    return Check::Invalid;
                };
                key.verify(payload, &sig).map_or(Check::Invalid, |()| Check::Valid)
            }
        }
    }
}

enum Check {
    Valid,
    Invalid,
    BadKey,
}
