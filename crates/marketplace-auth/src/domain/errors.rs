//! # Authentication Errors
//!
//! Rejection reasons returned to callers, plus the internal errors of the
//! canonicalization and principal stages that collapse into them.

use thiserror::Error;

/// Why the gate refused a request.
///
/// Messages are deliberately generic. They never echo payload bytes, keys or
/// which sub-check of a stage failed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// Wrong-length fields, undecodable encodings, unknown operations,
    /// missing required fields or fields of the wrong type.
    #[error("Malformed signed request")]
    MalformedPayload,

    /// The algorithm hint names a scheme the server does not support.
    #[error("Unsupported signature algorithm")]
    UnsupportedAlgorithm,

    /// No supported algorithm verifies the signature over the canonical payload.
    #[error("Signature verification failed")]
    SignatureMismatch,

    /// The public key does not derive to the claimed principal.
    #[error("Public key does not match author principal")]
    PrincipalMismatch,

    /// The signing time is outside the accepted window.
    #[error("Request timestamp outside accepted window")]
    ExpiredOrFutureTimestamp,
}

impl RejectionReason {
    /// Stable machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            RejectionReason::MalformedPayload => "malformed_payload",
            RejectionReason::UnsupportedAlgorithm => "unsupported_algorithm",
            RejectionReason::SignatureMismatch => "signature_mismatch",
            RejectionReason::PrincipalMismatch => "principal_mismatch",
            RejectionReason::ExpiredOrFutureTimestamp => "expired_or_future_timestamp",
        }
    }

    /// True for failures of authentication proper (vs. bad input shape).
    pub const fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            RejectionReason::SignatureMismatch
                | RejectionReason::PrincipalMismatch
                | RejectionReason::ExpiredOrFutureTimestamp
        )
    }
}

/// Canonical payload could not be rebuilt from the observed fields.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CanonicalError {
    /// A required schema field is absent or empty.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Field name.
        field: &'static str,
    },

    /// A schema field holds a value of the wrong kind.
    #[error("Field {field} must be {expected}")]
    TypeMismatch {
        /// Field name.
        field: &'static str,
        /// Expected kind.
        expected: &'static str,
    },

    /// A number that is not an integer representable as i64.
    #[error("Field {field} is not a 64-bit integer")]
    NonIntegral {
        /// Field name.
        field: &'static str,
    },

    /// JSON encoding of the payload failed.
    #[error("Canonical encoding failed")]
    Encoding,
}

impl From<CanonicalError> for RejectionReason {
    fn from(_: CanonicalError) -> Self {
        RejectionReason::MalformedPayload
    }
}

/// Principal text or key material could not be interpreted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrincipalError {
    /// Text is not in the grouped base32 form.
    #[error("Invalid principal encoding")]
    InvalidEncoding,

    /// Decoded bytes fail the embedded CRC32.
    #[error("Principal checksum mismatch")]
    ChecksumMismatch,

    /// Decoded id has an unexpected length.
    #[error("Invalid principal length: {0}")]
    InvalidLength(usize),

    /// Public key bytes are not a valid key for the algorithm.
    #[error("Invalid public key for {algorithm}")]
    InvalidPublicKey {
        /// Algorithm name.
        algorithm: &'static str,
    },
}

impl From<PrincipalError> for RejectionReason {
    fn from(_: PrincipalError) -> Self {
        RejectionReason::MalformedPayload
    }
}

/// Client-side signing failures.
#[derive(Debug, Error)]
pub enum SignerError {
    /// Key material was rejected or signing failed.
    #[error("Signing key error: {0}")]
    Crypto(#[from] shared_crypto::CryptoError),

    /// The fields do not canonicalize for the operation.
    #[error("Cannot canonicalize request: {0}")]
    Canonical(#[from] CanonicalError),
}
