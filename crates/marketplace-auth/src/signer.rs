//! # Request Signer
//!
//! Client half of the protocol. Produces [`SignedRequest`]s through the same
//! [`CanonicalPayloadBuilder`] the gate uses, so both sides agree on the bytes.

use crate::domain::canonical::CanonicalPayloadBuilder;
use crate::domain::entities::{Algorithm, OperationKind, RequestFields, SignedRequest};
use crate::domain::errors::SignerError;
use crate::domain::principal::{Principal, PrincipalDeriver};
use chrono::{DateTime, SubsecRound, Utc};
use shared_crypto::{Ed25519KeyPair, Secp256k1KeyPair};
use zeroize::Zeroizing;

enum SigningKey {
    Ed25519(Ed25519KeyPair),
    Secp256k1(Secp256k1KeyPair),
}

/// An author's key pair plus its derived principal.
pub struct RequestSigner {
    key: SigningKey,
    principal: Principal,
}

impl RequestSigner {
    /// Signer over an Ed25519 key pair.
    pub fn ed25519(keypair: Ed25519KeyPair) -> Self {
        let principal = PrincipalDeriver::ed25519(&keypair.public_key());
        Self {
            key: SigningKey::Ed25519(keypair),
            principal,
        }
    }

    /// Signer over a secp256k1 key pair.
    pub fn secp256k1(keypair: Secp256k1KeyPair) -> Self {
        let principal = PrincipalDeriver::secp256k1(&keypair.public_key());
        Self {
            key: SigningKey::Secp256k1(keypair),
            principal,
        }
    }

    /// Signer from a 32-byte secret (Ed25519 seed or secp256k1 scalar).
    pub fn from_secret(
        algorithm: Algorithm,
        secret: Zeroizing<[u8; 32]>,
    ) -> Result<Self, SignerError> {
        match algorithm {
            Algorithm::Ed25519 => Ok(Self::ed25519(Ed25519KeyPair::from_seed(*secret))),
            Algorithm::Secp256k1 => Ok(Self::secp256k1(Secp256k1KeyPair::from_bytes(*secret)?)),
        }
    }

    /// Signature algorithm.
    pub fn algorithm(&self) -> Algorithm {
        match self.key {
            SigningKey::Ed25519(_) => Algorithm::Ed25519,
            SigningKey::Secp256k1(_) => Algorithm::Secp256k1,
        }
    }

    /// Principal the gate will derive from this signer's key.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Public key as sent on the wire (secp256k1 keys are compressed).
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match &self.key {
            SigningKey::Ed25519(kp) => kp.public_key().as_bytes().to_vec(),
            SigningKey::Secp256k1(kp) => kp.public_key().to_compressed().to_vec(),
        }
    }

    /// Sign arbitrary bytes with this signer's algorithm.
    pub fn sign_bytes(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        match &self.key {
            SigningKey::Ed25519(kp) => Ok(kp.sign(message).as_bytes().to_vec()),
            SigningKey::Secp256k1(kp) => Ok(kp.sign(message)?.as_bytes().to_vec()),
        }
    }

    /// Sign `fields` for `operation` at `timestamp` (truncated to seconds).
    ///
    /// Identity fields left out of `fields` are filled exactly as the gate
    /// fills them, so the signature covers the same payload.
    pub fn sign(
        &self,
        operation: OperationKind,
        fields: RequestFields,
        timestamp: DateTime<Utc>,
    ) -> Result<SignedRequest, SignerError> {
        let mut request = SignedRequest {
            operation,
            fields,
            signature: Vec::new(),
            author_public_key: self.public_key_bytes(),
            author_principal: self.principal.to_string(),
            timestamp: timestamp.trunc_subsecs(0),
            algorithm_hint: Some(self.algorithm().as_str().to_string()),
        };

        let payload = CanonicalPayloadBuilder::for_request(&request)?;
        request.signature = self.sign_bytes(payload.as_bytes())?;
        Ok(request)
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("algorithm", &self.algorithm())
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::verifier::SignatureVerifier;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 15).unwrap()
    }

    #[test]
    fn test_signature_covers_canonical_payload() {
        let signer = RequestSigner::ed25519(Ed25519KeyPair::generate());
        let request = signer
            .sign(
                OperationKind::ScriptPublish,
                RequestFields::new().with("script_id", "abc"),
                at(),
            )
            .unwrap();

        let payload = CanonicalPayloadBuilder::for_request(&request).unwrap();
        assert!(SignatureVerifier::verify_with(
            Algorithm::Ed25519,
            payload.as_bytes(),
            &request.signature,
            &request.author_public_key,
        ));
        assert_eq!(request.algorithm_hint.as_deref(), Some("ed25519"));
    }

    #[test]
    fn test_from_secret_is_deterministic() {
        let secret = || Zeroizing::new([7u8; 32]);
        let a = RequestSigner::from_secret(Algorithm::Secp256k1, secret()).unwrap();
        let b = RequestSigner::from_secret(Algorithm::Secp256k1, secret()).unwrap();
        assert_eq!(a.principal(), b.principal());
        assert_eq!(a.public_key_bytes().len(), 33);

        let ed = RequestSigner::from_secret(Algorithm::Ed25519, secret()).unwrap();
        assert_ne!(ed.principal(), a.principal());
        assert_eq!(
            PrincipalDeriver::derive(Algorithm::Ed25519, &ed.public_key_bytes()).unwrap(),
            *ed.principal()
        );
    }

    #[test]
    fn test_zero_secp256k1_secret_rejected() {
        let zero = Zeroizing::new([0u8; 32]);
        assert!(RequestSigner::from_secret(Algorithm::Secp256k1, zero).is_err());
    }

    #[test]
    fn test_missing_required_field_fails_before_signing() {
        let signer = RequestSigner::ed25519(Ed25519KeyPair::generate());
        let err = signer
            .sign(OperationKind::ScriptUpload, RequestFields::new(), at())
            .unwrap_err();
        assert!(matches!(err, SignerError::Canonical(_)));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let signer = RequestSigner::ed25519(Ed25519KeyPair::from_seed([9u8; 32]));
        let debug = format!("{signer:?}");
        assert!(debug.contains("Ed25519"));
        assert!(!debug.contains("seed"));
    }
}
