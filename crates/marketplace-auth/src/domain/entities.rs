//! # Domain Entities
//!
//! Operations, field schemas, signed requests and verification outcomes.

use super::errors::RejectionReason;
use super::principal::Principal;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_crypto::ecdsa::{SECP256K1_COMPRESSED_KEY_LEN, SECP256K1_UNCOMPRESSED_KEY_LEN};
use shared_crypto::signatures::ED25519_PUBLIC_KEY_LEN;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Operations and their signed-field schemas
// =============================================================================

/// Every mutating marketplace operation that must be signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Create a new script listing.
    ScriptUpload,
    /// Change fields of an existing script.
    ScriptUpdate,
    /// Remove a script.
    ScriptDeletion,
    /// Make a script publicly visible.
    ScriptPublish,
    /// Change an author profile.
    ProfileUpdate,
}

impl OperationKind {
    /// All operation kinds.
    pub const ALL: [OperationKind; 5] = [
        OperationKind::ScriptUpload,
        OperationKind::ScriptUpdate,
        OperationKind::ScriptDeletion,
        OperationKind::ScriptPublish,
        OperationKind::ProfileUpdate,
    ];

    /// Wire tag, also emitted as the `operation` key of the canonical payload.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationKind::ScriptUpload => "script_upload",
            OperationKind::ScriptUpdate => "script_update",
            OperationKind::ScriptDeletion => "script_deletion",
            OperationKind::ScriptPublish => "script_publish",
            OperationKind::ProfileUpdate => "profile_update",
        }
    }

    /// The fields that participate in signing, in declaration order.
    pub const fn schema(&self) -> &'static [FieldSpec] {
        match self {
            OperationKind::ScriptUpload => SCRIPT_UPLOAD_SCHEMA,
            OperationKind::ScriptUpdate => SCRIPT_UPDATE_SCHEMA,
            OperationKind::ScriptDeletion => SCRIPT_DELETION_SCHEMA,
            OperationKind::ScriptPublish => SCRIPT_PUBLISH_SCHEMA,
            OperationKind::ProfileUpdate => PROFILE_UPDATE_SCHEMA,
        }
    }

    /// Schema field that carries the acting principal, if any.
    ///
    /// When a handler leaves it out, the gate fills it from the request's
    /// `author_principal` so the signed identity is always server-observed.
    pub const fn identity_field(&self) -> Option<&'static str> {
        match self {
            OperationKind::ScriptDeletion => Some("author_principal"),
            OperationKind::ProfileUpdate => Some("principal"),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = RejectionReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(RejectionReason::MalformedPayload)
    }
}

/// Value kind a schema field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// UTF-8 string.
    Text,
    /// Signed 64-bit integer.
    Integer,
    /// Boolean flag.
    Boolean,
    /// Unordered collection of strings (sorted and de-duplicated when signed).
    StringSet,
}

impl FieldKind {
    /// Human-readable kind name for diagnostics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "string",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::StringSet => "array of strings",
        }
    }
}

/// One signed field of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name (also the canonical payload key).
    pub name: &'static str,
    /// Accepted value kind.
    pub kind: FieldKind,
    /// Whether the field must be present.
    pub required: bool,
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: false,
    }
}

const SCRIPT_UPLOAD_SCHEMA: &[FieldSpec] = &[
    required("title", FieldKind::Text),
    required("description", FieldKind::Text),
    required("category", FieldKind::Text),
    required("lua_source", FieldKind::Text),
    required("version", FieldKind::Text),
    optional("tags", FieldKind::StringSet),
    optional("price", FieldKind::Integer),
];

const SCRIPT_UPDATE_SCHEMA: &[FieldSpec] = &[
    required("script_id", FieldKind::Text),
    optional("title", FieldKind::Text),
    optional("description", FieldKind::Text),
    optional("category", FieldKind::Text),
    optional("lua_source", FieldKind::Text),
    optional("version", FieldKind::Text),
    optional("tags", FieldKind::StringSet),
    optional("price", FieldKind::Integer),
];

const SCRIPT_DELETION_SCHEMA: &[FieldSpec] = &[
    required("script_id", FieldKind::Text),
    required("author_principal", FieldKind::Text),
];

const SCRIPT_PUBLISH_SCHEMA: &[FieldSpec] = &[required("script_id", FieldKind::Text)];

const PROFILE_UPDATE_SCHEMA: &[FieldSpec] = &[
    required("principal", FieldKind::Text),
    required("display_name", FieldKind::Text),
    optional("email", FieldKind::Text),
    optional("website", FieldKind::Text),
    optional("github", FieldKind::Text),
    optional("contact_public", FieldKind::Boolean),
];

// =============================================================================
// Signature algorithms
// =============================================================================

/// Supported signature schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Ed25519 over the raw canonical bytes.
    Ed25519,
    /// secp256k1 ECDSA over SHA-256(canonical bytes).
    Secp256k1,
}

impl Algorithm {
    /// Order in which algorithms are attempted when the client gives no hint.
    pub const TRY_ORDER: [Algorithm; 2] = [Algorithm::Ed25519, Algorithm::Secp256k1];

    /// Whether a public key of `len` bytes can belong to this algorithm.
    pub const fn accepts_key_len(&self, len: usize) -> bool {
        match self {
            Algorithm::Ed25519 => len == ED25519_PUBLIC_KEY_LEN,
            Algorithm::Secp256k1 => {
                len == SECP256K1_COMPRESSED_KEY_LEN || len == SECP256K1_UNCOMPRESSED_KEY_LEN
            }
        }
    }

    /// Best guess from key length alone (32 bytes is Ed25519).
    pub const fn infer_from_key_len(len: usize) -> Self {
        if len == ED25519_PUBLIC_KEY_LEN {
            Algorithm::Ed25519
        } else {
            Algorithm::Secp256k1
        }
    }

    /// Canonical hint string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Ed25519 => "ed25519",
            Algorithm::Secp256k1 => "secp256k1",
        }
    }

    /// Interpret a client-supplied algorithm hint.
    ///
    /// Missing or blank hints mean "no hint". Unknown names are
    /// [`RejectionReason::UnsupportedAlgorithm`].
    pub fn from_hint(hint: Option<&str>) -> Result<Option<Self>, RejectionReason> {
        let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) else {
            return Ok(None);
        };

        match hint.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(Some(Algorithm::Ed25519)),
            "secp256k1" | "ecdsa-secp256k1" | "es256k" => Ok(Some(Algorithm::Secp256k1)),
            _ => Err(RejectionReason::UnsupportedAlgorithm),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = RejectionReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::from_hint(Some(s))?.ok_or(RejectionReason::UnsupportedAlgorithm)
    }
}

// =============================================================================
// Request fields and the signed request
// =============================================================================

/// Operation fields as observed by the server, before schema filtering.
///
/// Holds raw JSON values; [`CanonicalPayloadBuilder`](super::canonical::CanonicalPayloadBuilder)
/// decides which of them are signed and how.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestFields(Map<String, Value>);

impl RequestFields {
    /// Create an empty field map.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a raw field value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether a field is present with a non-null value.
    pub fn has_value(&self, key: &str) -> bool {
        !matches!(self.0.get(key), None | Some(Value::Null))
    }

    /// Number of raw fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no raw fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for RequestFields {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A write request carrying its author's signature.
///
/// Created per HTTP request and dropped once the gate returns a verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedRequest {
    /// Declared operation.
    pub operation: OperationKind,
    /// Server-observed operation fields.
    pub fields: RequestFields,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
    /// Raw public key bytes.
    pub author_public_key: Vec<u8>,
    /// Principal the client claims to act as.
    pub author_principal: String,
    /// Signing time, whole seconds.
    pub timestamp: DateTime<Utc>,
    /// Optional client hint naming the signature algorithm.
    pub algorithm_hint: Option<String>,
}

impl SignedRequest {
    /// Fields the canonical payload is rebuilt from.
    ///
    /// Identical to `fields` except that an operation's identity field is
    /// filled from `author_principal` when the handler did not supply it.
    pub fn server_observed_fields(&self) -> RequestFields {
        let mut fields = self.fields.clone();
        if let Some(identity) = self.operation.identity_field() {
            if !fields.has_value(identity) {
                fields.insert(identity, self.author_principal.clone());
            }
        }
        fields
    }

    /// Signing time truncated to whole seconds.
    pub fn signed_at(&self) -> DateTime<Utc> {
        self.timestamp.trunc_subsecs(0)
    }
}

// =============================================================================
// Verdicts
// =============================================================================

/// Result of running a request through the gate. All-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Every check passed; `principal` is the authoritative author.
    Authorized {
        /// Verified and confirmed principal.
        principal: Principal,
    },
    /// The first failing check.
    Rejected {
        /// Why the request was refused.
        reason: RejectionReason,
    },
}

impl VerificationOutcome {
    /// Returns true if the request was authorized.
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        matches!(self, VerificationOutcome::Authorized { .. })
    }

    /// Convert into a `Result` for `?` propagation in handlers.
    pub fn into_result(self) -> Result<Principal, RejectionReason> {
        match self {
            VerificationOutcome::Authorized { principal } => Ok(principal),
            VerificationOutcome::Rejected { reason } => Err(reason),
        }
    }
}

impl From<Result<Principal, RejectionReason>> for VerificationOutcome {
    fn from(result: Result<Principal, RejectionReason>) -> Self {
        match result {
            Ok(principal) => VerificationOutcome::Authorized { principal },
            Err(reason) => VerificationOutcome::Rejected { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_tags_roundtrip() {
        for kind in OperationKind::ALL {
            assert_eq!(kind.as_str().parse::<OperationKind>(), Ok(kind));
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                Value::String(kind.as_str().to_string())
            );
        }
        assert_eq!(
            "script_destroy".parse::<OperationKind>(),
            Err(RejectionReason::MalformedPayload)
        );
    }

    #[test]
    fn test_schemas_have_unique_names_and_no_envelope_keys() {
        for kind in OperationKind::ALL {
            let schema = kind.schema();
            for (i, spec) in schema.iter().enumerate() {
                assert!(schema[i + 1..].iter().all(|other| other.name != spec.name));
                assert_ne!(spec.name, "operation");
                assert_ne!(spec.name, "timestamp");
            }
            if let Some(identity) = kind.identity_field() {
                assert!(schema.iter().any(|s| s.name == identity && s.required));
            }
        }
    }

    #[test]
    fn test_algorithm_hints() {
        assert_eq!(Algorithm::from_hint(None), Ok(None));
        assert_eq!(Algorithm::from_hint(Some("  ")), Ok(None));
        assert_eq!(
            Algorithm::from_hint(Some("Ed25519")),
            Ok(Some(Algorithm::Ed25519))
        );
        assert_eq!(
            Algorithm::from_hint(Some("ES256K")),
            Ok(Some(Algorithm::Secp256k1))
        );
        assert_eq!(
            Algorithm::from_hint(Some("rsa")),
            Err(RejectionReason::UnsupportedAlgorithm)
        );
    }

    #[test]
    fn test_key_length_dispatch() {
        assert!(Algorithm::Ed25519.accepts_key_len(32));
        assert!(!Algorithm::Ed25519.accepts_key_len(33));
        assert!(Algorithm::Secp256k1.accepts_key_len(33));
        assert!(Algorithm::Secp256k1.accepts_key_len(65));
        assert_eq!(Algorithm::infer_from_key_len(32), Algorithm::Ed25519);
        assert_eq!(Algorithm::infer_from_key_len(65), Algorithm::Secp256k1);
        assert_eq!(Algorithm::TRY_ORDER[0], Algorithm::Ed25519);
    }

    #[test]
    fn test_identity_field_is_filled_only_when_missing() {
        let mut request = SignedRequest {
            operation: OperationKind::ScriptDeletion,
            fields: RequestFields::new().with("script_id", "s-1"),
            signature: vec![],
            author_public_key: vec![],
            author_principal: "author".to_string(),
            timestamp: Utc::now(),
            algorithm_hint: None,
        };

        let observed = request.server_observed_fields();
        assert_eq!(observed.get("author_principal"), Some(&json!("author")));

        request.fields.insert("author_principal", "someone-else");
        let observed = request.server_observed_fields();
        assert_eq!(observed.get("author_principal"), Some(&json!("someone-else")));

        request.operation = OperationKind::ScriptPublish;
        request.fields = RequestFields::new().with("script_id", "s-1");
        assert!(!request.server_observed_fields().has_value("author_principal"));
    }

    #[test]
    fn test_outcome_conversions() {
        let rejected = VerificationOutcome::from(Err(RejectionReason::SignatureMismatch));
        assert!(!rejected.is_authorized());
        assert_eq!(
            rejected.into_result(),
            Err(RejectionReason::SignatureMismatch)
        );
    }
}
