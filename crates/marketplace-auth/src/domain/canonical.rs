//! # Canonical Payload
//!
//! Deterministic bytes that signatures are computed over.
//!
//! ## Rules
//!
//! - Compact JSON object, keys sorted byte-wise.
//! - Keys are the operation's schema fields plus `operation` and `timestamp`.
//! - Missing, `null`, `""` and `[]` are all absent and never emitted.
//! - Integers are plain i64 (`5.0` becomes `5`).
//! - String sets are sorted and de-duplicated.
//!
//! The client signer and the server gate both go through
//! [`CanonicalPayloadBuilder::build`], so there is exactly one rule set.

use super::entities::{FieldKind, FieldSpec, OperationKind, RequestFields, SignedRequest};
use super::errors::CanonicalError;
use super::timestamp::canonical_timestamp;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Number, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Envelope key carrying the operation tag.
pub const OPERATION_KEY: &str = "operation";
/// Envelope key carrying the signing time.
pub const TIMESTAMP_KEY: &str = "timestamp";

// Exclusive upper bound of i64 as f64 (2^63).
const I64_UPPER_F64: f64 = 9_223_372_036_854_775_808.0;

/// One normalized value inside a canonical payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Non-empty string.
    Text(String),
    /// 64-bit integer.
    Integer(i64),
    /// Boolean flag.
    Boolean(bool),
    /// Non-empty, sorted, de-duplicated strings.
    StringSet(Vec<String>),
}

/// Immutable canonical payload for one request.
#[derive(Clone, PartialEq, Eq)]
pub struct CanonicalPayload {
    operation: OperationKind,
    entries: BTreeMap<&'static str, FieldValue>,
    bytes: Vec<u8>,
}

impl CanonicalPayload {
    /// Operation this payload authorizes.
    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    /// The exact bytes a signature covers.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume into the signed bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Normalized value of a key, if present.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.get(key)
    }

    /// Keys in serialization order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Byte length of the serialized payload.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Never true; every payload carries its envelope keys.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Payload contents stay out of logs.
impl fmt::Debug for CanonicalPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanonicalPayload")
            .field("operation", &self.operation)
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Builds [`CanonicalPayload`]s. Pure and stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalPayloadBuilder;

impl CanonicalPayloadBuilder {
    /// Rebuild the canonical payload for `operation` from observed fields.
    ///
    /// Fields outside the operation's schema are ignored whatever their type.
    ///
    /// # Errors
    ///
    /// - [`CanonicalError::MissingField`] if a required field is absent
    /// - [`CanonicalError::TypeMismatch`] / [`CanonicalError::NonIntegral`]
    ///   if a schema field has the wrong shape
    pub fn build(
        operation: OperationKind,
        fields: &RequestFields,
        timestamp: DateTime<Utc>,
    ) -> Result<CanonicalPayload, CanonicalError> {
        let mut entries = BTreeMap::new();
        entries.insert(
            OPERATION_KEY,
            FieldValue::Text(operation.as_str().to_string()),
        );
        entries.insert(TIMESTAMP_KEY, FieldValue::Text(canonical_timestamp(timestamp)));

        for spec in operation.schema() {
            match normalize(spec, fields.get(spec.name))? {
                Some(value) => {
                    entries.insert(spec.name, value);
                }
                None if spec.required => {
                    return Err(CanonicalError::MissingField { field: spec.name });
                }
                None => {}
            }
        }

        let bytes = serde_json::to_vec(&entries).map_err(|_| CanonicalError::Encoding)?;

        Ok(CanonicalPayload {
            operation,
            entries,
            bytes,
        })
    }

    /// Rebuild the payload a [`SignedRequest`] claims to have signed.
    pub fn for_request(request: &SignedRequest) -> Result<CanonicalPayload, CanonicalError> {
        Self::build(
            request.operation,
            &request.server_observed_fields(),
            request.signed_at(),
        )
    }
}

fn normalize(spec: &FieldSpec, raw: Option<&Value>) -> Result<Option<FieldValue>, CanonicalError> {
    let mismatch = || CanonicalError::TypeMismatch {
        field: spec.name,
        expected: spec.kind.as_str(),
    };

    let value = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };

    match (spec.kind, value) {
        (FieldKind::Text, Value::String(text)) if text.is_empty() => Ok(None),
        (FieldKind::Text, Value::String(text)) => Ok(Some(FieldValue::Text(text.clone()))),
        (FieldKind::Integer, Value::Number(number)) => integer(spec.name, number)
            .map(FieldValue::Integer)
            .map(Some),
        (FieldKind::Boolean, Value::Bool(flag)) => Ok(Some(FieldValue::Boolean(*flag))),
        (FieldKind::StringSet, Value::Array(items)) => {
            let mut set = BTreeSet::new();
            for item in items {
                match item {
                    Value::String(s) if s.is_empty() => {}
                    Value::String(s) => {
                        set.insert(s.clone());
                    }
                    _ => return Err(mismatch()),
                }
            }
            if set.is_empty() {
                Ok(None)
            } else {
                Ok(Some(FieldValue::StringSet(set.into_iter().collect())))
            }
        }
        _ => Err(mismatch()),
    }
}

fn integer(field: &'static str, number: &Number) -> Result<i64, CanonicalError> {
    if let Some(i) = number.as_i64() {
        return Ok(i);
    }
    if number.is_u64() {
        return Err(CanonicalError::NonIntegral { field });
    }
    match number.as_f64() {
        Some(f)
            if f.is_finite()
                && f.fract() == 0.0
                && (-I64_UPPER_F64..I64_UPPER_F64).contains(&f) =>
        {
            Ok(f as i64)
        }
        _ => Err(CanonicalError::NonIntegral { field }),
    }
}
