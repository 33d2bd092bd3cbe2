//! Fuzz target for the authentication gate.
//!
//! Arbitrary credentials, fields and hints must never panic the gate, and
//! the verdict must be deterministic for a fixed clock.
//!
//! ## Running
//!
//! ```bash
//! cd crates/marketplace-auth
//! cargo +nightly fuzz run fuzz_gate
//! ```

#![no_main]

use chrono::DateTime;
use libfuzzer_sys::fuzz_target;
use marketplace_auth::{
    AuthConfig, AuthenticationApi, AuthenticationGate, FixedClock, OperationKind, RequestFields,
    SignedRequest,
};

#[derive(Debug, arbitrary::Arbitrary)]
struct FuzzInput {
    operation: u8,
    fields: Vec<(String, FuzzValue)>,
    signature: Vec<u8>,
    public_key: Vec<u8>,
    principal: String,
    timestamp: i64,
    hint: Option<String>,
    bypass: bool,
}

#[derive(Debug, arbitrary::Arbitrary)]
enum FuzzValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl From<FuzzValue> for serde_json::Value {
    fn from(value: FuzzValue) -> Self {
        match value {
            FuzzValue::Null => serde_json::Value::Null,
            FuzzValue::Bool(b) => b.into(),
            FuzzValue::Int(i) => i.into(),
            FuzzValue::Float(f) => f.into(),
            FuzzValue::Text(s) => s.into(),
            FuzzValue::List(items) => items.into(),
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    let Some(timestamp) = DateTime::from_timestamp(input.timestamp % 100_000_000_000, 0) else {
        return;
    };
    let operation = OperationKind::ALL[usize::from(input.operation) % OperationKind::ALL.len()];

    let mut config = AuthConfig::for_tests(600, 30);
    config.allow_dev_bypass = input.bypass;
    let Ok(gate) = AuthenticationGate::with_clock(config, FixedClock::new(timestamp)) else {
        return;
    };

    let mut fields = RequestFields::new();
    for (key, value) in input.fields {
        fields.insert(key, value);
    }

    let request = SignedRequest {
        operation,
        fields,
        signature: input.signature,
        author_public_key: input.public_key,
        author_principal: input.principal,
        timestamp,
        algorithm_hint: input.hint,
    };

    // Should NEVER panic, regardless of input
    let first = gate.authenticate(&request);
    let second = gate.authenticate(&request);
    assert_eq!(first, second);
});
