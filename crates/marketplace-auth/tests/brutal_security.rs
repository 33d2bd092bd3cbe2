//! # Brutal Security Tests for Marketplace Authentication
//!
//! These tests try to get a forged, replayed or impersonating write request
//! past the authentication gate.
//!
//! ## Test Categories
//!
//! 1. **Tampering** - Modified fields, modified signatures
//! 2. **Algorithm Confusion** - Hints that lie, cross-algorithm keys
//! 3. **Impersonation** - Valid signatures under someone else's principal
//! 4. **Replay** - Stale and future-dated timestamps
//! 5. **Bypass Isolation** - Sentinel signature with and without the flag
//! 6. **Smuggling** - Unsigned fields and client-side payload copies

use chrono::{DateTime, Duration, TimeZone, Utc};
use marketplace_auth::{
    Algorithm, AuthConfig, AuthenticationApi, AuthenticationGate, CanonicalPayloadBuilder,
    Environment, FixedClock, OperationKind, Principal, PrincipalDeriver, PrincipalError,
    RejectionReason, RequestFields, RequestSigner, SignedRequest, VerificationOutcome,
    BYPASS_SIGNATURE,
};
use serde_json::json;
use shared_crypto::{sha224, Ed25519KeyPair, Secp256k1KeyPair};
use std::sync::Arc;

// =============================================================================
// TEST HELPERS
// =============================================================================

fn new_year() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn gate_with(config: AuthConfig, now: DateTime<Utc>) -> AuthenticationGate<FixedClock> {
    AuthenticationGate::with_clock(config, FixedClock::new(now)).unwrap()
}

fn make_gate() -> AuthenticationGate<FixedClock> {
    gate_with(AuthConfig::for_tests(600, 30), new_year())
}

fn day_window_gate(now: DateTime<Utc>) -> AuthenticationGate<FixedClock> {
    gate_with(AuthConfig::for_tests(86_400, 30), now)
}

fn ed25519_signer() -> RequestSigner {
    RequestSigner::ed25519(Ed25519KeyPair::generate())
}

fn secp256k1_signer() -> RequestSigner {
    RequestSigner::secp256k1(Secp256k1KeyPair::generate())
}

fn upload_fields() -> RequestFields {
    RequestFields::new()
        .with("title", "Hello")
        .with("description", "World")
        .with("category", "Dev")
        .with("lua_source", "print('hi')")
        .with("version", "1.0.0")
        .with("tags", json!(["b", "a"]))
        .with("price", 250)
}

fn signed_upload(signer: &RequestSigner, at: DateTime<Utc>) -> SignedRequest {
    signer
        .sign(OperationKind::ScriptUpload, upload_fields(), at)
        .unwrap()
}

fn flip_last_char(text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    if let Some(last) = chars.last_mut() {
        *last = if *last == 'x' { 'y' } else { 'x' };
    }
    chars.into_iter().collect()
}

// =============================================================================
// SCENARIO
// =============================================================================

#[test]
fn brutal_reference_scenario() {
    let k1 = ed25519_signer();
    let p2 = ed25519_signer().principal().clone();
    let gate = make_gate();

    let fields = RequestFields::new()
        .with("title", "Hello")
        .with("description", "World")
        .with("category", "Dev")
        .with("lua_source", "return {}")
        .with("version", "0.1.0")
        .with("tags", json!(["b", "a"]));
    let at = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let mut request = k1.sign(OperationKind::ScriptUpload, fields, at).unwrap();

    assert_eq!(
        gate.authenticate(&request),
        VerificationOutcome::Authorized {
            principal: k1.principal().clone()
        }
    );

    request.author_principal = p2.to_string();
    assert_eq!(
        gate.authenticate(&request),
        VerificationOutcome::Rejected {
            reason: RejectionReason::PrincipalMismatch
        }
    );
}

// =============================================================================
// TAMPERING
// =============================================================================

#[test]
fn brutal_every_signed_text_field_is_tamper_evident() {
    let signer = ed25519_signer();
    let gate = make_gate();
    let original = signed_upload(&signer, new_year());

    for field in ["title", "description", "category", "lua_source", "version"] {
        let mut request = original.clone();
        let value = request.fields.get(field).unwrap().as_str().unwrap().to_string();
        request.fields.insert(field, flip_last_char(&value));
        assert_eq!(
            gate.authorize(&request),
            Err(RejectionReason::SignatureMismatch),
            "tampering with {field} was not detected"
        );
    }
}

#[test]
fn brutal_tags_and_price_are_tamper_evident() {
    let signer = secp256k1_signer();
    let gate = make_gate();
    let original = signed_upload(&signer, new_year());

    let mut added_tag = original.clone();
    added_tag.fields.insert("tags", json!(["a", "b", "c"]));
    assert_eq!(gate.authorize(&added_tag), Err(RejectionReason::SignatureMismatch));

    let mut cheaper = original.clone();
    cheaper.fields.insert("price", 0);
    assert_eq!(gate.authorize(&cheaper), Err(RejectionReason::SignatureMismatch));

    // Reordered tags are the same set, so still authorized.
    let mut reordered = original;
    reordered.fields.insert("tags", json!(["a", "b", "b"]));
    assert!(gate.authenticate(&reordered).is_authorized());
}

#[test]
fn brutal_every_signature_byte_is_checked() {
    let signer = ed25519_signer();
    let gate = make_gate();
    let original = signed_upload(&signer, new_year());

    for index in 0..original.signature.len() {
        let mut request = original.clone();
        request.signature[index] ^= 0x01;
        assert_eq!(
            gate.authorize(&request),
            Err(RejectionReason::SignatureMismatch),
            "flipped signature byte {index} accepted"
        );
    }
}

#[test]
fn brutal_signed_operation_cannot_be_relabelled() {
    let signer = ed25519_signer();
    let gate = make_gate();
    let mut request = signer
        .sign(
            OperationKind::ScriptPublish,
            RequestFields::new().with("script_id", "s-1"),
            new_year(),
        )
        .unwrap();

    request.operation = OperationKind::ScriptUpdate;
    assert_eq!(gate.authorize(&request), Err(RejectionReason::SignatureMismatch));
}

#[test]
fn brutal_timestamp_cannot_be_refreshed() {
    let signer = ed25519_signer();
    let gate = make_gate();
    let mut request = signed_upload(&signer, new_year() - Duration::seconds(900));
    request.timestamp = new_year();
    assert_eq!(gate.authorize(&request), Err(RejectionReason::SignatureMismatch));
}

// =============================================================================
// ALGORITHM CONFUSION
// =============================================================================

#[test]
fn brutal_both_algorithms_with_and_without_hint() {
    let gate = make_gate();

    for signer in [ed25519_signer(), secp256k1_signer()] {
        let mut request = signed_upload(&signer, new_year());
        assert!(gate.authenticate(&request).is_authorized());

        request.algorithm_hint = None;
        assert!(gate.authenticate(&request).is_authorized());

        request.algorithm_hint = Some(String::new());
        assert!(gate.authenticate(&request).is_authorized());
    }

    let mut request = signed_upload(&secp256k1_signer(), new_year());
    request.algorithm_hint = Some(" ES256K ".to_string());
    assert!(gate.authenticate(&request).is_authorized());
}

#[test]
fn brutal_wrong_hint_does_not_fall_back() {
    let gate = make_gate();

    // The hinted algorithm cannot take the key, and nothing else is tried.
    let mut ed = signed_upload(&ed25519_signer(), new_year());
    ed.algorithm_hint = Some("secp256k1".to_string());
    assert_eq!(gate.authorize(&ed), Err(RejectionReason::MalformedPayload));

    let mut k1 = signed_upload(&secp256k1_signer(), new_year());
    k1.algorithm_hint = Some("ed25519".to_string());
    assert_eq!(gate.authorize(&k1), Err(RejectionReason::MalformedPayload));
}

#[test]
fn brutal_weak_ed25519_key_is_rejected() {
    // Identity point key with R = identity, s = 0 satisfies the lenient
    // equation for every message.
    let mut identity_key = [0u8; 32];
    identity_key[0] = 1;
    let mut universal_sig = [0u8; 64];
    universal_sig[0] = 1;

    let spki: Vec<u8> = [
        &[0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00][..],
        &identity_key[..],
    ]
    .concat();
    let mut id = [0u8; 29];
    id[..28].copy_from_slice(&sha224(&spki));
    id[28] = 0x02;
    let principal = Principal::from_id(&id);

    assert_eq!(
        PrincipalDeriver::derive(Algorithm::Ed25519, &identity_key),
        Err(PrincipalError::InvalidPublicKey { algorithm: "ed25519" })
    );

    let gate = make_gate();
    for script_id in ["s-1", "s-2", "s-3"] {
        for hint in [None, Some("ed25519".to_string())] {
            let request = SignedRequest {
                operation: OperationKind::ScriptPublish,
                fields: RequestFields::new().with("script_id", script_id),
                signature: universal_sig.to_vec(),
                author_public_key: identity_key.to_vec(),
                author_principal: principal.to_string(),
                timestamp: new_year(),
                algorithm_hint: hint,
            };
            assert_eq!(gate.authorize(&request), Err(RejectionReason::MalformedPayload));
        }
    }
}

#[test]
fn brutal_unknown_algorithm_hint() {
    let gate = make_gate();
    let mut request = signed_upload(&ed25519_signer(), new_year());
    request.algorithm_hint = Some("rsa".to_string());
    assert_eq!(gate.authorize(&request), Err(RejectionReason::UnsupportedAlgorithm));
}

#[test]
fn brutal_uncompressed_secp256k1_key_derives_same_principal() {
    let keypair = Secp256k1KeyPair::generate();
    let uncompressed = keypair.public_key().to_uncompressed().to_vec();
    let signer = RequestSigner::secp256k1(keypair);
    let gate = make_gate();

    let mut request = signed_upload(&signer, new_year());
    request.author_public_key = uncompressed;
    assert_eq!(gate.authorize(&request), Ok(signer.principal().clone()));
}

#[test]
fn brutal_malformed_credentials() {
    let gate = make_gate();
    let original = signed_upload(&ed25519_signer(), new_year());

    let mut short_sig = original.clone();
    short_sig.signature.pop();
    assert_eq!(gate.authorize(&short_sig), Err(RejectionReason::MalformedPayload));

    let mut odd_key = original.clone();
    odd_key.author_public_key.push(0);
    assert_eq!(gate.authorize(&odd_key), Err(RejectionReason::MalformedPayload));

    let mut bad_principal = original.clone();
    bad_principal.author_principal = flip_last_char(&bad_principal.author_principal);
    assert_eq!(gate.authorize(&bad_principal), Err(RejectionReason::MalformedPayload));

    let mut empty = original;
    empty.author_principal = String::new();
    assert_eq!(gate.authorize(&empty), Err(RejectionReason::MalformedPayload));
}

// =============================================================================
// IMPERSONATION
// =============================================================================

#[test]
fn brutal_valid_signature_wrong_principal() {
    let attacker = ed25519_signer();
    let victim = secp256k1_signer();
    let gate = make_gate();

    let mut request = signed_upload(&attacker, new_year());
    request.author_principal = victim.principal().to_string();
    assert_eq!(gate.authorize(&request), Err(RejectionReason::PrincipalMismatch));
}

#[test]
fn brutal_deletion_binds_author_principal() {
    let owner = ed25519_signer();
    let attacker = ed25519_signer();
    let gate = make_gate();

    // Owner signs a deletion; the gate pins author_principal from the claim.
    let request = owner
        .sign(
            OperationKind::ScriptDeletion,
            RequestFields::new().with("script_id", "owned-by-owner"),
            new_year(),
        )
        .unwrap();
    assert_eq!(gate.authorize(&request), Ok(owner.principal().clone()));

    // Attacker replays the owner's signature under their own key.
    let mut stolen = request.clone();
    stolen.author_public_key = attacker.public_key_bytes();
    stolen.author_principal = attacker.principal().to_string();
    assert_eq!(gate.authorize(&stolen), Err(RejectionReason::SignatureMismatch));
}

#[test]
fn brutal_profile_update_for_someone_else() {
    let victim = ed25519_signer();
    let attacker = ed25519_signer();
    let gate = make_gate();

    let fields = RequestFields::new()
        .with("principal", victim.principal().to_string())
        .with("display_name", "pwned");
    let request = attacker
        .sign(OperationKind::ProfileUpdate, fields, new_year())
        .unwrap();

    // The signature is valid, but the authorized principal is the attacker's.
    let authorized: Principal = gate.authorize(&request).unwrap();
    assert_eq!(&authorized, attacker.principal());
    assert_ne!(&authorized, victim.principal());
}

// =============================================================================
// REPLAY
// =============================================================================

#[test]
fn brutal_replay_window_24h() {
    let signer = ed25519_signer();
    let now = new_year();
    let gate = day_window_gate(now);

    let stale = signed_upload(&signer, now - Duration::hours(25));
    assert_eq!(
        gate.authorize(&stale),
        Err(RejectionReason::ExpiredOrFutureTimestamp)
    );

    let slightly_ahead = signed_upload(&signer, now + Duration::seconds(2));
    assert!(gate.authenticate(&slightly_ahead).is_authorized());

    let far_ahead = signed_upload(&signer, now + Duration::minutes(10));
    assert_eq!(
        gate.authorize(&far_ahead),
        Err(RejectionReason::ExpiredOrFutureTimestamp)
    );
}

#[test]
fn brutal_default_window_rejects_old_signature() {
    let signer = secp256k1_signer();
    let gate = gate_with(AuthConfig::for_tests(600, 30), new_year() + Duration::minutes(11));
    let request = signed_upload(&signer, new_year());
    assert_eq!(
        gate.authorize(&request),
        Err(RejectionReason::ExpiredOrFutureTimestamp)
    );
}

#[test]
fn brutal_replay_is_deterministic() {
    let signer = ed25519_signer();
    let gate = make_gate();
    let request = signed_upload(&signer, new_year());
    let first = gate.authenticate(&request);
    for _ in 0..3 {
        assert_eq!(gate.authenticate(&request), first);
    }
}

// =============================================================================
// BYPASS ISOLATION
// =============================================================================

#[test]
fn brutal_sentinel_rejected_without_flag() {
    let signer = ed25519_signer();
    let gate = make_gate();

    let mut sentinel = signed_upload(&signer, new_year());
    sentinel.signature = BYPASS_SIGNATURE.to_vec();

    let mut garbage = signed_upload(&signer, new_year());
    garbage.signature = vec![0x5a; 64];

    assert_eq!(gate.authenticate(&sentinel), gate.authenticate(&garbage));
    assert_eq!(gate.authorize(&sentinel), Err(RejectionReason::SignatureMismatch));
}

#[test]
fn brutal_sentinel_accepted_with_flag_but_still_bound() {
    let signer = secp256k1_signer();
    let other = ed25519_signer();
    let config = AuthConfig {
        environment: Environment::Test,
        allow_dev_bypass: true,
        ..AuthConfig::for_tests(600, 30)
    };
    let gate = gate_with(config, new_year());

    let mut request = signed_upload(&signer, new_year());
    request.signature = BYPASS_SIGNATURE.to_vec();
    assert_eq!(gate.authorize(&request), Ok(signer.principal().clone()));

    // Principal confirmation still applies.
    let mut impersonation = request.clone();
    impersonation.author_principal = other.principal().to_string();
    assert_eq!(
        gate.authorize(&impersonation),
        Err(RejectionReason::PrincipalMismatch)
    );

    // So does the replay window.
    let mut stale = request;
    stale.timestamp = new_year() - Duration::hours(1);
    assert_eq!(
        gate.authorize(&stale),
        Err(RejectionReason::ExpiredOrFutureTimestamp)
    );
}

#[test]
fn brutal_bypass_cannot_be_enabled_in_production() {
    let config = AuthConfig {
        environment: Environment::Production,
        allow_dev_bypass: true,
        ..AuthConfig::default()
    };
    assert!(AuthenticationGate::with_clock(config, FixedClock::new(new_year())).is_err());
}

// =============================================================================
// SMUGGLING
// =============================================================================

#[test]
fn brutal_unsigned_fields_do_not_break_or_enter_payload() {
    let signer = ed25519_signer();
    let gate = make_gate();
    let mut request = signed_upload(&signer, new_year());

    request.fields.insert("is_featured", true);
    request.fields.insert("author_principal", "someone-else");
    request.fields.insert("payload", "{\"title\":\"Evil\"}");
    assert!(gate.authenticate(&request).is_authorized());

    let payload = CanonicalPayloadBuilder::for_request(&request).unwrap();
    assert!(payload.keys().all(|k| k != "is_featured" && k != "payload"));
}

#[test]
fn brutal_concurrent_requests_share_one_gate() {
    let gate = Arc::new(make_gate());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || {
                let signer = if i % 2 == 0 {
                    ed25519_signer()
                } else {
                    secp256k1_signer()
                };
                let request = signed_upload(&signer, new_year());
                gate.authorize(&request) == Ok(signer.principal().clone())
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
