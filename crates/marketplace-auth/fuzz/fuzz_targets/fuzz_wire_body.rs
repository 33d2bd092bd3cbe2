//! Fuzz target for raw HTTP bodies.
//!
//! Any byte string posted to the verify route must decode to a verdict,
//! never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use marketplace_auth::{authorize_body, AuthConfig, AuthenticationGate, SystemClock};

fuzz_target!(|data: &[u8]| {
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(gate) = AuthenticationGate::with_clock(AuthConfig::for_tests(600, 30), SystemClock)
    else {
        return;
    };
    let _ = authorize_body(&gate, body);
});
