//! # Marketplace Authentication
//!
//! Binds every mutating marketplace request (script upload, update,
//! deletion, publish; profile update) to its author's key pair.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): canonical payloads, principal derivation,
//!   signature checks, replay window. Pure, no I/O
//! - **Ports Layer** (`ports/`): inbound API and the outbound clock
//! - **Service Layer** (`service.rs`): the [`AuthenticationGate`] pipeline
//! - **Adapters Layer** (`adapters/`): clocks and the HTTP wire format
//!
//! ## Flow
//!
//! ```text
//! request ─► FormatValidated ─► PayloadReconstructed ─► SignatureChecked
//!         ─► PrincipalConfirmed ─► TimestampChecked ─► Authorized(principal)
//! ```
//!
//! ## Security Notes
//!
//! - The payload is always rebuilt server-side from observed fields; a
//!   client-supplied copy is never read
//! - The algorithm hint selects a check but never substitutes for one
//! - The development bypass is fixed at boot and refused in production

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;
pub mod signer;

// Re-export public API
pub use adapters::clock::{FixedClock, SystemClock};
pub use adapters::http::{authorize_body, router, RejectionBody, SignedRequestBody};
pub use config::{AuthConfig, ConfigError, Environment};
pub use domain::canonical::{CanonicalPayload, CanonicalPayloadBuilder, FieldValue};
pub use domain::entities::{
    Algorithm, FieldKind, FieldSpec, OperationKind, RequestFields, SignedRequest,
    VerificationOutcome,
};
pub use domain::errors::{CanonicalError, PrincipalError, RejectionReason, SignerError};
pub use domain::principal::{Principal, PrincipalDeriver};
pub use domain::timestamp::ReplayWindow;
pub use domain::verifier::{BypassPolicy, SignatureVerifier, Verified, BYPASS_SIGNATURE};
pub use ports::inbound::AuthenticationApi;
pub use ports::outbound::Clock;
pub use service::{AuthenticationGate, GateStage};
pub use signer::RequestSigner;
