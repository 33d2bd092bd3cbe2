//! # Authentication Gate
//!
//! Application service implementing [`AuthenticationApi`].
//!
//! ## Pipeline
//!
//! ```text
//! Received → FormatValidated → PayloadReconstructed → SignatureChecked
//!          → PrincipalConfirmed → TimestampChecked → Authorized
//! ```
//!
//! Every stage can end in `Rejected(reason)`. The first failure wins and no
//! later stage runs. The clock is read once, when the request is received.

use crate::adapters::clock::SystemClock;
use crate::config::{AuthConfig, ConfigError};
use crate::domain::canonical::CanonicalPayloadBuilder;
use crate::domain::entities::{Algorithm, SignedRequest, VerificationOutcome};
use crate::domain::errors::RejectionReason;
use crate::domain::principal::{Principal, PrincipalDeriver};
use crate::domain::timestamp::ReplayWindow;
use crate::domain::verifier::{BypassPolicy, SignatureVerifier};
use crate::ports::inbound::AuthenticationApi;
use crate::ports::outbound::Clock;
use std::fmt;
use tracing::{debug, info, warn};

/// Position of a request in the gate pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStage {
    /// Request accepted for evaluation.
    Received,
    /// Principal, key and signature have valid shapes.
    FormatValidated,
    /// Canonical payload rebuilt from server-observed fields.
    PayloadReconstructed,
    /// Signature verified under some algorithm.
    SignatureChecked,
    /// Public key derives the claimed principal.
    PrincipalConfirmed,
    /// Timestamp inside the replay window.
    TimestampChecked,
    /// All checks passed.
    Authorized,
}

impl GateStage {
    /// Stage name used in log fields.
    pub const fn as_str(&self) -> &'static str {
        match self {
            GateStage::Received => "received",
            GateStage::FormatValidated => "format_validated",
            GateStage::PayloadReconstructed => "payload_reconstructed",
            GateStage::SignatureChecked => "signature_checked",
            GateStage::PrincipalConfirmed => "principal_confirmed",
            GateStage::TimestampChecked => "timestamp_checked",
            GateStage::Authorized => "authorized",
        }
    }
}

impl fmt::Display for GateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless per-request authentication gate.
///
/// Holds only configuration fixed at construction, so a single instance can
/// be shared across any number of concurrent requests.
pub struct AuthenticationGate<C: Clock = SystemClock> {
    verifier: SignatureVerifier,
    window: ReplayWindow,
    clock: C,
}

impl AuthenticationGate<SystemClock> {
    /// Gate using the wall clock.
    pub fn new(config: AuthConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> AuthenticationGate<C> {
    /// Gate using a caller-provided clock.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from [`AuthConfig::validate`].
    pub fn with_clock(config: AuthConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;

        let bypass = if config.bypass_active() {
            warn!(
                environment = %config.environment,
                "Development signature bypass is ACTIVE; sentinel signatures skip verification"
            );
            BypassPolicy::AllowSentinel
        } else {
            BypassPolicy::Disabled
        };

        info!(
            environment = %config.environment,
            max_age_secs = config.max_message_age_secs,
            max_future_skew_secs = config.max_future_skew_secs,
            bypass_active = config.bypass_active(),
            "Authentication gate configured"
        );

        Ok(Self {
            verifier: SignatureVerifier::new(bypass),
            window: config.replay_window(),
            clock,
        })
    }

    /// Whether the bypass sentinel is honored.
    pub fn bypass_active(&self) -> bool {
        self.verifier.bypass_enabled()
    }

    /// Replay window in force.
    pub fn window(&self) -> ReplayWindow {
        self.window
    }

    fn evaluate(&self, request: &SignedRequest) -> Result<Principal, (GateStage, RejectionReason)> {
        let now = self.clock.now();
        let operation = request.operation;
        debug!(%operation, stage = %GateStage::Received, "Authenticating request");

        // 1. Shapes only; no cryptography yet.
        let claimed = Principal::parse(&request.author_principal)
            .map_err(|e| (GateStage::FormatValidated, RejectionReason::from(e)))?;
        if !has_valid_lengths(request) {
            return Err((GateStage::FormatValidated, RejectionReason::MalformedPayload));
        }
        debug!(%operation, stage = %GateStage::FormatValidated, "Credentials well-formed");

        // 2. Rebuild from observed fields.
        let payload = CanonicalPayloadBuilder::for_request(request)
            .map_err(|e| (GateStage::PayloadReconstructed, RejectionReason::from(e)))?;
        debug!(
            %operation,
            stage = %GateStage::PayloadReconstructed,
            payload_len = payload.len(),
            "Canonical payload rebuilt"
        );

        // 3.
        let hint = Algorithm::from_hint(request.algorithm_hint.as_deref())
            .map_err(|reason| (GateStage::SignatureChecked, reason))?;
        let verified = self
            .verifier
            .verify(
                payload.as_bytes(),
                &request.signature,
                &request.author_public_key,
                hint,
            )
            .map_err(|reason| (GateStage::SignatureChecked, reason))?;
        if verified.bypassed {
            warn!(%operation, "Signature check bypassed by development sentinel");
        }
        debug!(
            %operation,
            stage = %GateStage::SignatureChecked,
            algorithm = %verified.algorithm,
            "Signature verified"
        );

        // 4. Under the algorithm that actually verified.
        let matches =
            PrincipalDeriver::matches(&claimed, verified.algorithm, &request.author_public_key)
                .map_err(|e| (GateStage::PrincipalConfirmed, RejectionReason::from(e)))?;
        if !matches {
            return Err((GateStage::PrincipalConfirmed, RejectionReason::PrincipalMismatch));
        }
        debug!(%operation, stage = %GateStage::PrincipalConfirmed, "Principal confirmed");

        // 5.
        self.window
            .check(request.signed_at(), now)
            .map_err(|reason| (GateStage::TimestampChecked, reason))?;
        debug!(%operation, stage = %GateStage::TimestampChecked, "Timestamp fresh");

        Ok(claimed)
    }
}

impl<C: Clock> AuthenticationApi for AuthenticationGate<C> {
    fn authenticate(&self, request: &SignedRequest) -> VerificationOutcome {
        match self.evaluate(request) {
            Ok(principal) => {
                debug!(
                    operation = %request.operation,
                    stage = %GateStage::Authorized,
                    %principal,
                    "Request authorized"
                );
                VerificationOutcome::Authorized { principal }
            }
            Err((stage, reason)) => {
                warn!(
                    operation = %request.operation,
                    stage = %stage,
                    reason = reason.code(),
                    "Request rejected"
                );
                VerificationOutcome::Rejected { reason }
            }
        }
    }
}

impl<C: Clock> fmt::Debug for AuthenticationGate<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationGate")
            .field("window", &self.window)
            .field("bypass_active", &self.bypass_active())
            .finish_non_exhaustive()
    }
}

fn has_valid_lengths(request: &SignedRequest) -> bool {
    let key_len = request.author_public_key.len();
    request.signature.len() == shared_crypto::signatures::ED25519_SIGNATURE_LEN
        && Algorithm::TRY_ORDER
            .iter()
            .any(|algorithm| algorithm.accepts_key_len(key_len))
}
