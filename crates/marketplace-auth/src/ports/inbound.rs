//! # Inbound Ports (Driving Ports / API)
//!
//! The single entry point request handlers call before mutating state.

use crate::domain::entities::{SignedRequest, VerificationOutcome};
use crate::domain::errors::RejectionReason;
use crate::domain::principal::Principal;

/// Authentication API for mutating marketplace requests.
///
/// Implementations must be thread-safe (`Send + Sync`) and keep no
/// per-request state between calls.
pub trait AuthenticationApi: Send + Sync {
    /// Run every check on `request` and return the verdict.
    ///
    /// Never panics on untrusted input; every failure is a
    /// [`VerificationOutcome::Rejected`].
    fn authenticate(&self, request: &SignedRequest) -> VerificationOutcome;

    /// `authenticate` as a `Result`, for `?` in handlers.
    fn authorize(&self, request: &SignedRequest) -> Result<Principal, RejectionReason> {
        self.authenticate(request).into_result()
    }
}
