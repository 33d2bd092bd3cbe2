//! # HTTP Adapter
//!
//! JSON wire format for signed write requests and the mapping of
//! [`RejectionReason`] onto HTTP responses.
//!
//! | Reason | Status |
//! |--------|--------|
//! | `malformed_payload`, `unsupported_algorithm` | 400 |
//! | `signature_mismatch`, `principal_mismatch`, `expired_or_future_timestamp` | 401 |
//!
//! Response bodies name the reason code and a generic message. They never
//! carry the reconstructed payload or comparison details.

use crate::domain::entities::{RequestFields, SignedRequest};
use crate::domain::errors::RejectionReason;
use crate::domain::principal::Principal;
use crate::domain::timestamp::{canonical_timestamp, parse_timestamp};
use crate::ports::inbound::AuthenticationApi;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Route served by [`router`].
pub const VERIFY_ROUTE: &str = "/auth/verify";

/// Signed request as it travels over HTTP.
///
/// Unknown keys, including any client-side copy of the signed payload, are
/// ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedRequestBody {
    /// Operation tag, e.g. `script_upload`.
    pub operation: String,
    /// Operation fields (JSON object).
    #[serde(default)]
    pub fields: Value,
    /// RFC 3339 signing time.
    pub timestamp: String,
    /// Base64 (standard) signature.
    pub signature: String,
    /// Base64 (standard) public key.
    pub author_public_key: String,
    /// Claimed principal.
    pub author_principal: String,
    /// Optional algorithm hint.
    #[serde(default, alias = "algorithm_hint", skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

impl SignedRequestBody {
    /// Decode into a domain request.
    ///
    /// Every decoding failure is [`RejectionReason::MalformedPayload`].
    pub fn into_signed_request(self) -> Result<SignedRequest, RejectionReason> {
        let operation = self.operation.trim().parse()?;
        let fields = match self.fields {
            Value::Object(map) => RequestFields::from(map),
            Value::Null => RequestFields::new(),
            _ => return Err(RejectionReason::MalformedPayload),
        };

        Ok(SignedRequest {
            operation,
            fields,
            signature: decode_base64(&self.signature)?,
            author_public_key: decode_base64(&self.author_public_key)?,
            author_principal: self.author_principal,
            timestamp: parse_timestamp(&self.timestamp)?,
            algorithm_hint: self.algorithm,
        })
    }

    /// Encode a domain request for transmission.
    pub fn from_signed_request(request: &SignedRequest) -> Self {
        Self {
            operation: request.operation.as_str().to_string(),
            fields: Value::Object(request.fields.as_map().clone()),
            timestamp: canonical_timestamp(request.timestamp),
            signature: BASE64.encode(&request.signature),
            author_public_key: BASE64.encode(&request.author_public_key),
            author_principal: request.author_principal.clone(),
            algorithm: request.algorithm_hint.clone(),
        }
    }
}

fn decode_base64(text: &str) -> Result<Vec<u8>, RejectionReason> {
    BASE64
        .decode(text.trim())
        .map_err(|_| RejectionReason::MalformedPayload)
}

/// Error body returned on rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionBody {
    /// Stable reason code.
    pub error: String,
    /// Generic human-readable message.
    pub message: String,
}

impl From<RejectionReason> for RejectionBody {
    fn from(reason: RejectionReason) -> Self {
        Self {
            error: reason.code().to_string(),
            message: reason.to_string(),
        }
    }
}

/// Body returned by [`VERIFY_ROUTE`] on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedBody {
    /// Authoritative author of the request.
    pub principal: Principal,
}

/// HTTP status for a rejection.
pub fn status_for(reason: RejectionReason) -> StatusCode {
    if reason.is_authentication_failure() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::BAD_REQUEST
    }
}

impl IntoResponse for RejectionReason {
    fn into_response(self) -> Response {
        (status_for(self), Json(RejectionBody::from(self))).into_response()
    }
}

/// Decode a raw JSON body and authenticate it.
pub fn authorize_body<A>(gate: &A, body: &str) -> Result<Principal, RejectionReason>
where
    A: AuthenticationApi + ?Sized,
{
    let wire: SignedRequestBody =
        serde_json::from_str(body).map_err(|_| RejectionReason::MalformedPayload)?;
    let request = wire.into_signed_request()?;
    gate.authorize(&request)
}

/// Router exposing the gate at [`VERIFY_ROUTE`].
pub fn router<A>(gate: Arc<A>) -> Router
where
    A: AuthenticationApi + 'static,
{
    Router::new()
        .route(VERIFY_ROUTE, post(handle_verify::<A>))
        .with_state(gate)
}

async fn handle_verify<A>(State(gate): State<Arc<A>>, body: String) -> Response
where
    A: AuthenticationApi + 'static,
{
    match authorize_body(gate.as_ref(), &body) {
        Ok(principal) => (StatusCode::OK, Json(AuthorizedBody { principal })).into_response(),
        Err(reason) => reason.into_response(),
    }
}
