//! # Adapters Layer
//!
//! - `clock`: system and fixed implementations of [`Clock`](crate::ports::Clock)
//! - `http`: JSON wire format, status mapping and an axum router

pub mod clock;
pub mod http;

pub use clock::{FixedClock, SystemClock};
pub use http::{authorize_body, router, RejectionBody, SignedRequestBody};
