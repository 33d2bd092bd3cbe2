//! # Ports Layer
//!
//! - `inbound`: the API request handlers call
//! - `outbound`: what the gate needs from its environment

pub mod inbound;
pub mod outbound;

pub use inbound::AuthenticationApi;
pub use outbound::Clock;
