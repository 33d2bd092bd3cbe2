//! # Domain Layer
//!
//! Pure logic with no I/O dependencies: canonical payload construction,
//! principal derivation, signature checks and the replay window.
//! This is the inner layer of the hexagonal architecture.

pub mod canonical;
pub mod entities;
pub mod errors;
pub mod principal;
pub mod timestamp;
pub mod verifier;
