//! # Outbound Ports (Driven Ports / SPI)
//!
//! Dependencies the gate needs from its environment.

use chrono::{DateTime, Utc};

/// Source of "now" for replay-window checks.
///
/// Read exactly once per request.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
