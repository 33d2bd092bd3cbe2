//! # Timestamps and the Replay Window
//!
//! Signing times travel as RFC 3339 UTC strings with whole-second precision.
//! A request is fresh when `now - max_age <= signed_at <= now + max_future_skew`
//! (both ends inclusive).

use super::errors::RejectionReason;
use chrono::{DateTime, SubsecRound, Utc};

/// Format used for the `timestamp` key of canonical payloads.
pub const CANONICAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Render a signing time the way it is embedded in the canonical payload.
///
/// Sub-second precision is truncated so client and server agree on the bytes.
pub fn canonical_timestamp(at: DateTime<Utc>) -> String {
    at.trunc_subsecs(0)
        .format(CANONICAL_TIMESTAMP_FORMAT)
        .to_string()
}

/// Parse a client timestamp (any RFC 3339 offset), normalized to UTC seconds.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, RejectionReason> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(0))
        .map_err(|_| RejectionReason::MalformedPayload)
}

/// Accepted freshness window around the server clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayWindow {
    max_age_secs: u64,
    max_future_skew_secs: u64,
}

impl ReplayWindow {
    /// Window accepting timestamps up to `max_age_secs` old and
    /// `max_future_skew_secs` ahead of the server clock.
    pub const fn new(max_age_secs: u64, max_future_skew_secs: u64) -> Self {
        Self {
            max_age_secs,
            max_future_skew_secs,
        }
    }

    /// Oldest accepted age in seconds.
    pub const fn max_age_secs(&self) -> u64 {
        self.max_age_secs
    }

    /// Largest accepted lead over the server clock in seconds.
    pub const fn max_future_skew_secs(&self) -> u64 {
        self.max_future_skew_secs
    }

    /// Check `signed_at` against a single reading of the server clock.
    pub fn check(
        &self,
        signed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), RejectionReason> {
        let signed = signed_at.timestamp();
        let now = now.trunc_subsecs(0).timestamp();

        let age = i128::from(now) - i128::from(signed);
        if age > i128::from(self.max_age_secs) {
            return Err(RejectionReason::ExpiredOrFutureTimestamp);
        }
        if -age > i128::from(self.max_future_skew_secs) {
            return Err(RejectionReason::ExpiredOrFutureTimestamp);
        }
        Ok(())
    }
}
