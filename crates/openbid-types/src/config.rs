//! Configuration for OpenBid protocol runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{OpenbidError, Result, constants};

/// Per-party protocol configuration.
///
/// Every field has a default, so a config document only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Upper bound on a single session receive.
    pub session_timeout_ms: u64,
    /// Capacity of each direction of a session channel.
    pub session_buffer: usize,
    /// Capacity of the party's inbound-session queue.
    pub inbox_capacity: usize,
    /// Reject bids submitted after the auction's `bid_end_time`.
    pub enforce_bid_deadline: bool,
    /// Reject bids below the auction's `base_price`.
    pub enforce_base_price: bool,
    /// Retries for ledger updates that lose a version race.
    pub max_commit_retries: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            session_timeout_ms: constants::DEFAULT_SESSION_TIMEOUT_MS,
            session_buffer: constants::DEFAULT_SESSION_BUFFER,
            inbox_capacity: constants::DEFAULT_INBOX_CAPACITY,
            enforce_bid_deadline: true,
            enforce_base_price: true,
            max_commit_retries: constants::DEFAULT_MAX_COMMIT_RETRIES,
        }
    }
}

impl ProtocolConfig {
    /// Parse a JSON config document and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| OpenbidError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values that would make sessions unusable.
    pub fn validate(&self) -> Result<()> {
        if self.session_timeout_ms == 0 {
            return Err(OpenbidError::Configuration(
                "session_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.session_buffer == 0 || self.inbox_capacity == 0 {
            return Err(OpenbidError::Configuration(
                "session_buffer and inbox_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}
