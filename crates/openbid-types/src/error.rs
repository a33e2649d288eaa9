//! Error types for the OpenBid settlement protocol.
//!
//! All errors use the `OB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Auction errors
//! - 2xx: Balance / ledger errors
//! - 4xx: Commit / settlement errors
//! - 7xx: Session and network errors
//! - 9xx: General / internal errors

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{Amount, AuctionId, PartyId, VersionId};

/// Central error enum for all OpenBid operations.
#[derive(Debug, Error)]
pub enum OpenbidError {
    // =================================================================
    // Auction Errors (1xx)
    // =================================================================
    /// No current AuctionRecord matches the requested auction.
    #[error("OB_ERR_100: Auction not found: {0}")]
    AuctionNotFound(AuctionId),

    /// The auction has been closed; no further bids are accepted.
    #[error("OB_ERR_101: Auction closed: {0}")]
    AuctionClosed(AuctionId),

    /// The bid arrived after the auction's bid end time.
    #[error("OB_ERR_102: Bid deadline passed for {auction_id} (ended {end_time})")]
    BidDeadlinePassed {
        auction_id: AuctionId,
        end_time: DateTime<Utc>,
    },

    /// The bid is structurally invalid (non-positive, below base price).
    #[error("OB_ERR_103: Invalid bid: {reason}")]
    InvalidBid { reason: String },

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// The auctioneer reported that the bidder's escrow does not cover the bid.
    #[error("OB_ERR_200: Insufficient balance: bid of {needed} rejected by {auctioneer}")]
    InsufficientBalance { needed: Amount, auctioneer: PartyId },

    /// A ledger debit was attempted before any cash was issued.
    #[error("OB_ERR_201: Ledger not found for owner {0}")]
    LedgerNotFound(PartyId),

    /// A ledger amount was out of range (e.g. negative issuance).
    #[error("OB_ERR_202: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Arithmetic on an amount overflowed.
    #[error("OB_ERR_203: Amount overflow")]
    AmountOverflow,

    // =================================================================
    // Commit Errors (4xx)
    // =================================================================
    /// Another transition consumed the same version first. Re-read and retry.
    #[error("OB_ERR_400: Conflict: version {version} already consumed")]
    Conflict { version: VersionId },

    /// The proposed transition violates a contract rule.
    #[error("OB_ERR_401: Verification failed: {reason}")]
    Verification { reason: String },

    /// The commit service could not finalize the transition.
    #[error("OB_ERR_402: Notarization failed: {reason}")]
    Notarization { reason: String },

    /// A protocol run could not settle its transition. No party's state changed.
    #[error("OB_ERR_403: Settlement failed: {reason}")]
    SettlementFailed { reason: String },

    // =================================================================
    // Session / Network Errors (7xx)
    // =================================================================
    /// The counterparty is not reachable on this network.
    #[error("OB_ERR_700: Party not found: {0}")]
    PartyNotFound(PartyId),

    /// The counterparty closed the session.
    #[error("OB_ERR_701: Session closed by {0}")]
    SessionClosed(PartyId),

    /// The counterparty did not answer in time.
    #[error("OB_ERR_702: Session with {counterparty} timed out after {timeout_ms}ms")]
    SessionTimeout { counterparty: PartyId, timeout_ms: u64 },

    /// The counterparty sent a message out of protocol order.
    #[error("OB_ERR_703: Unexpected message: expected {expected}, got {actual}")]
    UnexpectedMessage { expected: String, actual: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("OB_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("OB_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config document, out-of-range values).
    #[error("OB_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl OpenbidError {
    /// Whether the whole round may be retried from a fresh read.
    ///
    /// Business rejections (`InsufficientBalance`, `Verification`, ...) are
    /// final: retrying with the same input yields the same answer.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. }
                | Self::Notarization { .. }
                | Self::SettlementFailed { .. }
                | Self::SessionTimeout { .. }
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OpenbidError>;

impl From<serde_json::Error> for OpenbidError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
