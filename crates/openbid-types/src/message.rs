//! Messages exchanged on a bid session.
//!
//! ```text
//!   initiator                                   responder
//!   ─────────                                   ─────────
//!   Open(AuctioneerCheck{auction_id, amount}) ─▶
//!                                            ◀─ Solvency(bool)
//!   Finalized(Committed | Aborted)            ─▶  (debit if auctioneer & won)
//!
//!   Open(PassiveAck)                          ─▶
//!   Finalized(Committed | Aborted)            ─▶
//! ```
//!
//! The first message fixes the responder's role for the whole session.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Amount, AuctionId, AuctionRecord, CommitReceipt};

/// Role announced by the initiator in the first message of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionRole {
    /// The responder is the auctioneer: check the bidder's escrow for `amount`.
    AuctioneerCheck { auction_id: AuctionId, amount: Amount },
    /// The responder is another bidder: acknowledge the outcome only.
    PassiveAck,
}

/// Final word on a bid round, sent to every open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// The transition committed; `record` is the new auction version.
    Committed {
        receipt: CommitReceipt,
        record: AuctionRecord,
    },
    /// The round ended without a state change.
    Aborted { reason: String },
}

/// Every message that can travel on a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMessage {
    Open(SessionRole),
    Solvency(bool),
    Finalized(RoundOutcome),
}

impl SessionMessage {
    /// Variant name, used in `UnexpectedMessage` errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Open(_) => "Open",
            Self::Solvency(_) => "Solvency",
            Self::Finalized(_) => "Finalized",
        }
    }
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuctioneerCheck { .. } => write!(f, "AUCTIONEER"),
            Self::PassiveAck => write!(f, "PASSIVE"),
        }
    }
}
