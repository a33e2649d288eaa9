//! Auction state for the OpenBid settlement protocol.
//!
//! An [`AuctionRecord`] is an immutable value. Every accepted bid replaces
//! the current version with a new one through the commit service; nothing
//! mutates a record in place.
//!
//! ## Leader rule
//!
//! ```text
//!   highest_bid == None          → bid leads unconditionally
//!   bid_amount  >  highest_bid   → bid leads
//!   bid_amount  <= highest_bid   → existing leader kept (ties favour incumbent)
//! ```
//!
//! Every submission adds to `total_bids_amount`, leader or not.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, AuctionId, OpenbidError, PartyId, Result};

/// One version of an auction's shared state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionRecord {
    /// Globally unique auction identifier.
    pub auction_id: AuctionId,
    /// Opaque descriptor of the item on sale.
    pub item: String,
    /// Minimum acceptable bid.
    pub base_price: Amount,
    /// Current winning amount, `None` until the first bid.
    pub highest_bid: Option<Amount>,
    /// Submitter of `highest_bid`.
    pub highest_bidder: Option<PartyId>,
    /// Audit sum of every accepted submission.
    pub total_bids_amount: Amount,
    /// Deadline after which bids are refused.
    pub bid_end_time: DateTime<Utc>,
    /// `false` once the auction is closed.
    pub active: bool,
    /// Administrator of the auction and holder of bidder escrow.
    pub auctioneer: PartyId,
    /// Parties eligible to bid, fixed at creation.
    pub bidders: BTreeSet<PartyId>,
    /// Set on close.
    pub winner: Option<PartyId>,
}

/// Result of applying one bid to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidOutcome {
    /// The successor version.
    pub record: AuctionRecord,
    /// Whether the bid displaced (or established) the leader.
    pub became_leader: bool,
}

impl AuctionRecord {
    /// A fresh, active auction with no bids.
    #[must_use]
    pub fn new(
        item: impl Into<String>,
        base_price: Amount,
        bid_end_time: DateTime<Utc>,
        auctioneer: PartyId,
        bidders: BTreeSet<PartyId>,
    ) -> Self {
        Self {
            auction_id: AuctionId::new(),
            item: item.into(),
            base_price,
            highest_bid: None,
            highest_bidder: None,
            total_bids_amount: 0,
            bid_end_time,
            active: true,
            auctioneer,
            bidders,
            winner: None,
        }
    }

    /// Every party that must see a new version: the auctioneer and all bidders.
    #[must_use]
    pub fn participants(&self) -> BTreeSet<PartyId> {
        let mut parties = self.bidders.clone();
        parties.insert(self.auctioneer);
        parties
    }

    /// Would `amount` take the lead? Strictly greater than the current bid.
    #[must_use]
    pub fn outbids(&self, amount: Amount) -> bool {
        self.highest_bid.is_none_or(|current| amount > current)
    }

    /// Compute the successor version for a bid of `amount` by `bidder`.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the audit total would overflow.
    pub fn with_bid(&self, bidder: PartyId, amount: Amount) -> Result<BidOutcome> {
        let total_bids_amount = self
            .total_bids_amount
            .checked_add(amount)
            .ok_or(OpenbidError::AmountOverflow)?;
        let became_leader = self.outbids(amount);

        let mut record = self.clone();
        record.total_bids_amount = total_bids_amount;
        if became_leader {
            record.highest_bid = Some(amount);
            record.highest_bidder = Some(bidder);
        }
        Ok(BidOutcome {
            record,
            became_leader,
        })
    }

    /// The terminal version: inactive, winner fixed to the current leader.
    #[must_use]
    pub fn closed(&self) -> Self {
        let mut record = self.clone();
        record.active = false;
        record.winner = self.highest_bidder;
        record
    }

    /// Returns `true` if a bid at `now` would arrive after the deadline.
    #[must_use]
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now > self.bid_end_time
    }

    /// Returns `true` if the fields fixed at creation match `other`.
    #[must_use]
    pub fn same_terms(&self, other: &Self) -> bool {
        self.auction_id == other.auction_id
            && self.item == other.item
            && self.base_price == other.base_price
            && self.bid_end_time == other.bid_end_time
            && self.auctioneer == other.auctioneer
            && self.bidders == other.bidders
    }
}

/// Record fixtures for unit tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl AuctionRecord {
    /// An active auction ending in one hour.
    pub fn dummy(auctioneer: PartyId, bidders: &[PartyId], base_price: Amount) -> Self {
        Self::new(
            "Lot 1",
            base_price,
            Utc::now() + chrono::Duration::hours(1),
            auctioneer,
            bidders.iter().copied().collect(),
        )
    }
}
