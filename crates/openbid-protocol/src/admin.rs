//! Auction lifecycle operations run by the auctioneer.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use openbid_settlement::StateQuery;
use openbid_types::{
    Amount, AuctionId, AuctionRecord, Command, ContractState, OpenbidError, PartyId, Result,
    StateAndRef, Transition,
};

use crate::context::PartyContext;

/// Opens and closes auctions administered by this party.
#[derive(Debug, Clone)]
pub struct AuctionAdmin {
    ctx: PartyContext,
}

impl AuctionAdmin {
    #[must_use]
    pub fn new(ctx: PartyContext) -> Self {
        Self { ctx }
    }

    /// Create the first version of an auction, visible to every bidder.
    ///
    /// # Errors
    /// `InvalidBid` for a negative base price or an empty bidder set;
    /// `PartyNotFound` for a bidder unknown to the directory.
    pub async fn open_auction(
        &self,
        item: impl Into<String>,
        base_price: Amount,
        bid_end_time: DateTime<Utc>,
        bidders: BTreeSet<PartyId>,
    ) -> Result<AuctionRecord> {
        let me = self.ctx.id();
        if base_price < 0 {
            return Err(OpenbidError::InvalidBid {
                reason: format!("base price must not be negative, got {base_price}"),
            });
        }
        if bidders.is_empty() {
            return Err(OpenbidError::InvalidBid {
                reason: "an auction needs at least one bidder".to_string(),
            });
        }
        let known = self.ctx.directory.participants();
        if let Some(unknown) = bidders.iter().find(|b| !known.contains(b)) {
            return Err(OpenbidError::PartyNotFound(*unknown));
        }

        let record = AuctionRecord::new(item, base_price, bid_end_time, me, bidders);
        let transition = Transition::new(Command::OpenAuction)
            .producing(record.clone())
            .signed_by(me)
            .acknowledged_by(record.bidders.iter().copied());
        let receipt = self.ctx.commit_alone(transition, &[]).await?;

        tracing::info!(
            auction = %record.auction_id,
            item = %record.item,
            base_price,
            bidders = record.bidders.len(),
            transition = %receipt.transition_id,
            "Auction opened"
        );
        Ok(record)
    }

    /// Produce the terminal version: inactive, winner fixed to the leader.
    ///
    /// # Errors
    /// `AuctionNotFound`, `AuctionClosed` if already closed, `Verification`
    /// if this party is not the auctioneer.
    pub async fn close_auction(&self, auction_id: AuctionId) -> Result<AuctionRecord> {
        let me = self.ctx.id();
        let current = self
            .ctx
            .store
            .query_by_key::<AuctionRecord>(&auction_id)?
            .ok_or(OpenbidError::AuctionNotFound(auction_id))?;
        if !current.state.active {
            return Err(OpenbidError::AuctionClosed(auction_id));
        }
        if current.state.auctioneer != me {
            return Err(OpenbidError::Verification {
                reason: format!("only the auctioneer can close {auction_id}"),
            });
        }

        let closed = current.state.closed();
        let transition = Transition::new(Command::CloseAuction)
            .consuming(current.version)
            .producing(closed.clone())
            .signed_by(me)
            .acknowledged_by(current.state.bidders.iter().copied());
        let inputs = [StateAndRef::new(current.version, ContractState::Auction(current.state))];
        let receipt = self.ctx.commit_alone(transition, &inputs).await?;

        tracing::info!(
            auction = %auction_id,
            winner = ?closed.winner,
            highest_bid = ?closed.highest_bid,
            transition = %receipt.transition_id,
            "Auction closed"
        );
        Ok(closed)
    }
}
