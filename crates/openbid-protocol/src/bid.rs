//! Bid protocol: one bidding round, driven by the bidder.
//!
//! ```text
//! 1. Read the live auction version            → AuctionNotFound
//! 2. Guards: amount, active, deadline, base   → InvalidBid / AuctionClosed / BidDeadlinePassed
//! 3. Session to auctioneer: AuctioneerCheck   → InsufficientBalance on `false`
//! 4. Successor version via the leader rule
//! 5. Verify contract rules, sign as bidder
//! 6. PassiveAck sessions with every other bidder
//! 7. Commit (consume read version, produce successor)
//! 8. Finalized notice on every open session
//! ```
//!
//! Nothing before step 7 changes state anywhere. A failed commit leaves
//! every store untouched; the caller re-reads and resubmits on `Conflict`.

use openbid_settlement::StateQuery;
use openbid_types::{
    Amount, AuctionId, AuctionRecord, CommitReceipt, Command, ContractState, OpenbidError, Result,
    RoundOutcome, SessionMessage, SessionRole, StateAndRef, Transition,
};

use crate::context::PartyContext;
use crate::session::Session;

/// Initiator side of a bidding round.
#[derive(Debug, Clone)]
pub struct BidProtocol {
    ctx: PartyContext,
}

impl BidProtocol {
    #[must_use]
    pub fn new(ctx: PartyContext) -> Self {
        Self { ctx }
    }

    /// Submit a bid of `amount` on `auction_id` and return the committed
    /// auction version.
    ///
    /// # Errors
    /// Guard failures and `InsufficientBalance` change nothing. `Conflict`
    /// means another bid committed on the same version first.
    pub async fn submit_bid(&self, amount: Amount, auction_id: AuctionId) -> Result<AuctionRecord> {
        let current = self.check(amount, auction_id)?;
        tracing::info!(
            auction = %auction_id,
            bidder = %self.ctx.id(),
            amount,
            version = %current.version,
            "Submitting bid"
        );

        let mut sessions = Vec::new();
        let result = self.run_round(&current, amount, &mut sessions).await;

        let outcome = match &result {
            Ok((receipt, record)) => RoundOutcome::Committed {
                receipt: receipt.clone(),
                record: record.clone(),
            },
            Err(err) => RoundOutcome::Aborted {
                reason: err.to_string(),
            },
        };
        for session in &sessions {
            if let Err(err) = session.send(SessionMessage::Finalized(outcome.clone())).await {
                tracing::debug!(counterparty = %session.counterparty(), error = %err, "Finalized notice not delivered");
            }
        }

        match result {
            Ok((receipt, record)) => {
                tracing::info!(
                    auction = %auction_id,
                    transition = %receipt.transition_id,
                    highest_bid = ?record.highest_bid,
                    total = record.total_bids_amount,
                    "Bid committed"
                );
                Ok(record)
            }
            Err(err) => {
                tracing::warn!(auction = %auction_id, amount, error = %err, "Bid failed");
                Err(match err {
                    OpenbidError::Notarization { reason } => OpenbidError::SettlementFailed { reason },
                    other => other,
                })
            }
        }
    }

    /// Steps 1 and 2: read the auction and apply local guards.
    fn check(&self, amount: Amount, auction_id: AuctionId) -> Result<StateAndRef<AuctionRecord>> {
        if amount <= 0 {
            return Err(OpenbidError::InvalidBid {
                reason: format!("amount must be positive, got {amount}"),
            });
        }
        let current = self
            .ctx
            .store
            .query_by_key::<AuctionRecord>(&auction_id)?
            .ok_or(OpenbidError::AuctionNotFound(auction_id))?;
        let record = &current.state;

        if !record.active {
            return Err(OpenbidError::AuctionClosed(auction_id));
        }
        if self.ctx.config.enforce_bid_deadline && record.is_past_deadline(chrono::Utc::now()) {
            return Err(OpenbidError::BidDeadlinePassed {
                auction_id,
                end_time: record.bid_end_time,
            });
        }
        if self.ctx.config.enforce_base_price && amount < record.base_price {
            return Err(OpenbidError::InvalidBid {
                reason: format!("amount {amount} is below base price {}", record.base_price),
            });
        }
        if !record.bidders.contains(&self.ctx.id()) {
            return Err(OpenbidError::InvalidBid {
                reason: format!("{} is not a bidder on {auction_id}", self.ctx.id()),
            });
        }
        Ok(current)
    }

    /// Steps 3 to 7. Every session opened is pushed to `sessions` so the
    /// caller can finalize it whatever the outcome.
    async fn run_round(
        &self,
        current: &StateAndRef<AuctionRecord>,
        amount: Amount,
        sessions: &mut Vec<Session>,
    ) -> Result<(CommitReceipt, AuctionRecord)> {
        let me = self.ctx.id();
        let record = &current.state;

        let mut auctioneer = self.ctx.network.initiate(me, record.auctioneer).await?;
        auctioneer
            .send(SessionMessage::Open(SessionRole::AuctioneerCheck {
                auction_id: record.auction_id,
                amount,
            }))
            .await?;
        let solvent = auctioneer.receive_solvency().await;
        sessions.push(auctioneer);
        if !solvent? {
            return Err(OpenbidError::InsufficientBalance {
                needed: amount,
                auctioneer: record.auctioneer,
            });
        }

        let outcome = record.with_bid(me, amount)?;
        tracing::debug!(
            auction = %record.auction_id,
            became_leader = outcome.became_leader,
            "Successor version computed"
        );
        let transition = Transition::new(Command::Bid { bidder: me, amount })
            .consuming(current.version)
            .producing(outcome.record.clone())
            .signed_by(me)
            .acknowledged_by(record.participants().into_iter().filter(|p| *p != me));
        let inputs = [StateAndRef::new(current.version, ContractState::Auction(record.clone()))];
        let signed = self.ctx.verify_and_sign(transition, &inputs)?;

        for bidder in record.bidders.iter().filter(|b| **b != me) {
            let session = self.ctx.network.initiate(me, *bidder).await?;
            session.send(SessionMessage::Open(SessionRole::PassiveAck)).await?;
            sessions.push(session);
        }

        let receipt = self.ctx.commit.propose(signed).await?;
        Ok((receipt, outcome.record))
    }
}
