//! Responder side of a bidding round.
//!
//! The first message fixes the role:
//!
//! - `AuctioneerCheck`: answer solvency from this party's own ledger, then
//!   wait for the outcome and debit the bidder if its bid took the lead.
//! - `PassiveAck`: record nothing, just wait for the outcome.
//!
//! The solvency answer is always sent. Any lookup failure degrades to
//! `false` rather than dropping the session.
//!
//! Whether a checked bid committed is read from this party's own store,
//! never from the bidder's `Finalized` notice. The notice may be missing,
//! late, or forged; the store only changes through the commit service.

use std::sync::Arc;

use openbid_settlement::{ConsumedVersions, StateQuery};
use openbid_types::{
    Amount, AuctionId, AuctionRecord, ContractState, PartyId, Result, RoundOutcome, SessionMessage,
    SessionRole, StateAndRef,
};
use parking_lot::Mutex;

use crate::context::PartyContext;
use crate::ledger_service::LedgerService;
use crate::session::Session;

/// Answers inbound bid sessions for one party.
#[derive(Debug, Clone)]
pub struct AuctioneerResponder {
    ctx: PartyContext,
    ledger: LedgerService,
    /// Auction versions whose winning bid was already debited.
    settled: Arc<Mutex<ConsumedVersions>>,
}

impl AuctioneerResponder {
    #[must_use]
    pub fn new(ctx: PartyContext) -> Self {
        let ledger = LedgerService::new(ctx.clone());
        Self {
            ctx,
            ledger,
            settled: Arc::default(),
        }
    }

    /// Run one session to completion.
    ///
    /// # Errors
    /// Session failures. A checked bid is still settled from the store
    /// before a missing `Finalized` notice is reported.
    pub async fn respond(&self, mut session: Session) -> Result<()> {
        match session.receive_open().await? {
            SessionRole::AuctioneerCheck { auction_id, amount } => {
                self.answer_check(&mut session, auction_id, amount).await
            }
            SessionRole::PassiveAck => {
                let outcome = session.receive_finalized().await?;
                tracing::debug!(
                    bidder = %session.counterparty(),
                    committed = matches!(outcome, RoundOutcome::Committed { .. }),
                    "Passive round finished"
                );
                Ok(())
            }
        }
    }

    async fn answer_check(&self, session: &mut Session, auction_id: AuctionId, amount: Amount) -> Result<()> {
        let bidder = session.counterparty();
        let checked = self.checked_auction(auction_id, bidder);
        let solvent = checked.is_some() && self.ledger.solvency(&bidder, amount);
        tracing::info!(auction = %auction_id, bidder = %bidder, amount, solvent, "Solvency checked");
        session.send(SessionMessage::Solvency(solvent)).await?;

        let notice = session.receive_finalized().await;
        match &notice {
            Ok(RoundOutcome::Committed { receipt, .. }) => {
                let ours = receipt.verify()
                    && receipt.notary == self.ctx.commit.notary()
                    && checked.as_ref().is_some_and(|c| receipt.consumed.contains(&c.version));
                if !ours {
                    tracing::warn!(auction = %auction_id, bidder = %bidder, "Finalized receipt does not match the checked round");
                }
            }
            Ok(RoundOutcome::Aborted { reason }) => {
                tracing::debug!(auction = %auction_id, bidder = %bidder, %reason, "Round aborted");
            }
            Err(err) => {
                tracing::debug!(auction = %auction_id, bidder = %bidder, error = %err, "No Finalized notice, settling from own store");
            }
        }

        if let Some(checked) = checked.filter(|_| solvent) {
            self.settle(&checked, bidder, amount).await?;
        }
        notice.map(|_| ())
    }

    /// Debit `bidder` if this party's store shows that the checked version
    /// was consumed by exactly the bid that was checked, and that bid led.
    async fn settle(&self, checked: &StateAndRef<AuctionRecord>, bidder: PartyId, amount: Amount) -> Result<()> {
        let auction_id = checked.state.auction_id;
        let Some(successors) = self.ctx.store.successors(&checked.version)? else {
            tracing::info!(auction = %auction_id, bidder = %bidder, "Checked version still live, bid not committed");
            return Ok(());
        };
        let expected = checked.state.with_bid(bidder, amount)?;
        let committed = matches!(
            successors.as_slice(),
            [StateAndRef { state: ContractState::Auction(record), .. }] if *record == expected.record
        );
        if !committed {
            tracing::info!(
                auction = %auction_id,
                bidder = %bidder,
                checked = %checked.version,
                "Checked version consumed by a different transition, not debiting"
            );
            return Ok(());
        }
        if !expected.became_leader {
            tracing::info!(auction = %auction_id, bidder = %bidder, amount, "Bid did not take the lead, no debit");
            return Ok(());
        }
        if self.settled.lock().consume(&[checked.version]).is_err() {
            tracing::debug!(auction = %auction_id, checked = %checked.version, "Winning bid already debited");
            return Ok(());
        }
        self.ledger.update_ledger_with_retry(bidder, amount).await?;
        Ok(())
    }

    /// The auction version this party vouches for: it must exist here, be
    /// administered by this party and list `bidder`.
    fn checked_auction(&self, auction_id: AuctionId, bidder: PartyId) -> Option<StateAndRef<AuctionRecord>> {
        match self.ctx.store.query_by_key::<AuctionRecord>(&auction_id) {
            Ok(Some(current))
                if current.state.auctioneer == self.ctx.id() && current.state.bidders.contains(&bidder) =>
            {
                Some(current)
            }
            Ok(_) => {
                tracing::warn!(auction = %auction_id, bidder = %bidder, "Unknown auction or bidder");
                None
            }
            Err(err) => {
                tracing::warn!(auction = %auction_id, error = %err, "Auction lookup failed");
                None
            }
        }
    }
}
