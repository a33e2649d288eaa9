//! Party runtime: answers inbound sessions and exposes the initiator
//! operations.

use std::sync::Arc;

use openbid_types::{PartyId, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::admin::AuctionAdmin;
use crate::bid::BidProtocol;
use crate::context::PartyContext;
use crate::ledger_service::LedgerService;
use crate::responder::AuctioneerResponder;
use crate::session::Session;

/// A running party.
///
/// Every inbound session is answered on its own task. Dropping the node
/// stops the accept loop; sessions already answered run to completion.
#[derive(Debug)]
pub struct PartyNode {
    ctx: PartyContext,
    in_flight: watch::Receiver<usize>,
    accept_loop: JoinHandle<()>,
}

impl PartyNode {
    /// Start answering sessions from `inbox`. Must be called inside a
    /// tokio runtime.
    #[must_use]
    pub fn start(ctx: PartyContext, mut inbox: mpsc::Receiver<Session>) -> Self {
        let (counter, in_flight) = watch::channel(0usize);
        let counter = Arc::new(counter);
        let responder = AuctioneerResponder::new(ctx.clone());
        let party = ctx.id();

        let accept_loop = tokio::spawn(async move {
            while let Some(session) = inbox.recv().await {
                let responder = responder.clone();
                let guard = InFlight::enter(&counter);
                tokio::spawn(async move {
                    let _guard = guard;
                    let counterparty = session.counterparty();
                    if let Err(err) = responder.respond(session).await {
                        tracing::warn!(party = %party, counterparty = %counterparty, error = %err, "Responder run failed");
                    }
                });
            }
            tracing::debug!(party = %party, "Inbox closed, accept loop stopped");
        });

        Self {
            ctx,
            in_flight,
            accept_loop,
        }
    }

    #[must_use]
    pub fn id(&self) -> PartyId {
        self.ctx.id()
    }

    #[must_use]
    pub fn context(&self) -> &PartyContext {
        &self.ctx
    }

    #[must_use]
    pub fn bids(&self) -> BidProtocol {
        BidProtocol::new(self.ctx.clone())
    }

    #[must_use]
    pub fn ledger(&self) -> LedgerService {
        LedgerService::new(self.ctx.clone())
    }

    #[must_use]
    pub fn admin(&self) -> AuctionAdmin {
        AuctionAdmin::new(self.ctx.clone())
    }

    /// Number of responder runs still in progress.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Wait until every accepted session has been fully answered, including
    /// any post-commit debit it triggered.
    pub async fn wait_idle(&self) -> Result<()> {
        let mut in_flight = self.in_flight.clone();
        in_flight
            .wait_for(|n| *n == 0)
            .await
            .map(|_| ())
            .map_err(|_| openbid_types::OpenbidError::Internal("accept loop stopped".to_string()))
    }
}

impl Drop for PartyNode {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

/// One counted responder run. Released on drop, so a panicking run is
/// still uncounted.
struct InFlight(Arc<watch::Sender<usize>>);

impl InFlight {
    fn enter(counter: &Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}
