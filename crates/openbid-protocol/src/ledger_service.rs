//! Ledger service: the owner-side operations on a party's escrow ledger.
//!
//! ```text
//!   issue_cash(amount, targets)      balances[t] = amount   for every target
//!   update_ledger(counterparty, a)   balances[c] -= a       (may go negative)
//! ```
//!
//! Every mutation consumes the owner's live ledger version (if any) and
//! produces the next one through the commit service. The owner is the only
//! signer and the only participant.

use std::collections::BTreeSet;

use openbid_settlement::StateQuery;
use openbid_types::{
    Amount, BalanceLedger, Command, ContractState, OpenbidError, PartyId, Result, StateAndRef,
    Transition,
};

use crate::context::PartyContext;

/// Who receives issued cash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    /// A single counterparty.
    One(PartyId),
    /// An explicit set.
    Many(BTreeSet<PartyId>),
    /// Every directory participant except this party and service identities.
    Everyone,
}

/// Escrow ledger operations for one party.
#[derive(Debug, Clone)]
pub struct LedgerService {
    ctx: PartyContext,
}

impl LedgerService {
    #[must_use]
    pub fn new(ctx: PartyContext) -> Self {
        Self { ctx }
    }

    /// This party's live ledger, if cash was ever issued.
    pub fn current(&self) -> Result<Option<StateAndRef<BalanceLedger>>> {
        self.ctx.store.query_by_key::<BalanceLedger>(&self.ctx.id())
    }

    /// Escrowed amount held for `counterparty`.
    pub fn balance_of(&self, counterparty: &PartyId) -> Result<Option<Amount>> {
        Ok(self
            .current()?
            .and_then(|ledger| ledger.state.available(counterparty)))
    }

    /// Whether `counterparty` can cover `amount`.
    ///
    /// Never fails: a missing ledger, a missing entry, or a store error all
    /// answer `false`.
    #[must_use]
    pub fn solvency(&self, counterparty: &PartyId, amount: Amount) -> bool {
        match self.current() {
            Ok(Some(ledger)) => ledger.state.covers(counterparty, amount),
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(
                    counterparty = %counterparty,
                    error = %err,
                    "Ledger lookup failed, reporting insolvent"
                );
                false
            }
        }
    }

    /// Set `balances[t] = amount` for every target, overwriting.
    ///
    /// With no resolved targets nothing is committed and the current ledger
    /// (or an empty one) is returned.
    ///
    /// # Errors
    /// `InvalidAmount` for a negative amount; commit errors are returned as-is.
    pub async fn issue_cash(&self, amount: Amount, recipients: Recipients) -> Result<BalanceLedger> {
        if amount < 0 {
            return Err(OpenbidError::InvalidAmount {
                reason: format!("cannot issue negative amount {amount}"),
            });
        }
        let me = self.ctx.id();
        let targets = match recipients {
            Recipients::One(party) => BTreeSet::from([party]),
            Recipients::Many(parties) => parties,
            Recipients::Everyone => self.ctx.directory.counterparties_of(&me),
        };

        let current = self.current()?;
        if targets.is_empty() {
            tracing::debug!(owner = %me, "Issue with no recipients, nothing to commit");
            return Ok(current.map_or_else(|| BalanceLedger::new(me), |c| c.state));
        }

        let base = current
            .as_ref()
            .map_or_else(|| BalanceLedger::new(me), |c| c.state.clone());
        let next = base.with_issued(&targets, amount);

        let mut transition = Transition::new(Command::IssueCash { amount });
        let mut inputs = Vec::new();
        if let Some(prior) = current {
            transition = transition.consuming(prior.version);
            inputs.push(StateAndRef::new(prior.version, ContractState::Ledger(prior.state)));
        }
        let transition = transition.producing(next.clone()).signed_by(me);
        let receipt = self.ctx.commit_alone(transition, &inputs).await?;

        tracing::info!(
            owner = %me,
            amount,
            recipients = targets.len(),
            transition = %receipt.transition_id,
            "Cash issued"
        );
        Ok(next)
    }

    /// Debit `amount` from `counterparty`'s escrow.
    ///
    /// # Errors
    /// `LedgerNotFound` if this party has no ledger, `InvalidAmount` for a
    /// negative amount, and commit errors as-is.
    pub async fn update_ledger(&self, counterparty: PartyId, amount: Amount) -> Result<BalanceLedger> {
        if amount < 0 {
            return Err(OpenbidError::InvalidAmount {
                reason: format!("cannot debit negative amount {amount}"),
            });
        }
        let me = self.ctx.id();
        let prior = self.current()?.ok_or(OpenbidError::LedgerNotFound(me))?;
        let next = prior.state.with_debit(counterparty, amount)?;

        let transition = Transition::new(Command::UpdateLedger {
            counterparty,
            amount,
        })
        .consuming(prior.version)
        .producing(next.clone())
        .signed_by(me);
        let inputs = [StateAndRef::new(prior.version, ContractState::Ledger(prior.state))];
        let receipt = self.ctx.commit_alone(transition, &inputs).await?;

        tracing::info!(
            owner = %me,
            counterparty = %counterparty,
            amount,
            remaining = next.available(&counterparty).unwrap_or_default(),
            transition = %receipt.transition_id,
            "Ledger debited"
        );
        Ok(next)
    }

    /// [`update_ledger`](Self::update_ledger), re-reading and retrying on
    /// `Conflict` up to `max_commit_retries` times.
    pub async fn update_ledger_with_retry(
        &self,
        counterparty: PartyId,
        amount: Amount,
    ) -> Result<BalanceLedger> {
        let mut attempt = 0;
        loop {
            match self.update_ledger(counterparty, amount).await {
                Err(OpenbidError::Conflict { version }) if attempt < self.ctx.config.max_commit_retries => {
                    attempt += 1;
                    tracing::debug!(%version, attempt, "Ledger version raced, retrying debit");
                    tokio::task::yield_now().await;
                }
                result => return result,
            }
        }
    }
}
