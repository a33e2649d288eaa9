//! Per-owner escrow ledger.
//!
//! `balances[c]` is the amount the ledger `owner` holds in escrow on behalf
//! of counterparty `c`: how much `c` may spend against the owner. Issuing
//! cash sets it, a solvency check reads it, and a won bid debits it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Amount, OpenbidError, PartyId, Result};

/// One version of a party's escrow ledger. The owner is the only writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLedger {
    /// The party that owns and signs every version of this ledger.
    pub owner: PartyId,
    /// Escrowed amount per counterparty.
    pub balances: BTreeMap<PartyId, Amount>,
}

impl BalanceLedger {
    /// An empty ledger for `owner`.
    #[must_use]
    pub fn new(owner: PartyId) -> Self {
        Self {
            owner,
            balances: BTreeMap::new(),
        }
    }

    /// Escrowed amount for `counterparty`, if any cash was ever issued to it.
    #[must_use]
    pub fn available(&self, counterparty: &PartyId) -> Option<Amount> {
        self.balances.get(counterparty).copied()
    }

    /// Whether `counterparty` can cover a spend of `amount`.
    ///
    /// A counterparty with no entry never covers anything: there is no
    /// implicit credit.
    #[must_use]
    pub fn covers(&self, counterparty: &PartyId, amount: Amount) -> bool {
        self.available(counterparty)
            .is_some_and(|available| available >= amount)
    }

    /// Successor version with `balances[r] = amount` for every recipient.
    ///
    /// Issuance overwrites; it never adds to a previous balance.
    #[must_use]
    pub fn with_issued<'a>(
        &self,
        recipients: impl IntoIterator<Item = &'a PartyId>,
        amount: Amount,
    ) -> Self {
        let mut next = self.clone();
        for recipient in recipients {
            next.balances.insert(*recipient, amount);
        }
        next
    }

    /// Successor version with `amount` debited from `counterparty`.
    ///
    /// No floor is enforced: solvency was checked when the bid was made.
    /// A missing entry is debited from zero.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the subtraction overflows.
    pub fn with_debit(&self, counterparty: PartyId, amount: Amount) -> Result<Self> {
        let current = self.available(&counterparty).unwrap_or(0);
        let remaining = current
            .checked_sub(amount)
            .ok_or(OpenbidError::AmountOverflow)?;
        let mut next = self.clone();
        next.balances.insert(counterparty, remaining);
        Ok(next)
    }

    /// Sum of all escrowed balances.
    #[must_use]
    pub fn total_escrowed(&self) -> Amount {
        self.balances.values().sum()
    }
}
