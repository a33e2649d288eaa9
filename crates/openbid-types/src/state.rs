//! Versioned state envelopes.
//!
//! A state store holds [`StateAndRef`] pairs: an immutable [`ContractState`]
//! plus the [`VersionId`] of that snapshot. [`Queryable`] lets callers pull
//! typed views out of the untyped store.

use serde::{Deserialize, Serialize};

use crate::{AuctionId, AuctionRecord, BalanceLedger, PartyId, VersionId};

/// Every kind of state the protocol commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractState {
    Auction(AuctionRecord),
    Ledger(BalanceLedger),
}

impl ContractState {
    /// Short kind name, used in logs and verification messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auction(_) => "auction",
            Self::Ledger(_) => "ledger",
        }
    }
}

/// A state together with the version that identifies this snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAndRef<T> {
    pub version: VersionId,
    pub state: T,
}

impl<T> StateAndRef<T> {
    #[must_use]
    pub fn new(version: VersionId, state: T) -> Self {
        Self { version, state }
    }
}

/// A state type that can be selected from the store and looked up by key.
pub trait Queryable: Clone + Send + Sync + 'static {
    /// Natural key: at most one live version per key.
    type Key: PartialEq + Send + Sync;

    /// Borrow `Self` out of a stored state, if it is of this kind.
    fn extract(state: &ContractState) -> Option<&Self>;

    fn key(&self) -> Self::Key;
}

impl Queryable for AuctionRecord {
    type Key = AuctionId;

    fn extract(state: &ContractState) -> Option<&Self> {
        match state {
            ContractState::Auction(record) => Some(record),
            ContractState::Ledger(_) => None,
        }
    }

    fn key(&self) -> AuctionId {
        self.auction_id
    }
}

impl Queryable for BalanceLedger {
    type Key = PartyId;

    fn extract(state: &ContractState) -> Option<&Self> {
        match state {
            ContractState::Ledger(ledger) => Some(ledger),
            ContractState::Auction(_) => None,
        }
    }

    fn key(&self) -> PartyId {
        self.owner
    }
}

impl From<AuctionRecord> for ContractState {
    fn from(record: AuctionRecord) -> Self {
        Self::Auction(record)
    }
}

impl From<BalanceLedger> for ContractState {
    fn from(ledger: BalanceLedger) -> Self {
        Self::Ledger(ledger)
    }
}
