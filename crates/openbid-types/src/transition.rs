//! State transitions and commit receipts.
//!
//! A [`Transition`] consumes zero or more live versions and produces new
//! ones. It is identified by the SHA-256 of its canonical signing payload,
//! signed by its required signers, and handed to the commit service as a
//! [`SignedTransition`]. A successful commit returns a notary-signed
//! [`CommitReceipt`].

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    Amount, AuctionRecord, BalanceLedger, ContractState, Identity, OpenbidError, PartyId, Result,
    StateAndRef, TransitionId, VersionId, constants, verify_signature,
};

/// The business intent of a transition. Contract rules are keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Create the first version of an auction.
    OpenAuction,
    /// Record one bid on an auction.
    Bid { bidder: PartyId, amount: Amount },
    /// Produce the terminal, inactive auction version.
    CloseAuction,
    /// Set escrow balances for one or more counterparties.
    IssueCash { amount: Amount },
    /// Debit one counterparty's escrow after a won bid.
    UpdateLedger { counterparty: PartyId, amount: Amount },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAuction => write!(f, "OPEN_AUCTION"),
            Self::Bid { .. } => write!(f, "BID"),
            Self::CloseAuction => write!(f, "CLOSE_AUCTION"),
            Self::IssueCash { .. } => write!(f, "ISSUE_CASH"),
            Self::UpdateLedger { .. } => write!(f, "UPDATE_LEDGER"),
        }
    }
}

/// A proposed state change: consume `consumed`, produce `produced`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub command: Command,
    /// Versions this transition consumes. Each may be consumed only once.
    pub consumed: Vec<VersionId>,
    /// New versions, in order.
    pub produced: Vec<StateAndRef<ContractState>>,
    /// Parties whose signature is required for the transition to commit.
    pub required_signers: BTreeSet<PartyId>,
    /// Parties that must record the result without co-signing it.
    pub acknowledgers: BTreeSet<PartyId>,
    pub created_at: DateTime<Utc>,
}

impl Transition {
    /// An empty transition for `command`.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            command,
            consumed: Vec::new(),
            produced: Vec::new(),
            required_signers: BTreeSet::new(),
            acknowledgers: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn consuming(mut self, version: VersionId) -> Self {
        self.consumed.push(version);
        self
    }

    /// Append a produced state under a freshly minted version.
    #[must_use]
    pub fn producing(mut self, state: impl Into<ContractState>) -> Self {
        self.produced
            .push(StateAndRef::new(VersionId::new(), state.into()));
        self
    }

    #[must_use]
    pub fn signed_by(mut self, party: PartyId) -> Self {
        self.required_signers.insert(party);
        self
    }

    /// Add parties that record the result without signing it.
    #[must_use]
    pub fn acknowledged_by(mut self, parties: impl IntoIterator<Item = PartyId>) -> Self {
        self.acknowledgers.extend(parties);
        self
    }

    /// Every party whose store must reflect the transition.
    #[must_use]
    pub fn participants(&self) -> BTreeSet<PartyId> {
        self.required_signers
            .union(&self.acknowledgers)
            .copied()
            .collect()
    }

    #[must_use]
    pub fn produced_versions(&self) -> Vec<VersionId> {
        self.produced.iter().map(|s| s.version).collect()
    }

    /// Canonical signing payload.
    ///
    /// Format: `"openbid:transition:v1:" || command || consumed || produced
    /// || signers || acknowledgers || created_at`
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(512);
        payload.extend_from_slice(constants::TRANSITION_DOMAIN);
        encode_command(&mut payload, &self.command);

        payload.extend_from_slice(&(self.consumed.len() as u64).to_le_bytes());
        for version in &self.consumed {
            payload.extend_from_slice(version.0.as_bytes());
        }

        payload.extend_from_slice(&(self.produced.len() as u64).to_le_bytes());
        for produced in &self.produced {
            payload.extend_from_slice(produced.version.0.as_bytes());
            match &produced.state {
                ContractState::Auction(record) => encode_auction(&mut payload, record),
                ContractState::Ledger(ledger) => encode_ledger(&mut payload, ledger),
            }
        }

        for set in [&self.required_signers, &self.acknowledgers] {
            payload.extend_from_slice(&(set.len() as u64).to_le_bytes());
            for party in set {
                payload.extend_from_slice(party.as_bytes());
            }
        }
        payload.extend_from_slice(&self.created_at.timestamp_micros().to_le_bytes());
        payload
    }

    /// SHA-256 of the signing payload.
    #[must_use]
    pub fn id(&self) -> TransitionId {
        let hash = Sha256::digest(self.signing_payload());
        let mut id = [0u8; 32];
        id.copy_from_slice(&hash);
        TransitionId(id)
    }
}

fn encode_command(out: &mut Vec<u8>, command: &Command) {
    match command {
        Command::OpenAuction => out.push(0),
        Command::Bid { bidder, amount } => {
            out.push(1);
            out.extend_from_slice(bidder.as_bytes());
            out.extend_from_slice(&amount.to_le_bytes());
        }
        Command::CloseAuction => out.push(2),
        Command::IssueCash { amount } => {
            out.push(3);
            out.extend_from_slice(&amount.to_le_bytes());
        }
        Command::UpdateLedger {
            counterparty,
            amount,
        } => {
            out.push(4);
            out.extend_from_slice(counterparty.as_bytes());
            out.extend_from_slice(&amount.to_le_bytes());
        }
    }
}

fn encode_optional_amount(out: &mut Vec<u8>, amount: Option<Amount>) {
    match amount {
        Some(a) => {
            out.push(1);
            out.extend_from_slice(&a.to_le_bytes());
        }
        None => out.push(0),
    }
}

fn encode_optional_party(out: &mut Vec<u8>, party: Option<PartyId>) {
    match party {
        Some(p) => {
            out.push(1);
            out.extend_from_slice(p.as_bytes());
        }
        None => out.push(0),
    }
}

fn encode_auction(out: &mut Vec<u8>, record: &AuctionRecord) {
    out.push(b'A');
    out.extend_from_slice(record.auction_id.0.as_bytes());
    out.extend_from_slice(&(record.item.len() as u64).to_le_bytes());
    out.extend_from_slice(record.item.as_bytes());
    out.extend_from_slice(&record.base_price.to_le_bytes());
    encode_optional_amount(out, record.highest_bid);
    encode_optional_party(out, record.highest_bidder);
    out.extend_from_slice(&record.total_bids_amount.to_le_bytes());
    out.extend_from_slice(&record.bid_end_time.timestamp_micros().to_le_bytes());
    out.push(u8::from(record.active));
    out.extend_from_slice(record.auctioneer.as_bytes());
    out.extend_from_slice(&(record.bidders.len() as u64).to_le_bytes());
    for bidder in &record.bidders {
        out.extend_from_slice(bidder.as_bytes());
    }
    encode_optional_party(out, record.winner);
}

fn encode_ledger(out: &mut Vec<u8>, ledger: &BalanceLedger) {
    out.push(b'L');
    out.extend_from_slice(ledger.owner.as_bytes());
    out.extend_from_slice(&(ledger.balances.len() as u64).to_le_bytes());
    for (party, amount) in &ledger.balances {
        out.extend_from_slice(party.as_bytes());
        out.extend_from_slice(&amount.to_le_bytes());
    }
}

/// One party's signature over a transition's signing payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySignature {
    pub party: PartyId,
    pub signature: Vec<u8>,
}

/// A transition plus the signatures collected so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransition {
    pub transition: Transition,
    pub signatures: Vec<PartySignature>,
}

impl SignedTransition {
    /// Sign `transition` as `identity`.
    #[must_use]
    pub fn sign(transition: Transition, identity: &Identity) -> Self {
        let signature = identity.sign(&transition.signing_payload());
        Self {
            transition,
            signatures: vec![PartySignature {
                party: identity.id(),
                signature,
            }],
        }
    }

    /// Add a co-signature.
    pub fn add_signature(&mut self, identity: &Identity) {
        let signature = identity.sign(&self.transition.signing_payload());
        self.signatures.push(PartySignature {
            party: identity.id(),
            signature,
        });
    }

    #[must_use]
    pub fn id(&self) -> TransitionId {
        self.transition.id()
    }

    /// Required signers without a valid signature.
    #[must_use]
    pub fn missing_signers(&self) -> Vec<PartyId> {
        let payload = self.transition.signing_payload();
        self.transition
            .required_signers
            .iter()
            .filter(|party| {
                !self.signatures.iter().any(|s| {
                    s.party == **party && verify_signature(party, &payload, &s.signature)
                })
            })
            .copied()
            .collect()
    }

    /// Check every required signature.
    ///
    /// # Errors
    /// Returns `Verification` naming the first missing or invalid signer.
    pub fn verify_signatures(&self) -> Result<()> {
        if self.transition.required_signers.is_empty() {
            return Err(OpenbidError::Verification {
                reason: "transition has no required signers".to_string(),
            });
        }
        match self.missing_signers().first() {
            None => Ok(()),
            Some(party) => Err(OpenbidError::Verification {
                reason: format!("missing or invalid signature from {party}"),
            }),
        }
    }
}

/// Proof that a transition committed at every participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub transition_id: TransitionId,
    /// Versions consumed by the transition.
    pub consumed: Vec<VersionId>,
    /// Versions produced by the transition, now live.
    pub committed_versions: Vec<VersionId>,
    /// The commit service that finalized the transition.
    pub notary: PartyId,
    /// Notary signature over [`CommitReceipt::signing_bytes`].
    pub notary_signature: Vec<u8>,
    pub committed_at: DateTime<Utc>,
}

impl CommitReceipt {
    /// Bytes the notary signs: domain, transition id, consumed and
    /// produced versions, commit time.
    #[must_use]
    pub fn signing_bytes(
        transition_id: &TransitionId,
        consumed: &[VersionId],
        committed_versions: &[VersionId],
        committed_at: DateTime<Utc>,
    ) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(96 + 16 * (consumed.len() + committed_versions.len()));
        bytes.extend_from_slice(constants::RECEIPT_DOMAIN);
        bytes.extend_from_slice(transition_id.as_bytes());
        for versions in [consumed, committed_versions] {
            bytes.extend_from_slice(&(versions.len() as u64).to_le_bytes());
            for version in versions {
                bytes.extend_from_slice(version.0.as_bytes());
            }
        }
        bytes.extend_from_slice(&committed_at.timestamp_micros().to_le_bytes());
        bytes
    }

    /// Check the notary's signature.
    #[must_use]
    pub fn verify(&self) -> bool {
        verify_signature(
            &self.notary,
            &Self::signing_bytes(
                &self.transition_id,
                &self.consumed,
                &self.committed_versions,
                self.committed_at,
            ),
            &self.notary_signature,
        )
    }
}
