//! Globally unique identifiers used throughout OpenBid.
//!
//! Auctions and state versions use UUIDv7 for time-ordered sorting.
//! Parties are identified by their ed25519 public key, like the nodes of a
//! permissioned network.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// AuctionId
// ---------------------------------------------------------------------------

/// Globally unique auction identifier, immutable for the life of the auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AuctionId(pub Uuid);

impl AuctionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for AuctionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "auction:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// VersionId
// ---------------------------------------------------------------------------

/// Opaque token tied to one immutable snapshot of a state.
///
/// A version is produced by exactly one committed transition and consumed
/// by at most one. UUIDv7 keeps versions minted by one process ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct VersionId(pub Uuid);

impl VersionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for VersionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PartyId
// ---------------------------------------------------------------------------

/// Identity of a network participant: the raw ed25519 public key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PartyId(pub [u8; 32]);

impl PartyId {
    #[must_use]
    pub fn from_pubkey(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "party:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// TransitionId
// ---------------------------------------------------------------------------

/// SHA-256 over a transition's canonical signing payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TransitionId(pub [u8; 32]);

impl TransitionId {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx:{}", hex::encode(&self.0[..8]))
    }
}

/// Amount in minor currency units.
///
/// Signed because a post-settlement debit may drive a ledger entry below zero.
pub type Amount = i64;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
