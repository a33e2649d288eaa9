//! # openbid-types
//!
//! Shared types, errors, and configuration for the **OpenBid** auction
//! settlement protocol.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AuctionId`], [`VersionId`], [`PartyId`], [`TransitionId`], [`Amount`]
//! - **Auction model**: [`AuctionRecord`], [`BidOutcome`]
//! - **Escrow model**: [`BalanceLedger`]
//! - **State envelopes**: [`ContractState`], [`StateAndRef`], [`Queryable`]
//! - **Transitions**: [`Command`], [`Transition`], [`SignedTransition`], [`CommitReceipt`]
//! - **Identity**: [`Identity`], [`verify_signature`]
//! - **Session messages**: [`SessionMessage`], [`SessionRole`], [`RoundOutcome`]
//! - **Configuration**: [`ProtocolConfig`]
//! - **Errors**: [`OpenbidError`] with `OB_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod auction;
pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod ids;
pub mod ledger;
pub mod message;
pub mod state;
pub mod transition;

// Re-export all primary types at crate root for ergonomic imports:
//   use openbid_types::{AuctionRecord, BalanceLedger, Transition, ...};

pub use auction::*;
pub use config::*;
pub use error::*;
pub use identity::*;
pub use ids::*;
pub use ledger::*;
pub use message::*;
pub use state::*;
pub use transition::*;

// Constants are accessed via `openbid_types::constants::FOO`
// (not re-exported to avoid name collisions).
