//! # openbid-settlement
//!
//! **Ledger plane**: versioned state storage, contract rules, and the
//! commit service that replaces versions atomically.
//!
//! ## Architecture
//!
//! A protocol builds a [`Transition`](openbid_types::Transition) from states
//! it read out of its [`StateStore`], runs it past a [`TransitionVerifier`],
//! signs it, and hands it to a [`SettlementCommit`]. The commit service:
//! 1. Verifies every required signature
//! 2. Rejects inputs already consumed ([`ConsumedVersions`])
//! 3. Applies the replacement to every participant's store at once
//! 4. Returns a notary-signed receipt
//!
//! Reads are never locked across a round. A stale read is caught here, at
//! commit time, as `Conflict`.

pub mod commit;
pub mod consumed;
pub mod directory;
pub mod store;
pub mod verifier;

pub use commit::{LocalNotary, SettlementCommit};
pub use consumed::ConsumedVersions;
pub use directory::{Directory, StaticDirectory};
pub use store::{MemoryVault, StateQuery, StateStore};
pub use verifier::{ContractRules, TransitionVerifier};
