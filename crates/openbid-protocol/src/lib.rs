//! # openbid-protocol
//!
//! **Protocol plane**: the cross-party message exchanges that settle a bid
//! and keep every escrow ledger consistent with it.
//!
//! ## Round
//!
//! ```text
//!   bidder                    auctioneer                 other bidders
//!   ──────                    ──────────                 ─────────────
//!   AuctioneerCheck(amount) ─▶ solvency from own ledger
//!                           ◀─ Solvency(bool)
//!   successor version, sign
//!   PassiveAck ─────────────────────────────────────────▶
//!   propose ──▶ commit service ──▶ every store
//!   Finalized ──────────────▶ debit if bid took the lead
//!   Finalized ──────────────────────────────────────────▶
//! ```
//!
//! ## Components
//!
//! - [`BidProtocol`]: initiator side of a round
//! - [`AuctioneerResponder`]: auctioneer and passive-bidder side
//! - [`LedgerService`]: `IssueCash` and `UpdateLedger` on a party's escrow
//! - [`AuctionAdmin`]: opening and closing auctions
//! - [`PartyNode`], [`Network`], [`LocalCluster`]: in-process runtime

pub mod admin;
pub mod bid;
pub mod cluster;
pub mod context;
pub mod ledger_service;
pub mod network;
pub mod node;
pub mod responder;
pub mod session;

pub use admin::AuctionAdmin;
pub use bid::BidProtocol;
pub use cluster::LocalCluster;
pub use context::PartyContext;
pub use ledger_service::{LedgerService, Recipients};
pub use network::Network;
pub use node::PartyNode;
pub use responder::AuctioneerResponder;
pub use session::Session;
