//! Shared fixtures for protocol scenario tests.

#![allow(dead_code)]

use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use openbid_protocol::{LocalCluster, PartyNode, Recipients};
use openbid_settlement::StateQuery;
use openbid_types::{Amount, AuctionId, AuctionRecord, BalanceLedger, PartyId, ProtocolConfig};
use tracing_subscriber::EnvFilter;

pub const BASE_PRICE: Amount = 10;

/// Install a test-writer subscriber once. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A cluster with one auctioneer, three bidders and one open auction.
pub struct Scenario {
    pub cluster: LocalCluster,
    pub auction_id: AuctionId,
}

impl Scenario {
    pub async fn start(escrow: &[(&str, Amount)]) -> Self {
        Self::start_with(ProtocolConfig::default(), escrow, Duration::hours(1)).await
    }

    /// Open an auction ending `ends_in` from now and issue `escrow` at the
    /// auctioneer, one recipient at a time.
    pub async fn start_with(config: ProtocolConfig, escrow: &[(&str, Amount)], ends_in: Duration) -> Self {
        init_tracing();
        let cluster =
            LocalCluster::with_names(config, &["auctioneer", "alice", "bob", "carol", "dave"]).unwrap();
        let bidders: BTreeSet<PartyId> = ["alice", "bob", "carol"]
            .iter()
            .map(|name| cluster.node(name).unwrap().id())
            .collect();

        let auctioneer = cluster.node("auctioneer").unwrap();
        let record = auctioneer
            .admin()
            .open_auction("Lot 7: brass sextant", BASE_PRICE, Utc::now() + ends_in, bidders)
            .await
            .unwrap();
        for (name, amount) in escrow {
            let party = cluster.node(name).unwrap().id();
            auctioneer
                .ledger()
                .issue_cash(*amount, Recipients::One(party))
                .await
                .unwrap();
        }

        Self {
            auction_id: record.auction_id,
            cluster,
        }
    }

    pub fn node(&self, name: &str) -> &PartyNode {
        self.cluster.node(name).unwrap()
    }

    pub fn id(&self, name: &str) -> PartyId {
        self.node(name).id()
    }

    /// The live auction version as seen by `name`.
    pub fn auction_at(&self, name: &str) -> Option<AuctionRecord> {
        self.node(name)
            .context()
            .store
            .query_by_key::<AuctionRecord>(&self.auction_id)
            .unwrap()
            .map(|s| s.state)
    }

    /// Escrow the auctioneer holds for `name`.
    pub fn escrow_of(&self, name: &str) -> Option<Amount> {
        self.node("auctioneer")
            .ledger()
            .balance_of(&self.id(name))
            .unwrap()
    }

    pub fn auctioneer_ledger(&self) -> Option<BalanceLedger> {
        self.node("auctioneer").ledger().current().unwrap().map(|s| s.state)
    }

    pub async fn bid(&self, name: &str, amount: Amount) -> openbid_types::Result<AuctionRecord> {
        self.node(name).bids().submit_bid(amount, self.auction_id).await
    }

    pub fn commits(&self) -> u64 {
        self.cluster.notary().commit_count()
    }
}
