//! Bidding rounds across a full in-process cluster.
//!
//! Every scenario runs an auctioneer, three registered bidders and one
//! outsider over the reference notary, and checks the state every party
//! ends up with.

mod common;

use chrono::Duration;
use common::{BASE_PRICE, Scenario};
use openbid_types::{OpenbidError, ProtocolConfig};

const PARTIES: [&str; 4] = ["auctioneer", "alice", "bob", "carol"];

#[tokio::test]
async fn highest_bid_is_max_of_solvent_bids() {
    let s = Scenario::start(&[("alice", 100), ("bob", 100), ("carol", 100)]).await;

    s.bid("alice", 50).await.unwrap();
    s.bid("carol", 30).await.unwrap();
    s.bid("bob", 70).await.unwrap();
    let last = s.bid("alice", 20).await.unwrap();

    assert_eq!(last.highest_bid, Some(70));
    assert_eq!(last.highest_bidder, Some(s.id("bob")));
    assert_eq!(last.total_bids_amount, 50 + 30 + 70 + 20);

    for name in PARTIES {
        assert_eq!(s.auction_at(name).as_ref(), Some(&last), "{name} disagrees");
    }
}

#[tokio::test]
async fn tie_keeps_first_submitter() {
    let s = Scenario::start(&[("alice", 100), ("bob", 100)]).await;

    s.bid("alice", 40).await.unwrap();
    let after_tie = s.bid("bob", 40).await.unwrap();

    assert_eq!(after_tie.highest_bid, Some(40));
    assert_eq!(after_tie.highest_bidder, Some(s.id("alice")));
    assert_eq!(after_tie.total_bids_amount, 80);
}

#[tokio::test]
async fn insolvent_bid_changes_nothing() {
    let s = Scenario::start(&[("alice", 40)]).await;
    let before = s.auction_at("alice").unwrap();
    let ledger_before = s.auctioneer_ledger();
    let commits_before = s.commits();

    let err = s.bid("alice", 50).await.unwrap_err();
    assert!(
        matches!(err, OpenbidError::InsufficientBalance { needed: 50, auctioneer } if auctioneer == s.id("auctioneer")),
        "Expected InsufficientBalance, got: {err:?}"
    );
    assert!(!err.is_retryable());

    s.cluster.wait_idle().await.unwrap();
    assert_eq!(s.commits(), commits_before);
    assert_eq!(s.auctioneer_ledger(), ledger_before);
    for name in PARTIES {
        assert_eq!(s.auction_at(name).as_ref(), Some(&before));
    }
}

#[tokio::test]
async fn bid_of_exact_balance_is_solvent() {
    let s = Scenario::start(&[("alice", 40)]).await;
    let record = s.bid("alice", 40).await.unwrap();
    assert_eq!(record.highest_bidder, Some(s.id("alice")));
}

#[tokio::test]
async fn missing_entry_is_always_insolvent() {
    let s = Scenario::start(&[("bob", 1_000)]).await;
    let err = s.bid("alice", BASE_PRICE).await.unwrap_err();
    assert!(matches!(err, OpenbidError::InsufficientBalance { .. }));
}

#[tokio::test]
async fn missing_ledger_is_always_insolvent() {
    let s = Scenario::start(&[]).await;
    assert!(s.auctioneer_ledger().is_none());
    let err = s.bid("alice", BASE_PRICE).await.unwrap_err();
    assert!(matches!(err, OpenbidError::InsufficientBalance { .. }));
}

#[tokio::test]
async fn concurrent_bids_on_same_version_one_commits() {
    let s = Scenario::start(&[("alice", 100), ("bob", 100)]).await;

    let (a, b) = tokio::join!(s.bid("alice", 30), s.bid("bob", 40));
    let (winner, loser) = match (a, b) {
        (Ok(record), Err(err)) | (Err(err), Ok(record)) => (record, err),
        other => panic!("expected exactly one commit, got {other:?}"),
    };
    assert!(matches!(loser, OpenbidError::Conflict { .. }), "got {loser:?}");
    assert!(loser.is_retryable());
    assert_eq!(winner.total_bids_amount, winner.highest_bid.unwrap());

    // The loser re-reads and resubmits.
    s.cluster.wait_idle().await.unwrap();
    let loser_name = if winner.highest_bidder == Some(s.id("alice")) { "bob" } else { "alice" };
    let retried = s.bid(loser_name, 50).await.unwrap();
    assert_eq!(retried.highest_bidder, Some(s.id(loser_name)));
    assert_eq!(retried.total_bids_amount, winner.total_bids_amount + 50);
}

#[tokio::test]
async fn leading_bid_is_debited_exactly_once() {
    let s = Scenario::start(&[("alice", 100), ("bob", 100)]).await;
    let commits_before = s.commits();

    s.bid("alice", 60).await.unwrap();
    s.cluster.wait_idle().await.unwrap();

    assert_eq!(s.escrow_of("alice"), Some(40));
    assert_eq!(s.escrow_of("bob"), Some(100));
    // The bid itself plus one debit.
    assert_eq!(s.commits(), commits_before + 2);
}

#[tokio::test]
async fn non_leading_bid_is_not_debited() {
    let s = Scenario::start(&[("alice", 100), ("bob", 100)]).await;

    s.bid("alice", 60).await.unwrap();
    s.bid("bob", 60).await.unwrap();
    s.bid("bob", 20).await.unwrap();
    s.cluster.wait_idle().await.unwrap();

    assert_eq!(s.escrow_of("alice"), Some(40));
    assert_eq!(s.escrow_of("bob"), Some(100));
}

#[tokio::test]
async fn displaced_leader_is_not_refunded() {
    let s = Scenario::start(&[("alice", 100), ("bob", 100)]).await;

    s.bid("alice", 30).await.unwrap();
    s.bid("bob", 45).await.unwrap();
    s.cluster.wait_idle().await.unwrap();

    assert_eq!(s.escrow_of("alice"), Some(70));
    assert_eq!(s.escrow_of("bob"), Some(55));
}

#[tokio::test]
async fn debit_reduces_later_solvency() {
    let s = Scenario::start(&[("alice", 100)]).await;

    s.bid("alice", 70).await.unwrap();
    s.cluster.wait_idle().await.unwrap();

    let err = s.bid("alice", 80).await.unwrap_err();
    assert!(matches!(err, OpenbidError::InsufficientBalance { needed: 80, .. }));
}

#[tokio::test]
async fn committed_record_round_trips_through_store() {
    let s = Scenario::start(&[("alice", 100), ("bob", 100)]).await;

    let first = s.bid("alice", 25).await.unwrap();
    let stored = s.auction_at("bob").unwrap();
    assert_eq!(stored, first);

    let from_store = stored.with_bid(s.id("bob"), 35).unwrap();
    let from_memory = first.with_bid(s.id("bob"), 35).unwrap();
    assert_eq!(from_store, from_memory);

    let second = s.bid("bob", 35).await.unwrap();
    assert_eq!(second, from_store.record);
}

#[tokio::test]
async fn guards_reject_without_mutation() {
    let s = Scenario::start(&[("alice", 100)]).await;
    let commits_before = s.commits();

    for amount in [0, -5] {
        let err = s.bid("alice", amount).await.unwrap_err();
        assert!(matches!(err, OpenbidError::InvalidBid { .. }), "amount {amount}: {err:?}");
    }
    let err = s.bid("alice", BASE_PRICE - 1).await.unwrap_err();
    assert!(matches!(err, OpenbidError::InvalidBid { .. }));

    let err = s
        .node("alice")
        .bids()
        .submit_bid(20, openbid_types::AuctionId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OpenbidError::AuctionNotFound(_)));

    assert_eq!(s.commits(), commits_before);
    assert_eq!(s.auction_at("alice").unwrap().total_bids_amount, 0);
}

#[tokio::test]
async fn outsider_never_sees_the_auction() {
    let s = Scenario::start(&[("alice", 100)]).await;
    assert!(s.auction_at("dave").is_none());
    let err = s.bid("dave", 20).await.unwrap_err();
    assert!(matches!(err, OpenbidError::AuctionNotFound(_)));
}

#[tokio::test]
async fn bid_after_deadline_rejected() {
    let s = Scenario::start_with(ProtocolConfig::default(), &[("alice", 100)], Duration::seconds(-1)).await;
    let err = s.bid("alice", 20).await.unwrap_err();
    assert!(matches!(err, OpenbidError::BidDeadlinePassed { .. }));
}

#[tokio::test]
async fn deadline_and_base_price_can_be_disabled() {
    let config = ProtocolConfig {
        enforce_bid_deadline: false,
        enforce_base_price: false,
        ..ProtocolConfig::default()
    };
    let s = Scenario::start_with(config, &[("alice", 100)], Duration::seconds(-1)).await;
    let record = s.bid("alice", BASE_PRICE - 5).await.unwrap();
    assert_eq!(record.highest_bid, Some(BASE_PRICE - 5));
}

#[tokio::test]
async fn closed_auction_refuses_bids() {
    let s = Scenario::start(&[("alice", 100), ("bob", 100)]).await;
    s.bid("alice", 30).await.unwrap();
    s.bid("bob", 45).await.unwrap();
    s.cluster.wait_idle().await.unwrap();

    let closed = s.node("auctioneer").admin().close_auction(s.auction_id).await.unwrap();
    assert!(!closed.active);
    assert_eq!(closed.winner, Some(s.id("bob")));
    for name in PARTIES {
        assert_eq!(s.auction_at(name).as_ref(), Some(&closed));
    }

    let err = s.bid("alice", 90).await.unwrap_err();
    assert!(matches!(err, OpenbidError::AuctionClosed(id) if id == s.auction_id));

    let err = s.node("auctioneer").admin().close_auction(s.auction_id).await.unwrap_err();
    assert!(matches!(err, OpenbidError::AuctionClosed(_)));
}

#[tokio::test]
async fn only_auctioneer_closes() {
    let s = Scenario::start(&[]).await;
    let err = s.node("alice").admin().close_auction(s.auction_id).await.unwrap_err();
    assert!(matches!(err, OpenbidError::Verification { .. }));
    assert!(s.auction_at("alice").unwrap().active);
}

#[tokio::test]
async fn silent_auctioneer_times_out() {
    let config = ProtocolConfig {
        session_timeout_ms: 100,
        ..ProtocolConfig::default()
    };
    let s = Scenario::start_with(config, &[("alice", 100)], Duration::hours(1)).await;
    // Replace the auctioneer's inbox with one nobody reads.
    let _silent = s.cluster.network().register(s.id("auctioneer"));

    let err = s.bid("alice", 20).await.unwrap_err();
    assert!(
        matches!(err, OpenbidError::SessionTimeout { counterparty, timeout_ms: 100 } if counterparty == s.id("auctioneer")),
        "got {err:?}"
    );
    assert!(err.is_retryable());
    assert_eq!(s.auction_at("alice").unwrap().total_bids_amount, 0);
}

#[tokio::test]
async fn unreachable_auctioneer_is_reported() {
    let s = Scenario::start(&[("alice", 100)]).await;
    s.cluster.network().deregister(&s.id("auctioneer"));

    let err = s.bid("alice", 20).await.unwrap_err();
    assert!(matches!(err, OpenbidError::PartyNotFound(p) if p == s.id("auctioneer")));
}
