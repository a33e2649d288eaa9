//! Escrow ledger operations: issuance, debits, and version races.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use openbid_protocol::{LedgerService, LocalCluster, Network, PartyContext, Recipients};
use openbid_settlement::{
    ContractRules, LocalNotary, SettlementCommit, StateQuery, StateStore, StaticDirectory,
};
use openbid_types::{
    BalanceLedger, CommitReceipt, Identity, OpenbidError, PartyId, ProtocolConfig, Result,
    SignedTransition,
};

fn cluster() -> LocalCluster {
    common::init_tracing();
    LocalCluster::with_names(ProtocolConfig::default(), &["auctioneer", "alice", "bob"]).unwrap()
}

fn id(cluster: &LocalCluster, name: &str) -> PartyId {
    cluster.node(name).unwrap().id()
}

#[tokio::test]
async fn issue_to_everyone_skips_self_and_notary() {
    let cluster = cluster();
    let ledger = cluster.node("auctioneer").unwrap().ledger();

    let issued = ledger.issue_cash(100, Recipients::Everyone).await.unwrap();

    assert_eq!(issued.balances.len(), 2);
    assert_eq!(issued.available(&id(&cluster, "alice")), Some(100));
    assert_eq!(issued.available(&id(&cluster, "bob")), Some(100));
    assert_eq!(issued.available(&id(&cluster, "auctioneer")), None);
    assert_eq!(issued.available(&cluster.notary().notary()), None);
    assert_eq!(ledger.current().unwrap().unwrap().state, issued);
}

#[tokio::test]
async fn issue_overwrites_previous_balance() {
    let cluster = cluster();
    let ledger = cluster.node("auctioneer").unwrap().ledger();
    let alice = id(&cluster, "alice");
    let bob = id(&cluster, "bob");

    ledger.issue_cash(100, Recipients::Everyone).await.unwrap();
    ledger.issue_cash(30, Recipients::One(alice)).await.unwrap();

    assert_eq!(ledger.balance_of(&alice).unwrap(), Some(30));
    assert_eq!(ledger.balance_of(&bob).unwrap(), Some(100));

    ledger.issue_cash(5, Recipients::Everyone).await.unwrap();
    assert_eq!(ledger.balance_of(&alice).unwrap(), Some(5));
    assert_eq!(ledger.balance_of(&bob).unwrap(), Some(5));
}

#[tokio::test]
async fn at_most_one_live_ledger_per_owner() {
    let cluster = cluster();
    let node = cluster.node("auctioneer").unwrap();
    let ledger = node.ledger();

    for amount in [10, 20, 30] {
        ledger.issue_cash(amount, Recipients::Everyone).await.unwrap();
    }
    ledger.update_ledger(id(&cluster, "alice"), 5).await.unwrap();

    let live = node.context().store.query_by_type::<BalanceLedger>().unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].state.available(&id(&cluster, "alice")), Some(25));
}

#[tokio::test]
async fn ledger_is_private_to_owner() {
    let cluster = cluster();
    let ledger = cluster.node("auctioneer").unwrap().ledger();
    ledger.issue_cash(100, Recipients::Everyone).await.unwrap();

    let alice_store = &cluster.node("alice").unwrap().context().store;
    assert!(alice_store.live_states().unwrap().is_empty());
    assert!(cluster.node("alice").unwrap().ledger().current().unwrap().is_none());
}

#[tokio::test]
async fn negative_issue_rejected() {
    let cluster = cluster();
    let ledger = cluster.node("auctioneer").unwrap().ledger();
    let err = ledger.issue_cash(-1, Recipients::Everyone).await.unwrap_err();
    assert!(matches!(err, OpenbidError::InvalidAmount { .. }));
    assert_eq!(cluster.notary().commit_count(), 0);
}

#[tokio::test]
async fn empty_recipient_set_commits_nothing() {
    let cluster = cluster();
    let ledger = cluster.node("auctioneer").unwrap().ledger();

    let result = ledger
        .issue_cash(50, Recipients::Many(BTreeSet::new()))
        .await
        .unwrap();
    assert!(result.balances.is_empty());
    assert_eq!(cluster.notary().commit_count(), 0);
    assert!(ledger.current().unwrap().is_none());

    // A lone party has nobody to issue to either.
    let solo = LocalCluster::with_names(ProtocolConfig::default(), &["solo"]).unwrap();
    let issued = solo
        .node("solo")
        .unwrap()
        .ledger()
        .issue_cash(50, Recipients::Everyone)
        .await
        .unwrap();
    assert!(issued.balances.is_empty());
    assert_eq!(solo.notary().commit_count(), 0);
}

#[tokio::test]
async fn update_without_ledger_fails() {
    let cluster = cluster();
    let ledger = cluster.node("auctioneer").unwrap().ledger();
    let err = ledger.update_ledger(id(&cluster, "alice"), 10).await.unwrap_err();
    assert!(matches!(err, OpenbidError::LedgerNotFound(p) if p == id(&cluster, "auctioneer")));
}

#[tokio::test]
async fn debit_may_go_negative() {
    let cluster = cluster();
    let ledger = cluster.node("auctioneer").unwrap().ledger();
    let alice = id(&cluster, "alice");

    ledger.issue_cash(10, Recipients::One(alice)).await.unwrap();
    let after = ledger.update_ledger(alice, 25).await.unwrap();
    assert_eq!(after.available(&alice), Some(-15));
    assert!(!ledger.solvency(&alice, 1));
}

#[tokio::test]
async fn debit_of_missing_entry_starts_from_zero() {
    let cluster = cluster();
    let ledger = cluster.node("auctioneer").unwrap().ledger();
    let alice = id(&cluster, "alice");
    let bob = id(&cluster, "bob");

    ledger.issue_cash(10, Recipients::One(alice)).await.unwrap();
    let after = ledger.update_ledger(bob, 4).await.unwrap();
    assert_eq!(after.available(&bob), Some(-4));
    assert_eq!(after.available(&alice), Some(10));
}

#[tokio::test]
async fn negative_debit_rejected() {
    let cluster = cluster();
    let ledger = cluster.node("auctioneer").unwrap().ledger();
    let alice = id(&cluster, "alice");
    ledger.issue_cash(10, Recipients::One(alice)).await.unwrap();

    let err = ledger.update_ledger(alice, -5).await.unwrap_err();
    assert!(matches!(err, OpenbidError::InvalidAmount { .. }));
    assert_eq!(ledger.balance_of(&alice).unwrap(), Some(10));
}

#[tokio::test]
async fn solvency_reads_own_ledger() {
    let cluster = cluster();
    let ledger = cluster.node("auctioneer").unwrap().ledger();
    let alice = id(&cluster, "alice");
    let bob = id(&cluster, "bob");

    assert!(!ledger.solvency(&alice, 0));
    ledger.issue_cash(50, Recipients::One(alice)).await.unwrap();
    assert!(ledger.solvency(&alice, 50));
    assert!(!ledger.solvency(&alice, 51));
    assert!(!ledger.solvency(&bob, 0));
}

/// Commit service that yields before proposing, so concurrent callers read
/// the same ledger version before either commits.
struct YieldingCommit(Arc<LocalNotary>);

#[async_trait]
impl SettlementCommit for YieldingCommit {
    fn notary(&self) -> PartyId {
        self.0.notary()
    }

    async fn propose(&self, signed: SignedTransition) -> Result<CommitReceipt> {
        tokio::task::yield_now().await;
        self.0.propose(signed).await
    }
}

fn racing_ledger(max_commit_retries: u32) -> (LedgerService, PartyId, PartyId) {
    common::init_tracing();
    let notary = Arc::new(LocalNotary::new(Identity::generate("notary")));
    let owner = Identity::generate("auctioneer");
    let alice = PartyId([1; 32]);
    let bob = PartyId([2; 32]);
    let config = ProtocolConfig {
        max_commit_retries,
        ..ProtocolConfig::default()
    };
    let ctx = PartyContext {
        store: notary.register(owner.id()),
        commit: Arc::new(YieldingCommit(Arc::clone(&notary))),
        verifier: Arc::new(ContractRules),
        directory: Arc::new(StaticDirectory::new([owner.id(), alice, bob], [notary.notary()])),
        network: Arc::new(Network::new(config.clone())),
        identity: Arc::new(owner),
        config,
    };
    (LedgerService::new(ctx), alice, bob)
}

#[tokio::test]
async fn racing_debits_retry_and_both_land() {
    let (ledger, alice, bob) = racing_ledger(3);
    ledger.issue_cash(100, Recipients::Everyone).await.unwrap();

    let (a, b) = tokio::join!(
        ledger.update_ledger_with_retry(alice, 30),
        ledger.update_ledger_with_retry(bob, 20),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(ledger.balance_of(&alice).unwrap(), Some(70));
    assert_eq!(ledger.balance_of(&bob).unwrap(), Some(80));
}

#[tokio::test]
async fn racing_debit_without_retries_conflicts() {
    let (ledger, alice, bob) = racing_ledger(0);
    ledger.issue_cash(100, Recipients::Everyone).await.unwrap();

    let (a, b) = tokio::join!(
        ledger.update_ledger_with_retry(alice, 30),
        ledger.update_ledger_with_retry(bob, 20),
    );
    let balances = (
        ledger.balance_of(&alice).unwrap(),
        ledger.balance_of(&bob).unwrap(),
    );
    match (a, b) {
        (Ok(_), Err(OpenbidError::Conflict { .. })) => assert_eq!(balances, (Some(70), Some(100))),
        (Err(OpenbidError::Conflict { .. }), Ok(_)) => assert_eq!(balances, (Some(100), Some(80))),
        other => panic!("expected exactly one conflict, got {other:?}"),
    }
}
