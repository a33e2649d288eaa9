//! Settlement commit: the single point of atomicity.
//!
//! A protocol hands a fully signed transition to a [`SettlementCommit`]
//! and gets back a notary-signed [`CommitReceipt`]. The commit either lands
//! in every participant's store or in none of them.
//!
//! ## Commit steps ([`LocalNotary`])
//!
//! ```text
//! 1. Verify every required signature         → Verification
//! 2. Reject already-consumed inputs          → Conflict
//! 3. Resolve participants and inputs         → Notarization
//! 4. Mark inputs consumed
//! 5. Apply consume/produce to every vault
//! 6. Sign the receipt
//! ```
//!
//! Steps 2 through 5 run under one lock, so two transitions racing for the
//! same input are serialized and the loser sees `Conflict`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use openbid_types::{
    CommitReceipt, Identity, OpenbidError, PartyId, Result, SignedTransition,
};
use parking_lot::Mutex;

use crate::consumed::ConsumedVersions;
use crate::store::MemoryVault;

/// Finalizes signed transitions.
#[async_trait]
pub trait SettlementCommit: Send + Sync {
    /// Identity of the service, used in receipts and excluded from cash issuance.
    fn notary(&self) -> PartyId;

    /// Commit `signed` atomically at every participant.
    ///
    /// # Errors
    /// - `Conflict` if any consumed version was already consumed.
    /// - `Verification` if a required signature is missing or invalid.
    /// - `Notarization` if the transition cannot be finalized.
    async fn propose(&self, signed: SignedTransition) -> Result<CommitReceipt>;
}

#[derive(Default)]
struct Ledger {
    consumed: ConsumedVersions,
    vaults: HashMap<PartyId, Arc<MemoryVault>>,
    commits: u64,
}

/// In-process commit service that owns every registered party's vault.
pub struct LocalNotary {
    identity: Identity,
    ledger: Mutex<Ledger>,
}

impl std::fmt::Debug for LocalNotary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalNotary")
            .field("notary", &self.identity.id())
            .field("commits", &self.commit_count())
            .finish_non_exhaustive()
    }
}

impl LocalNotary {
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Register `party` and return its vault. Registering twice returns the
    /// same vault.
    pub fn register(&self, party: PartyId) -> Arc<MemoryVault> {
        let mut ledger = self.ledger.lock();
        Arc::clone(ledger.vaults.entry(party).or_default())
    }

    /// The vault of `party`, if registered.
    #[must_use]
    pub fn vault(&self, party: &PartyId) -> Option<Arc<MemoryVault>> {
        self.ledger.lock().vaults.get(party).cloned()
    }

    /// Number of transitions committed so far.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.ledger.lock().commits
    }

    fn commit(&self, signed: &SignedTransition) -> Result<CommitReceipt> {
        signed.verify_signatures()?;
        let transition = &signed.transition;
        let transition_id = signed.id();

        let mut ledger = self.ledger.lock();
        ledger.consumed.check(&transition.consumed)?;

        let mut vaults = Vec::new();
        for party in transition.participants() {
            let vault = ledger.vaults.get(&party).ok_or_else(|| OpenbidError::Notarization {
                reason: format!("participant {party} is not registered"),
            })?;
            vaults.push(Arc::clone(vault));
        }
        for version in &transition.consumed {
            if !vaults.iter().any(|v| v.contains(version)) {
                return Err(OpenbidError::Notarization {
                    reason: format!("input {version} is unknown to every participant"),
                });
            }
        }

        ledger.consumed.consume(&transition.consumed)?;
        for vault in &vaults {
            vault.apply(&transition.consumed, &transition.produced);
        }
        ledger.commits += 1;
        drop(ledger);

        let committed_at = Utc::now();
        let consumed = transition.consumed.clone();
        let committed_versions = transition.produced_versions();
        let notary_signature = self.identity.sign(&CommitReceipt::signing_bytes(
            &transition_id,
            &consumed,
            &committed_versions,
            committed_at,
        ));
        Ok(CommitReceipt {
            transition_id,
            consumed,
            committed_versions,
            notary: self.identity.id(),
            notary_signature,
            committed_at,
        })
    }
}

#[async_trait]
impl SettlementCommit for LocalNotary {
    fn notary(&self) -> PartyId {
        self.identity.id()
    }

    async fn propose(&self, signed: SignedTransition) -> Result<CommitReceipt> {
        let command = signed.transition.command;
        match self.commit(&signed) {
            Ok(receipt) => {
                tracing::info!(
                    transition = %receipt.transition_id,
                    command = %command,
                    consumed = receipt.consumed.len(),
                    produced = receipt.committed_versions.len(),
                    "Transition committed"
                );
                Ok(receipt)
            }
            Err(err) => {
                tracing::warn!(command = %command, error = %err, "Transition rejected");
                Err(err)
            }
        }
    }
}
