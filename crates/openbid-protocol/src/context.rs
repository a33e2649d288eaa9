//! Everything a protocol run needs from its party.

use std::sync::Arc;

use openbid_settlement::{Directory, SettlementCommit, StateStore, TransitionVerifier};
use openbid_types::{
    CommitReceipt, ContractState, Identity, PartyId, ProtocolConfig, Result, SignedTransition,
    StateAndRef, Transition,
};

use crate::network::Network;

/// A party's capabilities, shared by every protocol run it starts or answers.
#[derive(Clone)]
pub struct PartyContext {
    pub identity: Arc<Identity>,
    pub store: Arc<dyn StateStore>,
    pub commit: Arc<dyn SettlementCommit>,
    pub verifier: Arc<dyn TransitionVerifier>,
    pub directory: Arc<dyn Directory>,
    pub network: Arc<Network>,
    pub config: ProtocolConfig,
}

impl PartyContext {
    #[must_use]
    pub fn id(&self) -> PartyId {
        self.identity.id()
    }

    /// Check contract rules against `inputs` and sign as this party.
    pub fn verify_and_sign(
        &self,
        transition: Transition,
        inputs: &[StateAndRef<ContractState>],
    ) -> Result<SignedTransition> {
        self.verifier.verify(&transition, inputs)?;
        Ok(SignedTransition::sign(transition, &self.identity))
    }

    /// Verify, sign, and commit a transition this party alone signs.
    pub async fn commit_alone(
        &self,
        transition: Transition,
        inputs: &[StateAndRef<ContractState>],
    ) -> Result<CommitReceipt> {
        let signed = self.verify_and_sign(transition, inputs)?;
        self.commit.propose(signed).await
    }
}

impl std::fmt::Debug for PartyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartyContext")
            .field("party", &self.identity.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
