//! Single-process network of parties sharing one notary.
//!
//! Wires the reference adapters together: a [`LocalNotary`] owning every
//! party's vault, a [`StaticDirectory`], the contract rules, and a
//! [`Network`] routing sessions between [`PartyNode`]s.

use std::collections::BTreeMap;
use std::sync::Arc;

use openbid_settlement::{ContractRules, LocalNotary, SettlementCommit, StaticDirectory};
use openbid_types::{Identity, OpenbidError, ProtocolConfig, Result};

use crate::context::PartyContext;
use crate::network::Network;
use crate::node::PartyNode;

/// A running set of named parties.
#[derive(Debug)]
pub struct LocalCluster {
    network: Arc<Network>,
    notary: Arc<LocalNotary>,
    nodes: BTreeMap<String, PartyNode>,
}

impl LocalCluster {
    /// Start one node per identity. Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// `Configuration` if `config` is invalid or two identities share a name.
    pub fn start(config: ProtocolConfig, notary: Identity, parties: Vec<Identity>) -> Result<Self> {
        config.validate()?;
        let mut names = std::collections::BTreeSet::new();
        if let Some(dup) = parties.iter().find(|p| !names.insert(p.name().to_string())) {
            return Err(OpenbidError::Configuration(format!(
                "duplicate party name {}",
                dup.name()
            )));
        }

        let notary = Arc::new(LocalNotary::new(notary));
        let network = Arc::new(Network::new(config.clone()));
        let directory = Arc::new(StaticDirectory::new(
            parties.iter().map(Identity::id),
            [notary.notary()],
        ));

        let mut nodes = BTreeMap::new();
        for identity in parties {
            let id = identity.id();
            let name = identity.name().to_string();
            let ctx = PartyContext {
                identity: Arc::new(identity),
                store: notary.register(id),
                commit: notary.clone(),
                verifier: Arc::new(ContractRules),
                directory: directory.clone(),
                network: Arc::clone(&network),
                config: config.clone(),
            };
            let inbox = network.register(id);
            nodes.insert(name, PartyNode::start(ctx, inbox));
        }
        tracing::info!(parties = nodes.len(), notary = %notary.notary(), "Local cluster started");

        Ok(Self {
            network,
            notary,
            nodes,
        })
    }

    /// Start with freshly generated identities named `names`.
    pub fn with_names(config: ProtocolConfig, names: &[&str]) -> Result<Self> {
        Self::start(
            config,
            Identity::generate("notary"),
            names.iter().map(|name| Identity::generate(*name)).collect(),
        )
    }

    /// The node named `name`.
    pub fn node(&self, name: &str) -> Result<&PartyNode> {
        self.nodes
            .get(name)
            .ok_or_else(|| OpenbidError::Internal(format!("no party named {name}")))
    }

    #[must_use]
    pub fn notary(&self) -> &Arc<LocalNotary> {
        &self.notary
    }

    #[must_use]
    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    /// Wait until no node has a responder run in progress.
    pub async fn wait_idle(&self) -> Result<()> {
        for node in self.nodes.values() {
            node.wait_idle().await?;
        }
        Ok(())
    }
}
