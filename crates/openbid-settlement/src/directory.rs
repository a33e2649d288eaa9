//! Network directory: who is on the network.
//!
//! Injected rather than global so that protocols can be tested against a
//! fixed, fabricated membership.

use std::collections::BTreeSet;

use openbid_types::PartyId;

/// Membership view used for "issue to everyone".
pub trait Directory: Send + Sync {
    /// Every party on the network, including service identities.
    fn participants(&self) -> BTreeSet<PartyId>;

    /// Infrastructure identities (commit service / notary) that never
    /// receive cash.
    fn service_identities(&self) -> BTreeSet<PartyId>;

    /// Participants that can hold escrow: everyone except services and `me`.
    fn counterparties_of(&self, me: &PartyId) -> BTreeSet<PartyId> {
        let services = self.service_identities();
        self.participants()
            .into_iter()
            .filter(|p| p != me && !services.contains(p))
            .collect()
    }
}

/// A fixed directory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    participants: BTreeSet<PartyId>,
    services: BTreeSet<PartyId>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new(
        participants: impl IntoIterator<Item = PartyId>,
        services: impl IntoIterator<Item = PartyId>,
    ) -> Self {
        let services: BTreeSet<PartyId> = services.into_iter().collect();
        let mut participants: BTreeSet<PartyId> = participants.into_iter().collect();
        participants.extend(services.iter().copied());
        Self {
            participants,
            services,
        }
    }
}

impl Directory for StaticDirectory {
    fn participants(&self) -> BTreeSet<PartyId> {
        self.participants.clone()
    }

    fn service_identities(&self) -> BTreeSet<PartyId> {
        self.services.clone()
    }
}
