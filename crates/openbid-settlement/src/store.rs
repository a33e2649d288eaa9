//! State store: a party's read view of its live states.
//!
//! [`StateStore`] is the narrow port the protocols read through. Reads are
//! snapshots: staleness is only detected when a transition consuming a
//! stale version reaches the commit service.
//!
//! [`MemoryVault`] is the in-process adapter. The commit service writes to
//! it; protocols only read. It also remembers what each consumed version
//! turned into, so a party can confirm a commit from its own records.

use std::collections::BTreeMap;

use openbid_types::{ContractState, Queryable, Result, StateAndRef, VersionId};
use parking_lot::RwLock;

/// Read access to one party's live (unconsumed) states.
pub trait StateStore: Send + Sync {
    /// All live states, ordered by version.
    fn live_states(&self) -> Result<Vec<StateAndRef<ContractState>>>;

    /// What the transition that consumed `version` produced here.
    ///
    /// `None` while `version` is live or if this party never recorded it.
    fn successors(&self, version: &VersionId) -> Result<Option<Vec<StateAndRef<ContractState>>>>;
}

/// Typed queries over any [`StateStore`].
pub trait StateQuery {
    /// Every live state of type `T`, ordered by version.
    fn query_by_type<T: Queryable>(&self) -> Result<Vec<StateAndRef<T>>>;

    /// The live state of type `T` with natural key `key`.
    ///
    /// If several versions share a key, the newest wins.
    fn query_by_key<T: Queryable>(&self, key: &T::Key) -> Result<Option<StateAndRef<T>>>;

    /// Look up specific versions. Unknown versions are skipped.
    fn resolve(&self, versions: &[VersionId]) -> Result<Vec<StateAndRef<ContractState>>>;
}

impl<S: StateStore + ?Sized> StateQuery for S {
    fn query_by_type<T: Queryable>(&self) -> Result<Vec<StateAndRef<T>>> {
        Ok(self
            .live_states()?
            .iter()
            .filter_map(|s| T::extract(&s.state).map(|t| StateAndRef::new(s.version, t.clone())))
            .collect())
    }

    fn query_by_key<T: Queryable>(&self, key: &T::Key) -> Result<Option<StateAndRef<T>>> {
        Ok(self
            .query_by_type::<T>()?
            .into_iter()
            .rev()
            .find(|s| s.state.key() == *key))
    }

    fn resolve(&self, versions: &[VersionId]) -> Result<Vec<StateAndRef<ContractState>>> {
        let live = self.live_states()?;
        Ok(versions
            .iter()
            .filter_map(|v| live.iter().find(|s| s.version == *v).cloned())
            .collect())
    }
}

#[derive(Debug, Default)]
struct VaultState {
    live: BTreeMap<VersionId, ContractState>,
    /// Consumed version to the states its consuming transition produced.
    successors: BTreeMap<VersionId, Vec<StateAndRef<ContractState>>>,
}

/// In-memory vault holding one party's live states and the successor
/// history of everything it has seen consumed.
#[derive(Debug, Default)]
pub struct MemoryVault {
    states: RwLock<VaultState>,
}

impl MemoryVault {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove `consumed` and insert `produced` in one critical section.
    pub fn apply(&self, consumed: &[VersionId], produced: &[StateAndRef<ContractState>]) {
        let mut states = self.states.write();
        for version in consumed {
            if states.live.remove(version).is_some() {
                states.successors.insert(*version, produced.to_vec());
            }
        }
        for s in produced {
            states.live.insert(s.version, s.state.clone());
        }
    }

    /// Whether `version` is live in this vault.
    #[must_use]
    pub fn contains(&self, version: &VersionId) -> bool {
        self.states.read().live.contains_key(version)
    }

    /// Number of live states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.read().live.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.read().live.is_empty()
    }
}

impl StateStore for MemoryVault {
    fn live_states(&self) -> Result<Vec<StateAndRef<ContractState>>> {
        Ok(self
            .states
            .read()
            .live
            .iter()
            .map(|(version, state)| StateAndRef::new(*version, state.clone()))
            .collect())
    }

    fn successors(&self, version: &VersionId) -> Result<Option<Vec<StateAndRef<ContractState>>>> {
        Ok(self.states.read().successors.get(version).cloned())
    }
}
