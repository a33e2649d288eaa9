//! Consumed-version registry: prevents double consumption.
//!
//! Like a UTXO set: each version can be consumed by exactly one committed
//! transition. Proposing a transition that consumes an already-consumed
//! version returns [`OpenbidError::Conflict`].
//!
//! Unlike a cache, the registry never evicts. Forgetting a consumed version
//! would let a stale read commit a second time.

use std::collections::HashSet;

use openbid_types::{OpenbidError, Result, VersionId};

/// Tracks every version consumed by a committed transition.
#[derive(Debug, Default)]
pub struct ConsumedVersions {
    consumed: HashSet<VersionId>,
}

impl ConsumedVersions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with `Conflict` on the first version that was already consumed,
    /// or that appears twice in `versions`.
    pub fn check(&self, versions: &[VersionId]) -> Result<()> {
        let mut seen = HashSet::with_capacity(versions.len());
        for version in versions {
            if self.consumed.contains(version) || !seen.insert(*version) {
                return Err(OpenbidError::Conflict { version: *version });
            }
        }
        Ok(())
    }

    /// Check, then mark all of `versions` consumed. All or nothing.
    pub fn consume(&mut self, versions: &[VersionId]) -> Result<()> {
        self.check(versions)?;
        self.consumed.extend(versions.iter().copied());
        Ok(())
    }

    /// Whether `version` has been consumed.
    pub fn is_consumed(&self, version: &VersionId) -> bool {
        self.consumed.contains(version)
    }

    /// Number of versions consumed so far.
    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}
