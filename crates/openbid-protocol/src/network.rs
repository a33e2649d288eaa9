//! In-process session router.
//!
//! Each registered party owns an inbox of incoming sessions. Initiating a
//! session creates a [`Session`] pair and delivers the responder end to the
//! target's inbox, tagged with the initiator's identity.

use std::collections::HashMap;

use openbid_types::{OpenbidError, PartyId, ProtocolConfig, Result};
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::session::Session;

/// Routes new sessions to party inboxes.
#[derive(Debug)]
pub struct Network {
    inboxes: RwLock<HashMap<PartyId, mpsc::Sender<Session>>>,
    config: ProtocolConfig,
}

impl Network {
    #[must_use]
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            inboxes: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Register `party` and return its inbox. Re-registering replaces the
    /// previous inbox.
    pub fn register(&self, party: PartyId) -> mpsc::Receiver<Session> {
        let (tx, rx) = mpsc::channel(self.config.inbox_capacity);
        self.inboxes.write().insert(party, tx);
        tracing::debug!(party = %party, "Party joined network");
        rx
    }

    /// Remove `party`. Sessions already delivered stay open.
    pub fn deregister(&self, party: &PartyId) {
        self.inboxes.write().remove(party);
    }

    #[must_use]
    pub fn is_registered(&self, party: &PartyId) -> bool {
        self.inboxes.read().contains_key(party)
    }

    /// Open a session from `from` to `to`.
    ///
    /// # Errors
    /// `PartyNotFound` if `to` is not registered, `SessionClosed` if its
    /// inbox is no longer read.
    pub async fn initiate(&self, from: PartyId, to: PartyId) -> Result<Session> {
        let inbox = self
            .inboxes
            .read()
            .get(&to)
            .cloned()
            .ok_or(OpenbidError::PartyNotFound(to))?;
        let (ours, theirs) = Session::pair(
            from,
            to,
            self.config.session_buffer,
            self.config.session_timeout(),
        );
        inbox
            .send(theirs)
            .await
            .map_err(|_| OpenbidError::SessionClosed(to))?;
        Ok(ours)
    }
}
