//! Point-to-point session between two parties.
//!
//! A session is a pair of bounded FIFO channels. Messages on one session
//! arrive in order; there is no ordering across sessions. Every receive is
//! bounded by the configured session timeout.

use std::time::Duration;

use openbid_types::{OpenbidError, PartyId, Result, RoundOutcome, SessionMessage, SessionRole};
use tokio::sync::mpsc;

/// One end of a session.
#[derive(Debug)]
pub struct Session {
    counterparty: PartyId,
    outbound: mpsc::Sender<SessionMessage>,
    inbound: mpsc::Receiver<SessionMessage>,
    timeout: Duration,
}

impl Session {
    /// Create both ends of a session between `a` and `b`.
    ///
    /// The first returned end belongs to `a` (its counterparty is `b`).
    #[must_use]
    pub fn pair(a: PartyId, b: PartyId, buffer: usize, timeout: Duration) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(buffer);
        let (b_tx, a_rx) = mpsc::channel(buffer);
        (
            Self {
                counterparty: b,
                outbound: a_tx,
                inbound: a_rx,
                timeout,
            },
            Self {
                counterparty: a,
                outbound: b_tx,
                inbound: b_rx,
                timeout,
            },
        )
    }

    /// The authenticated party on the other end.
    #[must_use]
    pub fn counterparty(&self) -> PartyId {
        self.counterparty
    }

    pub async fn send(&self, message: SessionMessage) -> Result<()> {
        tracing::debug!(to = %self.counterparty, message = message.name(), "Session send");
        self.outbound
            .send(message)
            .await
            .map_err(|_| OpenbidError::SessionClosed(self.counterparty))
    }

    /// Next message, or `SessionTimeout` / `SessionClosed`.
    pub async fn receive(&mut self) -> Result<SessionMessage> {
        match tokio::time::timeout(self.timeout, self.inbound.recv()).await {
            Ok(Some(message)) => {
                tracing::debug!(from = %self.counterparty, message = message.name(), "Session receive");
                Ok(message)
            }
            Ok(None) => Err(OpenbidError::SessionClosed(self.counterparty)),
            Err(_) => Err(OpenbidError::SessionTimeout {
                counterparty: self.counterparty,
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    pub async fn send_and_receive(&mut self, message: SessionMessage) -> Result<SessionMessage> {
        self.send(message).await?;
        self.receive().await
    }

    /// Receive the opening message that fixes this session's role.
    pub async fn receive_open(&mut self) -> Result<SessionRole> {
        match self.receive().await? {
            SessionMessage::Open(role) => Ok(role),
            other => Err(unexpected("Open", &other)),
        }
    }

    pub async fn receive_solvency(&mut self) -> Result<bool> {
        match self.receive().await? {
            SessionMessage::Solvency(solvent) => Ok(solvent),
            other => Err(unexpected("Solvency", &other)),
        }
    }

    pub async fn receive_finalized(&mut self) -> Result<RoundOutcome> {
        match self.receive().await? {
            SessionMessage::Finalized(outcome) => Ok(outcome),
            other => Err(unexpected("Finalized", &other)),
        }
    }
}

fn unexpected(expected: &str, actual: &SessionMessage) -> OpenbidError {
    OpenbidError::UnexpectedMessage {
        expected: expected.to_string(),
        actual: actual.name().to_string(),
    }
}
