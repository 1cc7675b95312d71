use std::sync::Arc;

use sketchboard_shared::{Command, FormatError};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::hub::Hub;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closed,
}

/// One connected client, independent of the transport carrying its lines.
pub struct Session {
    id: Uuid,
    peer: String,
    hub: Arc<Hub>,
    kick: Arc<Notify>,
    state: SessionState,
}

impl Session {
    /// Registers with the hub and returns the session together with its
    /// outbound queue. The first queued line is the current snapshot.
    pub async fn open(hub: Arc<Hub>, peer: impl Into<String>) -> (Session, mpsc::Receiver<Arc<str>>) {
        let peer = peer.into();
        debug!(peer = %peer, state = ?SessionState::Connecting, "session opening");
        let registration = hub.register().await;
        let session = Session {
            id: registration.id,
            peer,
            hub,
            kick: registration.kick,
            state: SessionState::Active,
        };
        info!(session = %session.id, peer = %session.peer, state = ?session.state, "session active");
        (session, registration.outbound)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Decodes and submits one inbound line. Malformed lines are logged and
    /// dropped; the session stays active either way.
    pub async fn handle_line(&self, line: &str) -> Option<Command> {
        if self.state != SessionState::Active {
            return None;
        }
        match Command::decode(line) {
            Ok(command) => {
                debug!(session = %self.id, line = %line.trim_end(), "received");
                self.hub.submit(self.id, command).await
            }
            Err(FormatError::Empty) => None,
            Err(error) => {
                warn!(session = %self.id, %error, line = %line.trim_end(), "dropping malformed line");
                None
            }
        }
    }

    /// Resolves once the hub has given up on this session's outbound queue.
    pub async fn kicked(&self) {
        self.kick.notified().await
    }

    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        self.hub.deregister(self.id).await;
        info!(session = %self.id, peer = %self.peer, state = ?self.state, "session closed");
    }
}
