use std::sync::Arc;

use sketchboard_shared::Command;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ServerError;
use crate::state::Board;

/// Applies a client command to the board and returns the command to
/// broadcast, or `None` when nothing changed.
pub fn apply_client_command(board: &mut Board, sender: Uuid, command: Command) -> Option<Command> {
    match command {
        Command::Add(mut shape) => {
            if let Some(claimed) = shape.id.take() {
                debug!(session = %sender, claimed = %claimed, "discarding client-chosen id");
            }
            let command = Command::Add(shape.with_id(board.issue_id()));
            match board.sketch.apply(&command) {
                Ok(()) => Some(command),
                Err(error) => {
                    warn!(session = %sender, %error, "add rejected");
                    None
                }
            }
        }
        Command::Sketch(_) => {
            warn!(session = %sender, "ignoring snapshot sent by a client");
            None
        }
        command => match board.sketch.apply(&command) {
            Ok(()) => Some(command),
            Err(error) => {
                debug!(session = %sender, %error, "ignoring {}", command.name());
                None
            }
        },
    }
}

/// Queues `line` for every registered session. Sessions whose queue is full
/// are told to close; sessions whose queue is gone are dropped. Neither
/// affects delivery to the rest.
pub fn broadcast_all(board: &mut Board, line: Arc<str>) -> usize {
    let mut stale = Vec::new();
    let mut delivered = 0;
    for (id, peer) in board.peers.iter() {
        match peer.tx.try_send(line.clone()) {
            Ok(()) => delivered += 1,
            Err(TrySendError::Full(_)) => {
                warn!(error = %ServerError::Capacity(*id), "disconnecting session");
                peer.kick.notify_one();
                stale.push(*id);
            }
            Err(TrySendError::Closed(_)) => {
                debug!(session = %id, "dropping session with closed queue");
                stale.push(*id);
            }
        }
    }

    for id in stale {
        board.peers.remove(&id);
    }
    delivered
}
