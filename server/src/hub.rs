use std::sync::Arc;

use sketchboard_shared::{Command, Shape};
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, info};
use uuid::Uuid;

use crate::logic::{apply_client_command, broadcast_all};
use crate::state::{Board, Peer};

/// A session's end of the hub: its id, its outbound queue (the snapshot is
/// already waiting in it) and the signal the hub uses to close it.
pub struct Registration {
    pub id: Uuid,
    pub outbound: mpsc::Receiver<Arc<str>>,
    pub kick: Arc<Notify>,
}

/// Owns the authoritative sketch and the session registry behind one lock.
///
/// A command is applied and queued for every session while the lock is
/// held, so all sessions see mutations in the order they were applied.
pub struct Hub {
    board: Mutex<Board>,
    capacity: usize,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        Self {
            board: Mutex::new(Board::default()),
            capacity: capacity.max(1),
        }
    }

    pub async fn register(&self) -> Registration {
        let (tx, outbound) = mpsc::channel(self.capacity);
        let kick = Arc::new(Notify::new());
        let id = Uuid::new_v4();

        let mut board = self.board.lock().await;
        let snapshot: Arc<str> = board.sketch.snapshot().encode().into();
        // Fresh queue with capacity >= 1, so the snapshot always fits.
        let _ = tx.try_send(snapshot);
        board.peers.insert(
            id,
            Peer {
                tx,
                kick: kick.clone(),
            },
        );
        info!(
            session = %id,
            peers = board.peers.len(),
            shapes = board.sketch.len(),
            "session registered"
        );

        Registration { id, outbound, kick }
    }

    pub async fn deregister(&self, id: Uuid) -> bool {
        let mut board = self.board.lock().await;
        let removed = board.peers.remove(&id).is_some();
        info!(session = %id, peers = board.peers.len(), "session deregistered");
        removed
    }

    /// Applies `command` on behalf of `sender` and broadcasts the result to
    /// every session, the sender included.
    pub async fn submit(&self, sender: Uuid, command: Command) -> Option<Command> {
        let mut board = self.board.lock().await;
        let accepted = apply_client_command(&mut board, sender, command)?;
        let line: Arc<str> = accepted.encode().into();
        let delivered = broadcast_all(&mut board, line.clone());
        debug!(session = %sender, delivered, line = %line, "broadcast");
        Some(accepted)
    }

    pub async fn broadcast(&self, line: &str) -> usize {
        let mut board = self.board.lock().await;
        broadcast_all(&mut board, line.into())
    }

    pub async fn snapshot(&self) -> Vec<Shape> {
        self.board.lock().await.sketch.shapes().to_vec()
    }

    pub async fn peer_count(&self) -> usize {
        self.board.lock().await.peers.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn command(line: &str) -> Command {
        Command::decode(line).unwrap()
    }

    async fn next(registration: &mut Registration) -> String {
        registration.outbound.recv().await.unwrap().to_string()
    }

    #[tokio::test]
    async fn register_queues_snapshot_first() {
        let hub = Hub::new(8);
        let mut a = hub.register().await;
        assert_eq!(next(&mut a).await, "sketch { }");

        let accepted = hub
            .submit(a.id, command("add rectangle 10 10 50 50 -16777216"))
            .await
            .unwrap();
        let id = accepted.target().unwrap().to_string();

        let mut b = hub.register().await;
        assert_eq!(
            next(&mut b).await,
            format!("sketch {{ rectangle 10 10 50 50 -16777216 {id} }}")
        );
        assert_eq!(
            next(&mut a).await,
            format!("add rectangle 10 10 50 50 -16777216 {id}")
        );
    }

    #[tokio::test]
    async fn add_replaces_client_chosen_id() {
        let hub = Hub::new(8);
        let a = hub.register().await;
        let accepted = hub
            .submit(a.id, command("add segment 0 0 9 9 0 mine"))
            .await
            .unwrap();
        assert_ne!(accepted.target(), Some("mine"));
        assert_eq!(hub.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_adds_get_distinct_ids() {
        let hub = Arc::new(Hub::new(1024));
        let mut tasks = Vec::new();
        for worker in 0..8 {
            let hub = hub.clone();
            tasks.push(tokio::spawn(async move {
                let session = hub.register().await;
                for step in 0..25 {
                    let line = format!("add ellipse {worker} {step} 40 40 -1");
                    hub.submit(session.id, command(&line)).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let shapes = hub.snapshot().await;
        let ids = shapes
            .iter()
            .filter_map(|shape| shape.id.clone())
            .collect::<HashSet<_>>();
        assert_eq!(shapes.len(), 200);
        assert_eq!(ids.len(), 200);
    }

    #[tokio::test]
    async fn ghost_edits_are_not_broadcast() {
        let hub = Hub::new(8);
        let mut a = hub.register().await;
        let _ = next(&mut a).await;
        for line in ["move ghost 1 1", "recolor ghost 5", "delete ghost"] {
            assert_eq!(hub.submit(a.id, command(line)).await, None);
        }
        assert!(a.outbound.try_recv().is_err());
        assert!(hub.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn slow_session_is_dropped_without_blocking_others() {
        let hub = Hub::new(2);
        let slow = hub.register().await;
        let mut fast = hub.register().await;
        let _ = next(&mut fast).await;

        // The slow session still holds its snapshot, so one more line fills it.
        hub.broadcast("delete x").await;
        let delivered = hub.broadcast("delete y").await;
        assert_eq!(delivered, 1);
        assert_eq!(next(&mut fast).await, "delete x");
        assert_eq!(next(&mut fast).await, "delete y");
        assert_eq!(hub.peer_count().await, 1);

        tokio::time::timeout(std::time::Duration::from_secs(1), slow.kick.notified())
            .await
            .expect("slow session should be told to close");
    }

    #[tokio::test]
    async fn deregistered_sessions_stop_receiving() {
        let hub = Hub::new(8);
        let a = hub.register().await;
        let mut b = hub.register().await;
        let _ = next(&mut b).await;
        assert!(hub.deregister(a.id).await);
        assert!(!hub.deregister(a.id).await);
        assert_eq!(hub.broadcast("delete z").await, 1);
        assert_eq!(next(&mut b).await, "delete z");
    }
}
