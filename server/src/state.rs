use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sketchboard_shared::{ShapeId, Sketch};
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

use crate::hub::Hub;

/// Outbound lines a session may have queued before it counts as too slow.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
}

impl AppState {
    pub fn new(outbound_capacity: usize) -> Self {
        Self {
            hub: Arc::new(Hub::new(outbound_capacity)),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOUND_CAPACITY)
    }
}

pub struct Peer {
    pub tx: mpsc::Sender<Arc<str>>,
    pub kick: Arc<Notify>,
}

/// Everything guarded by the hub lock: the authoritative sketch, the live
/// sessions, and every id handed out so far.
#[derive(Default)]
pub struct Board {
    pub sketch: Sketch,
    pub peers: HashMap<Uuid, Peer>,
    // Never pruned: ids must not repeat for the life of the process, even
    // after their shape is deleted.
    issued: HashSet<ShapeId>,
}

impl Board {
    pub fn issue_id(&mut self) -> ShapeId {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.issued.insert(id.clone()) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchboard_shared::{Command, Point, Rgb, Shape};

    #[test]
    fn deleted_ids_stay_issued() {
        let mut board = Board::default();
        let id = board.issue_id();
        let shape = Shape::segment(Point::new(0, 0), Point::new(1, 1), Rgb::BLACK).with_id(id.clone());
        board.sketch.apply(&Command::Add(shape)).unwrap();
        board.sketch.apply(&Command::Delete { id: id.clone() }).unwrap();

        assert!(board.sketch.is_empty());
        assert!(board.issued.contains(&id));
        let fresh: HashSet<_> = (0..50).map(|_| board.issue_id()).collect();
        assert_eq!(fresh.len(), 50);
        assert!(!fresh.contains(&id));
    }
}
