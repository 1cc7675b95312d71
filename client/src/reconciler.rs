use sketchboard_shared::{Command, Point, Rgb, Shape, ShapeId, ShapeType, Sketch};
use tracing::{debug, warn};

/// The draw gesture in progress: where it started and the id-less shape it
/// has produced so far.
pub struct Gesture {
    pub anchor: Point,
    pub shape: Shape,
}

/// Client-side view of the sketch.
///
/// The mirror only ever changes through lines the server broadcast, so the
/// ids it holds are always the server's. Local drawing lives beside it: the
/// gesture in progress, and committed shapes still waiting for their echo.
pub struct Reconciler {
    mirror: Sketch,
    gesture: Option<Gesture>,
    pending: Vec<Shape>,
    dirty: bool,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            mirror: Sketch::new(),
            gesture: None,
            pending: Vec::new(),
            dirty: false,
        }
    }

    pub fn mirror(&self) -> &Sketch {
        &self.mirror
    }

    pub fn speculative(&self) -> Option<&Shape> {
        self.gesture.as_ref().map(|gesture| &gesture.shape)
    }

    pub fn pending(&self) -> &[Shape] {
        &self.pending
    }

    /// Starts a draw gesture, replacing any gesture already in progress.
    pub fn on_local_gesture_start(&mut self, at: Point, shape_type: ShapeType, color: Rgb) -> &Shape {
        self.dirty = true;
        let gesture = self.gesture.insert(Gesture {
            anchor: at,
            shape: Shape::begin(shape_type, at, color),
        });
        &gesture.shape
    }

    pub fn on_local_gesture_update(&mut self, to: Point) -> Option<&Shape> {
        let gesture = self.gesture.as_mut()?;
        gesture.shape.drag(gesture.anchor, to);
        self.dirty = true;
        Some(&gesture.shape)
    }

    /// Ends the gesture and returns the `add` to send. The shape is not put
    /// in the mirror; it waits in `pending` until the server echoes it back
    /// with an id.
    pub fn on_local_gesture_commit(&mut self) -> Option<Command> {
        let Gesture { shape, .. } = self.gesture.take()?;
        self.dirty = true;
        self.pending.push(shape.clone());
        Some(Command::Add(shape))
    }

    pub fn gesture_cancel(&mut self) {
        if self.gesture.take().is_some() {
            self.dirty = true;
        }
    }

    /// Applies one server line to the mirror with the same dispatch the
    /// server uses. Returns whether the mirror changed.
    pub fn on_server_command(&mut self, line: &str) -> bool {
        let command = match Command::decode(line) {
            Ok(command) => command,
            Err(error) => {
                warn!(%error, line = %line.trim_end(), "dropping malformed server line");
                return false;
            }
        };
        match &command {
            Command::Add(shape) => self.settle_pending(shape),
            Command::Sketch(_) => self.pending.clear(),
            _ => {}
        }
        match self.mirror.apply(&command) {
            Ok(()) => {
                self.dirty = true;
                true
            }
            Err(error) => {
                debug!(%error, "ignoring {}", command.name());
                false
            }
        }
    }

    /// Shapes in drawing order: confirmed ones first, then local ones.
    pub fn current_shapes(&self) -> Vec<&Shape> {
        self.mirror
            .iter()
            .chain(self.pending.iter())
            .chain(self.speculative())
            .collect()
    }

    /// Returns whether anything changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Confirmed shape under the point, if any.
    pub fn shape_at(&self, at: Point) -> Option<&Shape> {
        self.mirror.shape_at(at.x, at.y)
    }

    pub fn move_request(&self, id: &str, dx: i32, dy: i32) -> Option<Command> {
        let id = self.confirmed(id)?;
        Some(Command::Move { id, dx, dy })
    }

    pub fn recolor_request(&self, id: &str, color: Rgb) -> Option<Command> {
        let id = self.confirmed(id)?;
        Some(Command::Recolor { id, color })
    }

    pub fn delete_request(&self, id: &str) -> Option<Command> {
        let id = self.confirmed(id)?;
        Some(Command::Delete { id })
    }

    fn confirmed(&self, id: &str) -> Option<ShapeId> {
        self.mirror.find(id).and_then(|shape| shape.id.clone())
    }

    // An echo matches the oldest pending shape that agrees on everything but
    // the id. Broadcasts do not say who sent them, so an identical add from
    // another client settles our copy early; our own echo then lands in the
    // mirror as a second shape, and the display converges either way.
    fn settle_pending(&mut self, echoed: &Shape) {
        let position = self
            .pending
            .iter()
            .position(|pending| pending.color == echoed.color && pending.kind == echoed.kind);
        if let Some(position) = position {
            self.pending.remove(position);
        }
    }
}
