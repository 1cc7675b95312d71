use serde::{Deserialize, Serialize};

pub mod codec;
pub mod error;
pub mod framing;
pub mod shape;
pub mod sketch;

pub use codec::Command;
pub use error::{FormatError, ReferenceError};
pub use framing::{LineReader, MAX_LINE_LEN};
pub use shape::{Corners, Rgb, Shape, ShapeId, ShapeKind, ShapeType, HIT_TOLERANCE};
pub use sketch::Sketch;

/// Default TCP port the sketch server listens on.
pub const DEFAULT_PORT: u16 = 4242;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}
