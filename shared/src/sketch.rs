use std::collections::HashSet;

use tracing::warn;

use crate::codec::Command;
use crate::error::ReferenceError;
use crate::shape::Shape;

/// Insertion-ordered set of shapes, keyed by id.
///
/// The server holds the authoritative one; every client keeps a mirror that
/// only changes through [`Sketch::apply`] on lines the server broadcast.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sketch {
    shapes: Vec<Shape>,
}

impl Sketch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_shapes(shapes: Vec<Shape>) -> Self {
        let mut sketch = Self::new();
        sketch.replace_all(shapes);
        sketch
    }

    pub fn add(&mut self, shape: Shape) -> Result<(), ReferenceError> {
        if let Some(id) = &shape.id {
            if self.find(id).is_some() {
                return Err(ReferenceError::Duplicate(id.clone()));
            }
        }
        self.shapes.push(shape);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Shape> {
        let index = self.position(id)?;
        Some(self.shapes.remove(index))
    }

    pub fn find(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|shape| shape.id.as_deref() == Some(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Shape> {
        self.shapes
            .iter_mut()
            .find(|shape| shape.id.as_deref() == Some(id))
    }

    /// Like [`Sketch::find`], for callers that expect the id to be live.
    pub fn require(&self, id: &str) -> Result<&Shape, ReferenceError> {
        self.find(id)
            .ok_or_else(|| ReferenceError::Missing(id.to_string()))
    }

    /// Topmost shape under the point, i.e. the most recently added hit.
    pub fn shape_at(&self, x: i32, y: i32) -> Option<&Shape> {
        self.shapes.iter().rev().find(|shape| shape.contains(x, y))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter()
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn replace_all(&mut self, shapes: Vec<Shape>) {
        let mut seen = HashSet::new();
        self.shapes = shapes
            .into_iter()
            .filter(|shape| match &shape.id {
                Some(id) if !seen.insert(id.clone()) => {
                    warn!(id = %id, "dropping duplicate shape id");
                    false
                }
                _ => true,
            })
            .collect();
    }

    pub fn snapshot(&self) -> Command {
        Command::Sketch(self.shapes.clone())
    }

    /// Applies one server-ordered command. Edits to an id that is not live
    /// come back as [`ReferenceError::Missing`] and leave the sketch as it was.
    pub fn apply(&mut self, command: &Command) -> Result<(), ReferenceError> {
        match command {
            Command::Add(shape) => {
                if shape.id.is_none() {
                    return Err(ReferenceError::Unassigned);
                }
                self.add(shape.clone())
            }
            Command::Move { id, dx, dy } => {
                self.existing(id)?.move_by(*dx, *dy);
                Ok(())
            }
            Command::Recolor { id, color } => {
                self.existing(id)?.set_color(*color);
                Ok(())
            }
            Command::Delete { id } => self
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| ReferenceError::Missing(id.clone())),
            Command::Sketch(shapes) => {
                self.replace_all(shapes.clone());
                Ok(())
            }
        }
    }

    fn existing(&mut self, id: &str) -> Result<&mut Shape, ReferenceError> {
        self.find_mut(id)
            .ok_or_else(|| ReferenceError::Missing(id.to_string()))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.shapes
            .iter()
            .position(|shape| shape.id.as_deref() == Some(id))
    }
}

impl<'a> IntoIterator for &'a Sketch {
    type Item = &'a Shape;
    type IntoIter = std::slice::Iter<'a, Shape>;

    fn into_iter(self) -> Self::IntoIter {
        self.shapes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point, Rgb};

    fn rect(id: &str, x: i32) -> Shape {
        Shape::rectangle(Point::new(x, x), Point::new(x + 40, x + 40), Rgb::BLACK).with_id(id)
    }

    #[test]
    fn keeps_insertion_order_and_unique_ids() {
        let mut sketch = Sketch::new();
        sketch.add(rect("a", 0)).unwrap();
        sketch.add(rect("b", 10)).unwrap();
        assert_eq!(
            sketch.add(rect("a", 20)),
            Err(ReferenceError::Duplicate("a".into()))
        );
        let ids = sketch.iter().filter_map(|s| s.id.as_deref()).collect::<Vec<_>>();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn remove_and_lookup() {
        let mut sketch = Sketch::from_shapes(vec![rect("a", 0), rect("b", 10)]);
        assert!(sketch.find("b").is_some());
        assert_eq!(sketch.remove("a").and_then(|s| s.id), Some("a".to_string()));
        assert_eq!(sketch.remove("a"), None);
        assert_eq!(sketch.require("a"), Err(ReferenceError::Missing("a".into())));
        assert_eq!(sketch.len(), 1);
    }

    #[test]
    fn shape_at_prefers_topmost() {
        let sketch = Sketch::from_shapes(vec![rect("under", 0), rect("over", 10)]);
        assert_eq!(sketch.shape_at(20, 20).and_then(|s| s.id.as_deref()), Some("over"));
        assert_eq!(sketch.shape_at(5, 5).and_then(|s| s.id.as_deref()), Some("under"));
        assert!(sketch.shape_at(200, 200).is_none());
    }

    #[test]
    fn apply_runs_full_lifecycle() {
        let mut sketch = Sketch::new();
        let add = Command::decode("add rectangle 10 10 50 50 -16777216 abc").unwrap();
        sketch.apply(&add).unwrap();
        sketch.apply(&Command::decode("move abc 5 5").unwrap()).unwrap();
        sketch.apply(&Command::decode("recolor abc 255").unwrap()).unwrap();
        assert_eq!(
            sketch.find("abc"),
            Some(&Shape::rectangle(Point::new(15, 15), Point::new(55, 55), Rgb(255)).with_id("abc"))
        );
        sketch.apply(&Command::decode("delete abc").unwrap()).unwrap();
        assert!(sketch.is_empty());
    }

    #[test]
    fn ghost_references_leave_store_untouched() {
        let mut sketch = Sketch::from_shapes(vec![rect("a", 0)]);
        let before = sketch.clone();
        for line in ["move ghost 1 1", "recolor ghost 0", "delete ghost"] {
            let result = sketch.apply(&Command::decode(line).unwrap());
            assert_eq!(result, Err(ReferenceError::Missing("ghost".into())));
        }
        assert_eq!(sketch, before);
    }

    #[test]
    fn apply_rejects_unassigned_add() {
        let mut sketch = Sketch::new();
        let add = Command::decode("add segment 0 0 5 5 0").unwrap();
        assert_eq!(sketch.apply(&add), Err(ReferenceError::Unassigned));
        assert!(sketch.is_empty());
    }

    #[test]
    fn snapshot_replaces_contents() {
        let mut sketch = Sketch::from_shapes(vec![rect("old", 0)]);
        sketch
            .apply(&Command::Sketch(vec![rect("x", 1), rect("x", 2), rect("y", 3)]))
            .unwrap();
        let ids = sketch.iter().filter_map(|s| s.id.as_deref()).collect::<Vec<_>>();
        assert_eq!(ids, ["x", "y"]);
        assert_eq!(sketch.snapshot(), Command::Sketch(sketch.shapes().to_vec()));
    }
}
