use std::fmt::{self, Write as _};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::Point;

/// How far (in pixels) a point may sit from a segment or polyline edge and
/// still count as a hit.
pub const HIT_TOLERANCE: f64 = 10.0;

pub type ShapeId = String;

/// Packed `0xAARRGGBB` color, carried on the wire as a signed decimal.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Rgb(pub i32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0xFF00_0000_u32 as i32);
    pub const WHITE: Rgb = Rgb(0xFFFF_FFFF_u32 as i32);

    pub fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        let packed =
            0xFF00_0000_u32 | (u32::from(red) << 16) | (u32::from(green) << 8) | u32::from(blue);
        Rgb(packed as i32)
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Ellipse,
    Rectangle,
    Segment,
    Polyline,
}

impl ShapeType {
    pub const ALL: [ShapeType; 4] = [
        ShapeType::Ellipse,
        ShapeType::Rectangle,
        ShapeType::Segment,
        ShapeType::Polyline,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeType::Ellipse => "ellipse",
            ShapeType::Rectangle => "rectangle",
            ShapeType::Segment => "segment",
            ShapeType::Polyline => "polyline",
        }
    }

    // Polyline joints travel as a single comma-joined token.
    pub(crate) fn geometry_len(self) -> usize {
        match self {
            ShapeType::Polyline => 1,
            _ => 4,
        }
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeType {
    type Err = FormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ShapeType::ALL
            .into_iter()
            .find(|shape_type| shape_type.as_str() == value)
            .ok_or_else(|| FormatError::UnknownShape(value.to_string()))
    }
}

/// Bounding corners of a rectangle or ellipse, always stored with
/// `x1 <= x2` and `y1 <= y2`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Corners {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
}

impl Corners {
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            x1: a.x.min(b.x),
            y1: a.y.min(b.y),
            x2: a.x.max(b.x),
            y2: a.y.max(b.y),
        }
    }

    pub fn min(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn max(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        self.x1 < x && x < self.x2 && self.y1 < y && y < self.y2
    }

    fn translate(&mut self, dx: i32, dy: i32) {
        *self = Corners::new(self.min().translate(dx, dy), self.max().translate(dx, dy));
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeKind {
    Ellipse(Corners),
    Rectangle(Corners),
    Segment { start: Point, end: Point },
    Polyline { points: Vec<Point> },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ShapeId>,
    pub color: Rgb,
    #[serde(flatten)]
    pub kind: ShapeKind,
}

impl Shape {
    pub fn new(kind: ShapeKind, color: Rgb) -> Self {
        Self {
            id: None,
            color,
            kind,
        }
    }

    pub fn with_id(mut self, id: impl Into<ShapeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn rectangle(a: Point, b: Point, color: Rgb) -> Self {
        Self::new(ShapeKind::Rectangle(Corners::new(a, b)), color)
    }

    pub fn ellipse(a: Point, b: Point, color: Rgb) -> Self {
        Self::new(ShapeKind::Ellipse(Corners::new(a, b)), color)
    }

    pub fn segment(start: Point, end: Point, color: Rgb) -> Self {
        Self::new(ShapeKind::Segment { start, end }, color)
    }

    pub fn polyline(points: Vec<Point>, color: Rgb) -> Self {
        Self::new(ShapeKind::Polyline { points }, color)
    }

    /// Zero-sized, id-less shape anchored where a draw gesture starts.
    pub fn begin(shape_type: ShapeType, at: Point, color: Rgb) -> Self {
        match shape_type {
            ShapeType::Ellipse => Self::ellipse(at, at, color),
            ShapeType::Rectangle => Self::rectangle(at, at, color),
            ShapeType::Segment => Self::segment(at, at, color),
            ShapeType::Polyline => Self::polyline(vec![at], color),
        }
    }

    /// Follows a draw gesture from `anchor` to `to`. Polylines keep every
    /// point they are dragged through.
    pub fn drag(&mut self, anchor: Point, to: Point) {
        match &mut self.kind {
            ShapeKind::Ellipse(corners) | ShapeKind::Rectangle(corners) => {
                *corners = Corners::new(anchor, to);
            }
            ShapeKind::Segment { end, .. } => *end = to,
            ShapeKind::Polyline { points } => points.push(to),
        }
    }

    pub fn shape_type(&self) -> ShapeType {
        match self.kind {
            ShapeKind::Ellipse(_) => ShapeType::Ellipse,
            ShapeKind::Rectangle(_) => ShapeType::Rectangle,
            ShapeKind::Segment { .. } => ShapeType::Segment,
            ShapeKind::Polyline { .. } => ShapeType::Polyline,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        match &self.kind {
            ShapeKind::Ellipse(corners) | ShapeKind::Rectangle(corners) => corners.contains(x, y),
            ShapeKind::Segment { start, end } => {
                distance_to_segment(x, y, *start, *end) <= HIT_TOLERANCE
            }
            ShapeKind::Polyline { points } => {
                if let [only] = points.as_slice() {
                    return distance_to_segment(x, y, *only, *only) <= HIT_TOLERANCE;
                }
                points
                    .windows(2)
                    .map(|edge| distance_to_segment(x, y, edge[0], edge[1]))
                    .fold(f64::INFINITY, f64::min)
                    <= HIT_TOLERANCE
            }
        }
    }

    pub fn move_by(&mut self, dx: i32, dy: i32) {
        match &mut self.kind {
            ShapeKind::Ellipse(corners) | ShapeKind::Rectangle(corners) => {
                corners.translate(dx, dy)
            }
            ShapeKind::Segment { start, end } => {
                *start = start.translate(dx, dy);
                *end = end.translate(dx, dy);
            }
            ShapeKind::Polyline { points } => {
                for point in points.iter_mut() {
                    *point = point.translate(dx, dy);
                }
            }
        }
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.color = color;
    }

    /// `<type> <geometry…> <rgb> [id]`, the form used inside `add` and
    /// `sketch` lines.
    pub fn encode(&self) -> String {
        let mut out = String::from(self.shape_type().as_str());
        match &self.kind {
            ShapeKind::Ellipse(c) | ShapeKind::Rectangle(c) => {
                let _ = write!(out, " {} {} {} {}", c.x1, c.y1, c.x2, c.y2);
            }
            ShapeKind::Segment { start, end } => {
                let _ = write!(out, " {} {} {} {}", start.x, start.y, end.x, end.y);
            }
            ShapeKind::Polyline { points } => {
                out.push(' ');
                for point in points {
                    let _ = write!(out, "{},{},", point.x, point.y);
                }
            }
        }
        let _ = write!(out, " {}", self.color);
        if let Some(id) = &self.id {
            let _ = write!(out, " {id}");
        }
        out
    }

    /// Parses the fields produced by [`Shape::encode`], starting at the
    /// type token. A trailing field after the color is taken as the id.
    pub fn decode(fields: &[&str]) -> Result<Shape, FormatError> {
        let (type_token, rest) = fields.split_first().ok_or(FormatError::MissingFields {
            command: "shape",
            expected: 1,
            found: 0,
        })?;
        let shape_type: ShapeType = type_token.parse()?;
        let geometry_len = shape_type.geometry_len();
        let required = geometry_len + 1;
        if rest.len() < required {
            return Err(FormatError::MissingFields {
                command: shape_type.as_str(),
                expected: required + 1,
                found: fields.len(),
            });
        }
        if rest.len() > required + 1 {
            return Err(FormatError::TrailingFields(rest[required + 1].to_string()));
        }

        let kind = match shape_type {
            ShapeType::Ellipse => ShapeKind::Ellipse(parse_corners(&rest[..4])?),
            ShapeType::Rectangle => ShapeKind::Rectangle(parse_corners(&rest[..4])?),
            ShapeType::Segment => {
                let [start, end] = parse_pair(&rest[..4])?;
                ShapeKind::Segment { start, end }
            }
            ShapeType::Polyline => ShapeKind::Polyline {
                points: parse_points(rest[0])?,
            },
        };
        let color = Rgb(parse_int("rgb", rest[geometry_len])?);
        let id = rest.get(required).map(|id| id.to_string());
        Ok(Shape { id, color, kind })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

pub(crate) fn parse_int(field: &'static str, value: &str) -> Result<i32, FormatError> {
    value.parse().map_err(|_| FormatError::BadNumber {
        field,
        value: value.to_string(),
    })
}

fn parse_pair(fields: &[&str]) -> Result<[Point; 2], FormatError> {
    Ok([
        Point::new(parse_int("x1", fields[0])?, parse_int("y1", fields[1])?),
        Point::new(parse_int("x2", fields[2])?, parse_int("y2", fields[3])?),
    ])
}

fn parse_corners(fields: &[&str]) -> Result<Corners, FormatError> {
    let [a, b] = parse_pair(fields)?;
    Ok(Corners::new(a, b))
}

fn parse_points(token: &str) -> Result<Vec<Point>, FormatError> {
    let bad = || FormatError::BadPoints(token.to_string());
    let values = token
        .split(',')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<i32>().map_err(|_| bad()))
        .collect::<Result<Vec<_>, _>>()?;
    if values.is_empty() || values.len() % 2 != 0 {
        return Err(bad());
    }
    Ok(values
        .chunks_exact(2)
        .map(|pair| Point::new(pair[0], pair[1]))
        .collect())
}

pub fn distance_to_segment(x: i32, y: i32, start: Point, end: Point) -> f64 {
    let (px, py) = (f64::from(x), f64::from(y));
    let (x1, y1) = (f64::from(start.x), f64::from(start.y));
    let (x2, y2) = (f64::from(end.x), f64::from(end.y));
    let dx = x2 - x1;
    let dy = y2 - y1;
    if dx.abs() < f64::EPSILON && dy.abs() < f64::EPSILON {
        return ((px - x1).powi(2) + (py - y1).powi(2)).sqrt();
    }
    let t = ((px - x1) * dx + (py - y1) * dy) / (dx * dx + dy * dy);
    let t = t.clamp(0.0, 1.0);
    let proj_x = x1 + t * dx;
    let proj_y = y1 + t * dy;
    ((px - proj_x).powi(2) + (py - proj_y).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn corners_are_normalized() {
        let shape = Shape::rectangle(p(50, 60), p(10, 20), Rgb::BLACK);
        match shape.kind {
            ShapeKind::Rectangle(corners) => {
                assert_eq!(corners.min(), p(10, 20));
                assert_eq!(corners.max(), p(50, 60));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn rectangle_and_ellipse_hit_strict_interior() {
        for shape in [
            Shape::rectangle(p(10, 10), p(50, 50), Rgb::BLACK),
            Shape::ellipse(p(10, 10), p(50, 50), Rgb::BLACK),
        ] {
            assert!(shape.contains(30, 30));
            assert!(shape.contains(11, 49));
            assert!(!shape.contains(10, 30), "edge is outside");
            assert!(!shape.contains(30, 50), "edge is outside");
            assert!(!shape.contains(60, 30));
            assert!(!shape.contains(-5, -5));
        }
    }

    #[test]
    fn segment_hit_uses_tolerance() {
        let shape = Shape::segment(p(0, 0), p(100, 0), Rgb::BLACK);
        assert!(shape.contains(50, 0));
        assert!(shape.contains(50, 10));
        assert!(!shape.contains(50, 11));
        assert!(shape.contains(-6, 8), "distance 10 from the start point");
        assert!(!shape.contains(110, 5));
    }

    #[test]
    fn polyline_hit_takes_closest_edge() {
        let shape = Shape::polyline(vec![p(0, 0), p(100, 0), p(100, 100)], Rgb::BLACK);
        assert!(shape.contains(95, 50));
        assert!(shape.contains(50, -9));
        assert!(!shape.contains(50, 50));

        let dot = Shape::polyline(vec![p(5, 5)], Rgb::BLACK);
        assert!(dot.contains(10, 10));
        assert!(!dot.contains(30, 30));
    }

    #[test]
    fn move_by_translates_every_point() {
        let mut line = Shape::polyline(vec![p(0, 0), p(3, 4), p(-2, 8)], Rgb::BLACK);
        line.move_by(5, -1);
        assert_eq!(
            line.kind,
            ShapeKind::Polyline {
                points: vec![p(5, -1), p(8, 3), p(3, 7)]
            }
        );

        let mut rect = Shape::rectangle(p(10, 10), p(50, 50), Rgb::BLACK);
        rect.move_by(5, 5);
        assert_eq!(rect, Shape::rectangle(p(15, 15), p(55, 55), Rgb::BLACK));
    }

    #[test]
    fn drag_follows_gesture_per_type() {
        let mut rect = Shape::begin(ShapeType::Rectangle, p(40, 40), Rgb::BLACK);
        rect.drag(p(40, 40), p(10, 70));
        assert_eq!(rect, Shape::rectangle(p(10, 40), p(40, 70), Rgb::BLACK));

        let mut segment = Shape::begin(ShapeType::Segment, p(1, 1), Rgb::BLACK);
        segment.drag(p(1, 1), p(9, 9));
        segment.drag(p(1, 1), p(4, 2));
        assert_eq!(segment, Shape::segment(p(1, 1), p(4, 2), Rgb::BLACK));

        let mut line = Shape::begin(ShapeType::Polyline, p(0, 0), Rgb::BLACK);
        line.drag(p(0, 0), p(1, 1));
        line.drag(p(0, 0), p(2, 3));
        assert_eq!(
            line.kind,
            ShapeKind::Polyline {
                points: vec![p(0, 0), p(1, 1), p(2, 3)]
            }
        );
    }

    #[test]
    fn encode_matches_wire_grammar() {
        let rect = Shape::rectangle(p(10, 10), p(50, 50), Rgb::BLACK);
        assert_eq!(rect.encode(), "rectangle 10 10 50 50 -16777216");
        assert_eq!(
            rect.with_id("abc").encode(),
            "rectangle 10 10 50 50 -16777216 abc"
        );

        let line = Shape::polyline(vec![p(1, 2), p(3, 4)], Rgb(255));
        assert_eq!(line.encode(), "polyline 1,2,3,4, 255");
    }

    #[test]
    fn decode_round_trips_every_variant() {
        let shapes = [
            Shape::ellipse(p(-3, 4), p(20, 40), Rgb::from_rgb(10, 20, 30)),
            Shape::rectangle(p(0, 0), p(1, 1), Rgb::WHITE).with_id("r-1"),
            Shape::segment(p(90, 5), p(-7, 12), Rgb(0)),
            Shape::polyline(vec![p(0, 0), p(-5, 6), p(7, 8)], Rgb::BLACK).with_id("9f2c"),
        ];
        for shape in shapes {
            let encoded = shape.encode();
            let fields = encoded.split_whitespace().collect::<Vec<_>>();
            assert_eq!(Shape::decode(&fields), Ok(shape), "{encoded}");
        }
    }

    #[test]
    fn decode_rejects_bad_fields() {
        assert_eq!(
            Shape::decode(&["triangle", "1", "2", "3", "4", "5"]),
            Err(FormatError::UnknownShape("triangle".into()))
        );
        assert!(matches!(
            Shape::decode(&["rectangle", "1", "2", "3"]),
            Err(FormatError::MissingFields { expected: 6, found: 4, .. })
        ));
        assert!(matches!(
            Shape::decode(&["segment", "1", "x", "3", "4", "5"]),
            Err(FormatError::BadNumber { field: "y1", .. })
        ));
        assert_eq!(
            Shape::decode(&["polyline", "1,2,3,", "5"]),
            Err(FormatError::BadPoints("1,2,3,".into()))
        );
        assert_eq!(
            Shape::decode(&["ellipse", "1", "2", "3", "4", "5", "id", "extra"]),
            Err(FormatError::TrailingFields("extra".into()))
        );
    }

    #[test]
    fn rgb_components() {
        let color = Rgb::from_rgb(0x12, 0x34, 0x56);
        assert_eq!((color.red(), color.green(), color.blue()), (0x12, 0x34, 0x56));
        assert_eq!(Rgb::from_rgb(0, 0, 0), Rgb::BLACK);
        assert_eq!(Rgb::BLACK.to_string(), "-16777216");
    }
}
