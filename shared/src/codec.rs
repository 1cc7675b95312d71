//! Line-oriented wire commands.
//!
//! Every command is one line of space-separated fields:
//!
//! ```text
//! add <type> <geometry…> <rgb> [id]
//! move <id> <dx> <dy>
//! recolor <id> <rgb>
//! delete <id>
//! sketch { <shape>, <shape>, … }
//! ```

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::error::FormatError;
use crate::shape::{parse_int, Rgb, Shape, ShapeId, ShapeType};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Add(Shape),
    Move { id: ShapeId, dx: i32, dy: i32 },
    Recolor { id: ShapeId, color: Rgb },
    Delete { id: ShapeId },
    Sketch(Vec<Shape>),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Add(_) => "add",
            Command::Move { .. } => "move",
            Command::Recolor { .. } => "recolor",
            Command::Delete { .. } => "delete",
            Command::Sketch(_) => "sketch",
        }
    }

    /// Id of the shape this command refers to, if it carries one.
    pub fn target(&self) -> Option<&str> {
        match self {
            Command::Add(shape) => shape.id.as_deref(),
            Command::Move { id, .. } | Command::Recolor { id, .. } | Command::Delete { id } => {
                Some(id)
            }
            Command::Sketch(_) => None,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Command::Add(shape) => format!("add {}", shape.encode()),
            Command::Move { id, dx, dy } => format!("move {id} {dx} {dy}"),
            Command::Recolor { id, color } => format!("recolor {id} {color}"),
            Command::Delete { id } => format!("delete {id}"),
            Command::Sketch(shapes) if shapes.is_empty() => "sketch { }".to_string(),
            Command::Sketch(shapes) => {
                let entries = shapes.iter().map(Shape::encode).collect::<Vec<_>>();
                format!("sketch {{ {} }}", entries.join(", "))
            }
        }
    }

    pub fn decode(line: &str) -> Result<Command, FormatError> {
        let line = line.trim();
        let fields = line.split_whitespace().collect::<Vec<_>>();
        let Some((&keyword, rest)) = fields.split_first() else {
            return Err(FormatError::Empty);
        };
        match keyword {
            "add" => {
                if rest.is_empty() {
                    return Err(FormatError::MissingFields {
                        command: "add",
                        expected: 7,
                        found: fields.len(),
                    });
                }
                Shape::decode(rest).map(Command::Add)
            }
            "move" => {
                let [id, dx, dy] = exact_fields::<3>("move", rest)?;
                Ok(Command::Move {
                    id: id.to_string(),
                    dx: parse_int("dx", dx)?,
                    dy: parse_int("dy", dy)?,
                })
            }
            "recolor" => {
                let [id, color] = exact_fields::<2>("recolor", rest)?;
                Ok(Command::Recolor {
                    id: id.to_string(),
                    color: Rgb(parse_int("rgb", color)?),
                })
            }
            "delete" => {
                let [id] = exact_fields::<1>("delete", rest)?;
                Ok(Command::Delete { id: id.to_string() })
            }
            "sketch" => decode_snapshot(line).map(Command::Sketch),
            other => Err(FormatError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Command {
    type Err = FormatError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        Command::decode(line)
    }
}

fn exact_fields<'a, const N: usize>(
    command: &'static str,
    fields: &[&'a str],
) -> Result<[&'a str; N], FormatError> {
    if fields.len() > N {
        return Err(FormatError::TrailingFields(fields[N].to_string()));
    }
    fields.try_into().map_err(|_| FormatError::MissingFields {
        command,
        expected: N + 1,
        found: fields.len() + 1,
    })
}

// Entries are separated by ", " but polyline joints also contain commas, so
// entries are walked by field count instead of split on the separator.
fn decode_snapshot(line: &str) -> Result<Vec<Shape>, FormatError> {
    let open = line.find('{').ok_or(FormatError::MissingBraces)?;
    let close = line
        .rfind('}')
        .filter(|close| *close > open)
        .ok_or(FormatError::MissingBraces)?;
    let tokens = line[open + 1..close].split_whitespace().collect::<Vec<_>>();

    let mut shapes = Vec::new();
    let mut cursor = 0;
    while cursor < tokens.len() {
        match snapshot_entry(&tokens[cursor..]) {
            Ok((shape, used)) => {
                shapes.push(shape);
                cursor += used;
            }
            Err(error) => {
                warn!(%error, "skipping malformed snapshot entry");
                cursor += 1;
                while cursor < tokens.len() && tokens[cursor].parse::<ShapeType>().is_err() {
                    cursor += 1;
                }
            }
        }
    }
    Ok(shapes)
}

fn snapshot_entry(tokens: &[&str]) -> Result<(Shape, usize), FormatError> {
    let shape_type = tokens[0].parse::<ShapeType>()?;
    let color_at = shape_type.geometry_len() + 1;
    let Some(&color) = tokens.get(color_at) else {
        return Err(FormatError::MissingFields {
            command: shape_type.as_str(),
            expected: color_at + 1,
            found: tokens.len(),
        });
    };

    let mut fields = tokens[..color_at].to_vec();
    let used = if let Some(color) = color.strip_suffix(',') {
        fields.push(color);
        color_at + 1
    } else {
        fields.push(color);
        match tokens.get(color_at + 1) {
            Some(id) => {
                fields.push(id.strip_suffix(',').unwrap_or(id));
                color_at + 2
            }
            None => color_at + 1,
        }
    };
    Shape::decode(&fields).map(|shape| (shape, used))
}
