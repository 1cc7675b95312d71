use thiserror::Error;

/// A wire line that could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("empty line")]
    Empty,
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("`{command}` needs {expected} fields, got {found}")]
    MissingFields {
        command: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("field `{field}` is not an integer: `{value}`")]
    BadNumber { field: &'static str, value: String },
    #[error("unknown shape type `{0}`")]
    UnknownShape(String),
    #[error("malformed polyline points `{0}`")]
    BadPoints(String),
    #[error("unexpected trailing fields after `{0}`")]
    TrailingFields(String),
    #[error("snapshot is missing its braces")]
    MissingBraces,
    #[error("line of {length} bytes exceeds the {max} byte limit")]
    TooLong { length: usize, max: usize },
}

/// A command referenced an id the store does not (or already does) hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("no shape with id `{0}`")]
    Missing(String),
    #[error("shape id `{0}` is already live")]
    Duplicate(String),
    #[error("shape has no id")]
    Unassigned,
}
