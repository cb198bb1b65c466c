use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpecParseError {
    #[error("Spec is empty (expected at least a root line)")]
    EmptySpec,

    #[error("Tab indentation at line {0} (indent with spaces only)")]
    TabIndentation(usize),

    #[error("Line {0} carries a relation marker but is the root (the first line must be a bare alias)")]
    MarkedRoot(usize),

    #[error("Line {0} has no relation marker (every non-root line needs '-', '<', 'x' or a 'p' prefix)")]
    MissingMarker(usize),

    #[error("Missing alias at line {0} (a relation marker must be followed by a name)")]
    MissingAlias(usize),

    #[error("Invalid relation marker at line {0}: '{1}'")]
    InvalidMarker(usize, String),

    #[error("Duplicate alias '{0}' (aliases must be unique within one spec)")]
    DuplicateAlias(String),

    #[error("{supplied} option entries supplied for {lines} spec lines (options are matched by line order)")]
    TooManyOptions { supplied: usize, lines: usize },

    #[error("Splice anchor {0} is out of range (spec has {1} lines)")]
    SpliceOutOfRange(usize, usize),
}
