use std::io;

/// Reason a textual field could not be turned into a number or bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ParseError {
    #[display("empty field")]
    Empty,
    #[display("not numeric")]
    NotNumeric,
    #[display("negative count")]
    NegativeCount,
    #[display("multiple range delimiters")]
    MultipleDelimiters,
    #[display("range lower bound exceeds upper bound")]
    InvertedRange,
    #[display("unrecognized bucket syntax")]
    UnrecognizedSyntax,
}

/// Where in the input a degenerate value was detected.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum Location {
    #[display("bucket {index} ({label:?})")]
    Bucket { index: usize, label: String },
    #[display("row {index}")]
    Row { index: usize },
    #[display("column {index}")]
    Column { index: usize },
    #[display("group {index}")]
    Group { index: usize },
    #[display("input")]
    Input,
}

/// Errors raised while building tables, computing expected values or
/// aggregating statistics.
///
/// Row indices count data rows from zero, excluding any header line.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum EngineError {
    #[display("data row {row}: cannot parse {text:?}: {source}")]
    Parse {
        row: usize,
        text: String,
        source: ParseError,
    },
    #[display("data row {row}: expected {expected} fields, found {found}")]
    Shape {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[display("cannot admit worker threads: {source}")]
    ConcurrencyAdmission { source: io::Error },
    #[display("degenerate input at {location}: {reason}")]
    DegenerateInput {
        location: Location,
        reason: String,
    },
    #[display("invalid {name} distribution: {reason}")]
    Distribution { name: &'static str, reason: String },
}

impl EngineError {
    pub(crate) fn degenerate(location: Location, reason: impl Into<String>) -> Self {
        Self::DegenerateInput {
            location,
            reason: reason.into(),
        }
    }
}
