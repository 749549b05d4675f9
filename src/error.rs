//! Error types surfaced by the aligner.

use std::error::Error;
use std::fmt;

/// Errors raised while constructing an aligner or walking a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlignError {
    /// The lane type cannot represent `read_len * match_score`. Raised at
    /// construction; the aligner cannot be built with these parameters.
    InsufficientLaneWidth {
        read_len: usize,
        match_score: u8,
        lane_span: i32,
    },
    /// A node listed a predecessor that has not been visited yet, so the
    /// iterator is not in topological order. The current call fails; the
    /// aligner itself remains usable.
    InvalidNodeOrdering { node: u64, missing: u64 },
}

impl fmt::Display for AlignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignError::InsufficientLaneWidth {
                read_len,
                match_score,
                lane_span,
            } => write!(
                f,
                "insufficient lane width: read length {read_len} * match score \
                 {match_score} exceeds the representable span {lane_span}"
            ),
            AlignError::InvalidNodeOrdering { node, missing } => write!(
                f,
                "invalid node ordering: node {node} references predecessor \
                 {missing} before it was visited"
            ),
        }
    }
}

impl Error for AlignError {}

/// Errors from parsing a [`ScoreProfile`](crate::scoring::ScoreProfile) out
/// of a profile string or an aligner command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileParseError {
    /// A `K=V` token was malformed.
    InvalidToken(String),
    /// A numeric field failed to parse.
    InvalidValue { key: String, value: String },
    /// The command line did not identify a supported program.
    UnsupportedProgram(String),
    /// A required flag was missing from the command line.
    MissingFlag { program: &'static str, flag: &'static str },
}

impl fmt::Display for ProfileParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileParseError::InvalidToken(tok) => {
                write!(f, "invalid profile token: {tok:?}")
            }
            ProfileParseError::InvalidValue { key, value } => {
                write!(f, "invalid value for {key}: {value:?}")
            }
            ProfileParseError::UnsupportedProgram(cl) => {
                write!(f, "unsupported program id: {cl:?}")
            }
            ProfileParseError::MissingFlag { program, flag } => {
                write!(f, "{program}: expected flag {flag}")
            }
        }
    }
}

impl Error for ProfileParseError {}
