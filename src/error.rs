use thiserror::Error;

use crate::segment::Kind;

/// Errors raised by segment maintenance and queries.
///
/// Apart from `DegenerateFit`, every variant signals a broken caller
/// contract rather than a condition worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FitError {
    #[error("index {index} has no tracked position")]
    InvalidPoint { index: usize },

    #[error("{0} segments carry no fit")]
    NoFitForKind(Kind),

    #[error("degenerate fit: {0}")]
    DegenerateFit(&'static str),

    #[error("{0} segments cannot carry endpoints")]
    NotLineLike(Kind),

    #[error("endpoints must be increasing present indices strictly inside the segment")]
    InvalidEndpoints,

    #[error("invalid children: {0}")]
    InvalidChildren(&'static str),

    #[error("index {index} is not the next sample beside the window (expected {expected:?})")]
    NotAdjacent {
        index: usize,
        expected: Option<usize>,
    },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}
