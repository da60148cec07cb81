use std::error::Error;
use std::fmt;
use thiserror::Error as ThisError;

/// Errors surfaced by [`ReuseTree`](crate::ReuseTree) mutations.
///
/// Argument checks run before any write, so a returned error means the tree
/// is exactly as it was when the offending call started. The exception is
/// [`NonDeterministic`](ReuseError::NonDeterministic), where the matched
/// prefix wrote nothing and detection stops the loop at the conflicting
/// position.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ReuseError<O> {
    /// The SUL produced an output that contradicts a cached observation.
    #[error(
        "non-deterministic behavior at position {position}: \
         cached output {cached:?}, observed {observed:?}"
    )]
    NonDeterministic {
        position: usize,
        cached: O,
        observed: O,
    },

    /// Input word and output word must have equal length.
    #[error("query length {query_len} does not match output length {output_len}")]
    LengthMismatch { query_len: usize, output_len: usize },

    /// An input symbol of the inserted word is not part of the alphabet.
    #[error("input symbol at position {position} is not part of the alphabet")]
    UnknownSymbol { position: usize },

    /// The node id passed to a suffix insert does not exist in the current
    /// tree generation.
    #[error("node id {id} does not exist in this tree generation")]
    UnknownNode { id: usize },
}

/// Error returned by [`ReuseOracle`](crate::ReuseOracle) query processing:
/// either the cache layer rejected the observation or the SUL driver failed.
///
/// A failed driver call leaves the tree untouched.
#[derive(Debug)]
pub enum QueryError<O, E> {
    Cache(ReuseError<O>),
    Sul(E),
}

impl<O: fmt::Debug, E: fmt::Display> fmt::Display for QueryError<O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Cache(err) => write!(f, "{err}"),
            QueryError::Sul(err) => write!(f, "SUL driver failed: {err}"),
        }
    }
}

impl<O: fmt::Debug, E: Error> Error for QueryError<O, E> {}

impl<O, E> From<ReuseError<O>> for QueryError<O, E> {
    fn from(err: ReuseError<O>) -> Self {
        QueryError::Cache(err)
    }
}
