use thiserror::Error;

/// Failures that surface from an aggregate search.
///
/// Adapter failures never appear here: they are isolated per source and
/// contribute an empty result instead.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no event sources registered")]
    NoSources,

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}
