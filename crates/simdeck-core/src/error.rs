//! Error types for registry operations and filename sequencing.

/// Errors raised while deriving a numeric file range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    /// The filename contains no usable run of decimal digits.
    #[error("malformed file name {0:?}: no numeric index")]
    MalformedFilename(String),

    /// The start index is greater than the end index.
    #[error("invalid file range: start index {start} is after end index {end}")]
    InvalidRange {
        /// Index parsed from the start file name.
        start: u64,
        /// Index parsed from the end file name.
        end: u64,
    },
}

/// Errors raised by [`Registry`](crate::Registry) operations.
///
/// A failed operation never leaves the registry partially modified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A required field was absent or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The requested type has no bucket in the registry.
    #[error("simulation type not found: {0}")]
    TypeNotFound(String),

    /// No entry carries the given simulation name.
    #[error("simulation not found: {0}")]
    NotFound(String),

    /// Another entry already carries this name.
    #[error("simulation name already in use: {0}")]
    DuplicateName(String),

    /// The start/end file names do not form a valid range.
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}
