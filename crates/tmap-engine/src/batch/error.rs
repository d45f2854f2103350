use std::fmt;

use super::BufferKind;

/// Failure inside the batching engine.
///
/// Never returned from the public drawing calls; those log and drop the
/// primitive instead.
#[derive(Debug)]
pub enum BatchError {
    /// A single primitive needs more elements than the buffer holds.
    Capacity { kind: BufferKind, requested: usize, capacity: usize },
    /// The pending batch leaves no room; it must be flushed first.
    RingFull { kind: BufferKind, requested: usize, available: usize },
    /// The backend could not map a dynamic buffer.
    Backend { kind: BufferKind, source: anyhow::Error },
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::Capacity { kind, requested, capacity } => write!(
                f,
                "{kind:?} buffer cannot hold {requested} elements (capacity {capacity})"
            ),
            BatchError::RingFull { kind, requested, available } => write!(
                f,
                "{kind:?} buffer has {available} free elements in the current batch, \
                 {requested} requested"
            ),
            BatchError::Backend { kind, source } => {
                write!(f, "failed to map {kind:?} buffer: {source:#}")
            }
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BatchError::Backend { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
