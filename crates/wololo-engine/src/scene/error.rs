use crate::coords::Scalar;

use super::NodeId;

/// Failures reported by [`super::Arena`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArenaError {
    /// Every slot up to the declared capacity is in use.
    #[error("node arena is full (capacity {capacity})")]
    Full { capacity: usize },

    /// The backing storage could not be obtained from the allocator.
    ///
    /// `bytes` is `usize::MAX` when the size itself does not fit in `usize`.
    #[error("failed to allocate {bytes} bytes for a node arena")]
    OutOfMemory { bytes: usize },

    /// Sphere radius that is zero, negative or not finite.
    #[error("sphere radius must be positive and finite, got {radius}")]
    InvalidRadius { radius: Scalar },

    /// A combinator referenced a node that has not been created yet.
    #[error("node {node} does not exist (arena holds {count} nodes)")]
    UnknownNode { node: NodeId, count: usize },
}
