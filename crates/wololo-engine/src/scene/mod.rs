//! CSG scene storage.
//!
//! Nodes live in a fixed-capacity [`Arena`] and are addressed by dense [`NodeId`]s.
//! The arena is append-only: nodes are never removed or reordered, and a node's
//! root status can only go from root to non-root.

mod arena;
mod error;
mod node;

pub use arena::Arena;
pub use error::ArenaError;
pub use node::{NodeArgument, NodeId, NodeKind, NodePayload};
