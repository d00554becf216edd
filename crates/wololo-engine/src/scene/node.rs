use core::fmt;

use crate::coords::{Quaternion, Scalar, Vec3};

/// Dense, zero-based node index. Assigned once and never reused.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node type tag.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum NodeKind {
    Sphere,
    InfinitePlanarPartition,
    UnionOf,
    IntersectionOf,
    DifferenceOf,
}

impl NodeKind {
    /// Returns `true` for the three boolean combinators.
    #[inline]
    pub const fn is_binop(self) -> bool {
        matches!(self, NodeKind::UnionOf | NodeKind::IntersectionOf | NodeKind::DifferenceOf)
    }
}

/// Placement of a child node inside its parent's local frame.
///
/// This is a reference plus transform, not a new node.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NodeArgument {
    pub orientation: Quaternion,
    pub offset: Vec3,
    pub node: NodeId,
}

impl NodeArgument {
    /// Places `node` with no rotation and no offset.
    #[inline]
    pub fn new(node: NodeId) -> Self {
        Self {
            orientation: Quaternion::identity(),
            offset: Vec3::zero(),
            node,
        }
    }

    #[inline]
    pub fn with_orientation(mut self, orientation: Quaternion) -> Self {
        self.orientation = orientation;
        self
    }

    #[inline]
    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }
}

/// Kind-dependent node data.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NodePayload {
    Sphere { radius: Scalar },
    InfinitePlanarPartition { outward_normal: Vec3 },
    Binop { left: NodeArgument, right: NodeArgument },
}
