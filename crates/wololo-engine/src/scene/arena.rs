use crate::coords::{Scalar, Vec3};

use super::{ArenaError, NodeArgument, NodeId, NodeKind, NodePayload};

const WORD_BITS: usize = u64::BITS as usize;

/// Node ids are `u32`.
const MAX_CAPACITY: usize = u32::MAX as usize;

fn storage_bytes(capacity: usize, words: usize, name_len: usize) -> Option<usize> {
    let per_node = size_of::<NodeKind>() + size_of::<NodePayload>();
    capacity
        .checked_mul(per_node)?
        .checked_add(words.checked_mul(size_of::<u64>())?)?
        .checked_add(name_len)
}

/// Fixed-capacity, append-only storage for CSG nodes.
///
/// Layout: three index-parallel tables (kind, payload, non-root bit) plus an
/// optional display name. All storage is reserved up front in [`Arena::new`];
/// adding nodes never reallocates.
///
/// A node is a root iff no combinator has named it as a child. The non-root bit
/// is set eagerly when a combinator is added and is never cleared.
#[derive(Debug)]
pub struct Arena {
    name: Option<String>,
    capacity: usize,
    kinds: Vec<NodeKind>,
    payloads: Vec<NodePayload>,
    non_root: Vec<u64>,
}

impl Arena {
    /// Reserves storage for `capacity` nodes.
    ///
    /// An empty `name` is stored as no name. Capacities above `u32::MAX`, or
    /// whose storage size does not fit in `usize`, fail with
    /// [`ArenaError::OutOfMemory`].
    pub fn new(capacity: usize, name: &str) -> Result<Self, ArenaError> {
        let words = capacity / WORD_BITS + 1;
        let bytes = storage_bytes(capacity, words, name.len())
            .ok_or(ArenaError::OutOfMemory { bytes: usize::MAX })?;
        if capacity > MAX_CAPACITY {
            return Err(ArenaError::OutOfMemory { bytes });
        }

        let oom = |_| ArenaError::OutOfMemory { bytes };

        let mut kinds = Vec::new();
        kinds.try_reserve_exact(capacity).map_err(oom)?;
        let mut payloads = Vec::new();
        payloads.try_reserve_exact(capacity).map_err(oom)?;
        let mut non_root = Vec::new();
        non_root.try_reserve_exact(words).map_err(oom)?;
        non_root.resize(words, 0);

        let name = if name.is_empty() {
            None
        } else {
            let mut owned = String::new();
            owned.try_reserve_exact(name.len()).map_err(oom)?;
            owned.push_str(name);
            Some(owned)
        };

        Ok(Self { name, capacity, kinds, payloads, non_root })
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of nodes created so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Fails with [`ArenaError::InvalidRadius`] unless `radius` is positive and finite.
    pub fn add_sphere(&mut self, radius: Scalar) -> Result<NodeId, ArenaError> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(ArenaError::InvalidRadius { radius });
        }
        self.push(NodeKind::Sphere, NodePayload::Sphere { radius })
    }

    pub fn add_infinite_plane(&mut self, outward_normal: Vec3) -> Result<NodeId, ArenaError> {
        self.push(
            NodeKind::InfinitePlanarPartition,
            NodePayload::InfinitePlanarPartition { outward_normal },
        )
    }

    pub fn add_union(
        &mut self,
        left: NodeArgument,
        right: NodeArgument,
    ) -> Result<NodeId, ArenaError> {
        self.push_binop(NodeKind::UnionOf, left, right)
    }

    pub fn add_intersection(
        &mut self,
        left: NodeArgument,
        right: NodeArgument,
    ) -> Result<NodeId, ArenaError> {
        self.push_binop(NodeKind::IntersectionOf, left, right)
    }

    pub fn add_difference(
        &mut self,
        left: NodeArgument,
        right: NodeArgument,
    ) -> Result<NodeId, ArenaError> {
        self.push_binop(NodeKind::DifferenceOf, left, right)
    }

    /// Returns `true` iff no combinator references `node` as a child.
    ///
    /// # Panics
    /// Panics if `node` was not created by this arena.
    pub fn is_root(&self, node: NodeId) -> bool {
        let i = node.index();
        assert!(i < self.len(), "is_root: node {node} out of range ({} nodes)", self.len());
        self.non_root[i / WORD_BITS] & (1u64 << (i % WORD_BITS)) == 0
    }

    /// Nodes that are not referenced by any combinator, in creation order.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.len() as u32).map(NodeId).filter(|&n| self.is_root(n))
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.kinds.get(node.index()).copied()
    }

    pub fn payload(&self, node: NodeId) -> Option<&NodePayload> {
        self.payloads.get(node.index())
    }

    fn allocate(&self) -> Result<NodeId, ArenaError> {
        if self.is_full() {
            return Err(ArenaError::Full { capacity: self.capacity });
        }
        Ok(NodeId(self.len() as u32))
    }

    fn push(&mut self, kind: NodeKind, payload: NodePayload) -> Result<NodeId, ArenaError> {
        let node = self.allocate()?;
        self.kinds.push(kind);
        self.payloads.push(payload);
        Ok(node)
    }

    fn push_binop(
        &mut self,
        kind: NodeKind,
        left: NodeArgument,
        right: NodeArgument,
    ) -> Result<NodeId, ArenaError> {
        self.allocate()?;
        self.check_exists(left.node)?;
        self.check_exists(right.node)?;

        let node = self.push(kind, NodePayload::Binop { left, right })?;
        self.mark_non_root(left.node);
        self.mark_non_root(right.node);
        Ok(node)
    }

    fn check_exists(&self, node: NodeId) -> Result<(), ArenaError> {
        if node.index() < self.len() {
            Ok(())
        } else {
            Err(ArenaError::UnknownNode { node, count: self.len() })
        }
    }

    #[inline]
    fn mark_non_root(&mut self, node: NodeId) {
        let i = node.index();
        self.non_root[i / WORD_BITS] |= 1u64 << (i % WORD_BITS);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arg(node: NodeId) -> NodeArgument {
        NodeArgument::new(node)
    }

    // ── capacity ──────────────────────────────────────────────────────────

    #[test]
    fn zero_capacity_rejects_first_node() {
        let mut arena = Arena::new(0, "empty").unwrap();
        assert_eq!(arena.add_sphere(1.0), Err(ArenaError::Full { capacity: 0 }));
        assert!(arena.is_empty());
    }

    #[test]
    fn unrepresentable_capacity_is_out_of_memory() {
        assert!(matches!(Arena::new(usize::MAX, ""), Err(ArenaError::OutOfMemory { .. })));
        assert!(matches!(Arena::new(usize::MAX / 8, "x"), Err(ArenaError::OutOfMemory { .. })));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn capacity_beyond_node_ids_is_rejected() {
        let too_many = MAX_CAPACITY + 1;
        assert!(matches!(Arena::new(too_many, ""), Err(ArenaError::OutOfMemory { .. })));
    }

    #[test]
    fn storage_size_overflow_is_detected() {
        assert_eq!(storage_bytes(usize::MAX, 1, 0), None);
        assert_eq!(storage_bytes(0, usize::MAX, 0), None);
        assert_eq!(storage_bytes(0, 1, 3), Some(8 + 3));
    }

    #[test]
    fn empty_name_is_none() {
        assert_eq!(Arena::new(4, "").unwrap().name(), None);
        assert_eq!(Arena::new(4, "scene").unwrap().name(), Some("scene"));
    }

    #[test]
    fn full_binop_does_not_mark_children() {
        let mut arena = Arena::new(2, "").unwrap();
        let a = arena.add_sphere(1.0).unwrap();
        let b = arena.add_sphere(2.0).unwrap();
        assert_eq!(arena.add_union(arg(a), arg(b)), Err(ArenaError::Full { capacity: 2 }));
        assert!(arena.is_root(a));
        assert!(arena.is_root(b));
    }

    // ── payload validation ────────────────────────────────────────────────

    #[test]
    fn non_positive_radius_is_rejected() {
        let mut arena = Arena::new(4, "").unwrap();
        assert_eq!(arena.add_sphere(0.0), Err(ArenaError::InvalidRadius { radius: 0.0 }));
        assert_eq!(arena.add_sphere(-1.5), Err(ArenaError::InvalidRadius { radius: -1.5 }));
        assert!(matches!(arena.add_sphere(f64::NAN), Err(ArenaError::InvalidRadius { .. })));
        assert!(matches!(arena.add_sphere(f64::INFINITY), Err(ArenaError::InvalidRadius { .. })));
        assert!(arena.is_empty());
        assert!(arena.add_sphere(0.25).is_ok());
    }

    // ── root tracking ─────────────────────────────────────────────────────

    #[test]
    fn union_of_two_spheres() {
        let mut arena = Arena::new(8, "union").unwrap();
        let s1 = arena.add_sphere(1.0).unwrap();
        let s2 = arena.add_sphere(1.0).unwrap();
        let u = arena.add_union(arg(s1), arg(s2)).unwrap();

        assert!(!arena.is_root(s1));
        assert!(!arena.is_root(s2));
        assert!(arena.is_root(u));
        assert_eq!(arena.roots().collect::<Vec<_>>(), vec![u]);
        assert_eq!(arena.kind(u), Some(NodeKind::UnionOf));
    }

    #[test]
    fn shared_child_stays_non_root() {
        let mut arena = Arena::new(8, "").unwrap();
        let s = arena.add_sphere(1.0).unwrap();
        let p = arena.add_infinite_plane(Vec3::new(0.0, 1.0, 0.0)).unwrap();
        let i = arena.add_intersection(arg(s), arg(p)).unwrap();
        let d = arena.add_difference(arg(s), arg(p)).unwrap();

        assert!(!arena.is_root(s));
        assert!(!arena.is_root(p));
        assert!(arena.is_root(i));
        assert!(arena.is_root(d));
    }

    #[test]
    fn self_pairing_marks_once() {
        let mut arena = Arena::new(4, "").unwrap();
        let s = arena.add_sphere(0.5).unwrap();
        let u = arena.add_union(arg(s), arg(s)).unwrap();
        assert!(!arena.is_root(s));
        assert!(arena.is_root(u));
    }

    #[test]
    fn forward_reference_is_rejected() {
        let mut arena = Arena::new(4, "").unwrap();
        let s = arena.add_sphere(1.0).unwrap();
        let ghost = NodeId(3);
        assert_eq!(
            arena.add_union(arg(s), arg(ghost)),
            Err(ArenaError::UnknownNode { node: ghost, count: 1 })
        );
        assert_eq!(arena.len(), 1);
        assert!(arena.is_root(s));
    }

    #[test]
    fn binop_payload_keeps_placement() {
        let mut arena = Arena::new(4, "").unwrap();
        let a = arena.add_sphere(1.0).unwrap();
        let b = arena.add_sphere(2.0).unwrap();
        let left = arg(a).with_offset(Vec3::new(-1.0, 0.0, 0.0));
        let right = arg(b).with_offset(Vec3::new(1.0, 0.0, 0.0));
        let d = arena.add_difference(left, right).unwrap();

        assert_eq!(arena.payload(d), Some(&NodePayload::Binop { left, right }));
        assert_eq!(arena.payload(a), Some(&NodePayload::Sphere { radius: 1.0 }));
    }

    #[test]
    fn roots_span_word_boundary() {
        let mut arena = Arena::new(130, "").unwrap();
        let ids: Vec<_> = (0..128).map(|_| arena.add_sphere(1.0).unwrap()).collect();
        arena.add_union(arg(ids[63]), arg(ids[64])).unwrap();

        assert!(!arena.is_root(ids[63]));
        assert!(!arena.is_root(ids[64]));
        assert!(arena.is_root(ids[62]));
        assert!(arena.is_root(ids[65]));
        assert_eq!(arena.roots().count(), 127);
    }

    // ── properties ────────────────────────────────────────────────────────

    proptest! {
        #[test]
        fn exactly_capacity_nodes_fit(capacity in 0usize..200) {
            let mut arena = Arena::new(capacity, "prop").unwrap();
            for i in 0..capacity {
                let node = arena.add_sphere(1.0).unwrap();
                prop_assert_eq!(node.index(), i);
            }
            prop_assert_eq!(arena.add_sphere(1.0), Err(ArenaError::Full { capacity }));
            prop_assert_eq!(arena.len(), capacity);
        }

        #[test]
        fn non_root_is_monotone(
            leaves in 2usize..40,
            picks in proptest::collection::vec((any::<prop::sample::Index>(), any::<prop::sample::Index>(), 0u8..3), 1..30),
        ) {
            let mut arena = Arena::new(leaves + picks.len(), "").unwrap();
            for _ in 0..leaves {
                arena.add_sphere(1.0).unwrap();
            }

            let mut referenced = vec![false; leaves + picks.len()];
            for (l, r, op) in picks {
                let left = NodeId(l.index(arena.len()) as u32);
                let right = NodeId(r.index(arena.len()) as u32);
                let node = match op {
                    0 => arena.add_union(arg(left), arg(right)),
                    1 => arena.add_intersection(arg(left), arg(right)),
                    _ => arena.add_difference(arg(left), arg(right)),
                }.unwrap();
                prop_assert!(arena.is_root(node));

                referenced[left.index()] = true;
                referenced[right.index()] = true;
                for i in 0..arena.len() {
                    prop_assert_eq!(arena.is_root(NodeId(i as u32)), !referenced[i]);
                }
            }
        }
    }
}
