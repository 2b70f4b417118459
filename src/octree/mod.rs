//! Sparse octree over the active cells of one chunk.
//!
//! Nodes live in a flat arena and refer to their children by [`NodeId`].
//! Slots freed by simplification are recycled by later insertions.
use glam::{ IVec3, Vec3 };
use crate::{ CornerMask, CORNER_OFFSETS, octant_index };

mod assemble;

mod simplify;
pub use simplify::*;

/// Stable handle to a node in an [`Octree`] arena.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// What a leaf contributes to the mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawInfo {
    /// Chunk-local lattice position of the dual vertex
    pub position: Vec3,
    pub normal: Vec3,
    pub corners: CornerMask,
    /// Assigned once, when the vertex buffer is written
    pub vertex_index: Option<u32>,
}

impl DrawInfo {
    pub fn new(position: Vec3, normal: Vec3, corners: CornerMask) -> Self {
        Self {
            position,
            normal,
            corners,
            vertex_index: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Empty slots are regions without surface
    Internal { children: [Option<NodeId>; 8] },
    Leaf(DrawInfo),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OctreeNode {
    /// Chunk-local lattice corner
    pub min: IVec3,
    /// Edge length in lattice units, always a power of two
    pub size: i32,
    pub kind: NodeKind,
}

impl OctreeNode {
    pub fn leaf(min: IVec3, size: i32, draw: DrawInfo) -> Self {
        assert!(size > 0 && (size & (size - 1)) == 0, "node size {size} is not a power of two");
        Self {
            min,
            size,
            kind: NodeKind::Leaf(draw),
        }
    }

    pub fn internal(min: IVec3, size: i32) -> Self {
        assert!(size > 1 && (size & (size - 1)) == 0, "internal node size {size} is not a power of two");
        Self {
            min,
            size,
            kind: NodeKind::Internal { children: [None; 8] },
        }
    }

    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn draw_info(&self) -> Option<&DrawInfo> {
        match &self.kind {
            NodeKind::Leaf(draw) => Some(draw),
            NodeKind::Internal { .. } => None,
        }
    }

    pub fn children(&self) -> Option<&[Option<NodeId>; 8]> {
        match &self.kind {
            NodeKind::Internal { children } => Some(children),
            NodeKind::Leaf(_) => None,
        }
    }

    /// Lattice corner of child slot `slot`.
    pub fn child_min(&self, slot: usize) -> IVec3 {
        self.min + CORNER_OFFSETS[slot] * (self.size / 2)
    }

    /// Child slot containing `point`, which must lie inside this node.
    pub fn child_slot(&self, point: IVec3) -> usize {
        let half = self.size / 2;
        octant_index((point - self.min) / half)
    }

    pub fn contains(&self, point: IVec3) -> bool {
        point.cmpge(self.min).all() && point.cmplt(self.min + IVec3::splat(self.size)).all()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Octree {
    nodes: Vec<Option<OctreeNode>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    size: i32,
}

impl Octree {
    /// An empty tree spanning `size` lattice units.
    pub fn new(size: i32) -> Self {
        assert!(size > 0 && (size & (size - 1)) == 0, "octree size {size} is not a power of two");
        Self {
            size,
            ..Default::default()
        }
    }

    #[inline(always)]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    #[inline(always)]
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub(crate) fn set_root(&mut self, root: Option<NodeId>) {
        if let Some(root) = root {
            let node = self.get(root);
            assert!(node.min == IVec3::ZERO && node.size == self.size, "root must span the whole tree");
        }
        self.root = root;
    }

    /// Stores `node` and returns its handle, reusing a released slot if there is one.
    pub fn insert(&mut self, node: OctreeNode) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = Some(node);
                id
            },
            None => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(Some(node));
                id
            },
        }
    }

    /// Drops the node in slot `id`. Its children are not touched.
    pub(crate) fn release(&mut self, id: NodeId) {
        let slot = self.nodes[id.index()].take();
        assert!(slot.is_some(), "node {id:?} released twice");
        self.free.push(id);
    }

    pub fn get(&self, id: NodeId) -> &OctreeNode {
        self.nodes[id.index()].as_ref().expect("dangling octree node handle")
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut OctreeNode {
        self.nodes[id.index()].as_mut().expect("dangling octree node handle")
    }

    pub fn child(&self, id: NodeId, slot: usize) -> Option<NodeId> {
        self.get(id).children().and_then(|children| children[slot])
    }

    /// Attaches `child` to the matching slot of `parent`.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) -> usize {
        let (child_min, child_size) = {
            let child = self.get(child);
            (child.min, child.size)
        };

        let parent_node = self.get_mut(parent);
        assert_eq!(parent_node.size, child_size * 2, "child size does not halve parent size");
        let slot = parent_node.child_slot(child_min);
        assert_eq!(parent_node.child_min(slot), child_min, "child is not aligned to its parent");

        match &mut parent_node.kind {
            NodeKind::Internal { children } => {
                assert!(children[slot].is_none(), "child slot {slot} filled twice");
                children[slot] = Some(child);
            },
            NodeKind::Leaf(_) => panic!("attaching a child to a leaf"),
        }
        slot
    }

    /// Deepest node containing the chunk-local lattice `point`.
    pub fn locate(&self, point: IVec3) -> Option<NodeId> {
        let mut current = self.root?;
        if !self.get(current).contains(point) {
            return None;
        }

        loop {
            let node = self.get(current);
            if node.is_leaf() {
                return Some(current);
            }
            match self.child(current, node.child_slot(point)) {
                Some(child) => current = child,
                None => return Some(current),
            }
        }
    }

    /// Number of levels below the root; a lone root leaf has depth 0.
    pub fn depth(&self) -> usize {
        fn depth_of(tree: &Octree, id: NodeId) -> usize {
            match tree.get(id).children() {
                Some(children) => 1 + children.iter().flatten().map(|child| depth_of(tree, *child)).max().unwrap_or(0),
                None => 0,
            }
        }

        self.root.map(|root| depth_of(self, root)).unwrap_or(0)
    }

    /// Live leaves in depth-first, child slot order.
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            match self.get(id).children() {
                // Reversed so slot 0 comes off the stack first
                Some(children) => stack.extend(children.iter().rev().flatten()),
                None => leaves.push(id),
            }
        }
        leaves
    }
}

#[test]
fn arena_recycles_slots() {
    let mut tree = Octree::new(2);
    let a = tree.insert(OctreeNode::leaf(IVec3::ZERO, 1, DrawInfo::new(Vec3::ZERO, Vec3::Y, CornerMask::EMPTY)));
    let b = tree.insert(OctreeNode::leaf(IVec3::ONE, 1, DrawInfo::new(Vec3::ONE, Vec3::Y, CornerMask::EMPTY)));
    assert_eq!(tree.len(), 2);

    tree.release(a);
    assert_eq!(tree.len(), 1);
    let c = tree.insert(OctreeNode::internal(IVec3::ZERO, 2));
    assert_eq!(c, a);
    assert_eq!(tree.len(), 2);

    assert_eq!(tree.attach(c, b), 7);
    assert_eq!(tree.child(c, 7), Some(b));
    assert_eq!(tree.child(c, 0), None);
}

#[test]
#[should_panic]
fn arena_dangling_handle_panics() {
    let mut tree = Octree::new(1);
    let a = tree.insert(OctreeNode::leaf(IVec3::ZERO, 1, DrawInfo::new(Vec3::ZERO, Vec3::Y, CornerMask::EMPTY)));
    tree.release(a);
    tree.get(a);
}

#[test]
#[should_panic]
fn attach_rejects_misaligned_child() {
    let mut tree = Octree::new(4);
    let parent = tree.insert(OctreeNode::internal(IVec3::ZERO, 4));
    let child = tree.insert(OctreeNode::leaf(IVec3::new(1, 0, 0), 2, DrawInfo::new(Vec3::ZERO, Vec3::Y, CornerMask::EMPTY)));
    tree.attach(parent, child);
}

#[test]
fn node_child_slots() {
    let node = OctreeNode::internal(IVec3::new(8, 0, 16), 8);
    assert_eq!(node.child_slot(IVec3::new(8, 0, 16)), 0);
    assert_eq!(node.child_slot(IVec3::new(12, 3, 20)), 5);
    assert_eq!(node.child_min(5), IVec3::new(12, 0, 20));
    assert_eq!(node.child_min(6), IVec3::new(12, 4, 16));
    assert!(node.contains(IVec3::new(15, 7, 23)));
    assert!(!node.contains(IVec3::new(16, 7, 23)));
}
