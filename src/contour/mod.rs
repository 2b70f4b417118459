//! Mesh extraction from a finished octree.
//!
//! Vertices are numbered first, one per leaf. Triangles then come from the
//! usual Dual Contouring recursion: every minimal edge shared by four leaves
//! with a sign change along it becomes a quad over those leaves' vertices.
use arrayvec::ArrayVec;
use glam::Vec3;

use crate::{
    octree::{ Octree, NodeId, NodeKind, DrawInfo },
    EDGE_CORNERS,
};

mod tables;
use tables::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
}

/// Upper bounds on the buffers an emitter may fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshCapacity {
    pub vertices: usize,
    pub indices: usize,
}

impl MeshCapacity {
    pub const UNBOUNDED: Self = Self {
        vertices: u32::MAX as usize,
        indices: usize::MAX,
    };

    pub fn new(vertices: usize, indices: usize) -> Self {
        Self {
            vertices,
            indices,
        }
    }
}

impl Default for MeshCapacity {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EmitStatus {
    #[default]
    Complete,
    /// A capacity was reached and some geometry was left out
    Truncated,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MeshBuffers {
    pub vertices: Vec<Vertex>,
    /// Three per triangle, counter-clockwise seen from the air side
    pub indices: Vec<u32>,
    pub status: EmitStatus,
}

impl MeshBuffers {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

pub struct ContourEmitter {
    capacity: MeshCapacity,
    buffers: MeshBuffers,
    indices_full: bool,
}

impl ContourEmitter {
    pub fn new(capacity: MeshCapacity) -> Self {
        Self {
            capacity,
            buffers: MeshBuffers::default(),
            indices_full: false,
        }
    }

    /// Writes the mesh of `tree`, assigning each leaf its vertex index.
    ///
    /// Panics if a leaf of `tree` was already numbered by an earlier emit.
    pub fn emit(mut self, tree: &mut Octree) -> MeshBuffers {
        if let Some(root) = tree.root() {
            self.number_vertices(tree);
            self.cell_proc(tree, root);
        }

        if self.buffers.status == EmitStatus::Truncated {
            log::warn!(
                "mesh truncated at {} vertices and {} indices (capacity {} / {})",
                self.buffers.vertices.len(), self.buffers.indices.len(),
                self.capacity.vertices, self.capacity.indices,
            );
        }
        self.buffers
    }

    fn number_vertices(&mut self, tree: &mut Octree) {
        let limit = self.capacity.vertices.min(u32::MAX as usize);
        for id in tree.leaves() {
            if self.buffers.vertices.len() >= limit {
                self.buffers.status = EmitStatus::Truncated;
                break;
            }

            if let NodeKind::Leaf(draw) = &mut tree.get_mut(id).kind {
                assert!(draw.vertex_index.is_none(), "leaf at {id:?} numbered twice");
                draw.vertex_index = Some(self.buffers.vertices.len() as u32);
                self.buffers.vertices.push(Vertex {
                    position: draw.position,
                    normal: draw.normal,
                });
            }
        }
    }

    fn cell_proc(&mut self, tree: &Octree, id: NodeId) {
        let children = match tree.get(id).children() {
            Some(children) => *children,
            None => return,
        };

        for child in children.iter().flatten() {
            self.cell_proc(tree, *child);
        }

        for [c0, c1, axis] in CELL_PROC_FACE_MASK {
            self.face_proc(tree, [children[c0], children[c1]], axis);
        }

        for [c0, c1, c2, c3, axis] in CELL_PROC_EDGE_MASK {
            self.edge_proc(tree, [children[c0], children[c1], children[c2], children[c3]], axis);
        }
    }

    /// Two nodes sharing a face perpendicular to `axis`, low side first.
    fn face_proc(&mut self, tree: &Octree, nodes: [Option<NodeId>; 2], axis: usize) {
        let pair = match nodes {
            [Some(first), Some(second)] => [first, second],
            _ => return,
        };
        if pair.iter().all(|id| tree.get(*id).is_leaf()) {
            return;
        }

        for [c0, c1, next_axis] in FACE_PROC_FACE_MASK[axis] {
            self.face_proc(tree, [descend(tree, pair[0], c0), descend(tree, pair[1], c1)], next_axis);
        }

        for [order, c0, c1, c2, c3, next_axis] in FACE_PROC_EDGE_MASK[axis] {
            let order = FACE_PROC_EDGE_ORDER[order];
            let slots = [c0, c1, c2, c3];
            let quad = std::array::from_fn(|i| descend(tree, pair[order[i]], slots[i]));
            self.edge_proc(tree, quad, next_axis);
        }
    }

    /// Four nodes around a shared edge along `axis`.
    fn edge_proc(&mut self, tree: &Octree, nodes: [Option<NodeId>; 4], axis: usize) {
        let quad = match nodes {
            [Some(n0), Some(n1), Some(n2), Some(n3)] => [n0, n1, n2, n3],
            _ => return,
        };

        let leaves = quad.map(|id| {
            let node = tree.get(id);
            node.draw_info().map(|draw| (node.size, draw))
        });
        if let [Some(l0), Some(l1), Some(l2), Some(l3)] = leaves {
            self.process_edge([l0, l1, l2, l3], axis);
            return;
        }

        for [c0, c1, c2, c3, next_axis] in EDGE_PROC_EDGE_MASK[axis] {
            let slots = [c0, c1, c2, c3];
            self.edge_proc(tree, std::array::from_fn(|i| descend(tree, quad[i], slots[i])), next_axis);
        }
    }

    fn process_edge(&mut self, leaves: [(i32, &DrawInfo); 4], axis: usize) {
        if self.indices_full {
            return;
        }

        // The finest leaf decides whether, and which way, the surface crosses
        let mut finest = i32::MAX;
        let mut sign_change = false;
        let mut flip = false;
        for (i, (size, draw)) in leaves.iter().enumerate() {
            if *size < finest {
                let [c0, c1] = EDGE_CORNERS[PROCESS_EDGE_MASK[axis][i]];
                finest = *size;
                flip = draw.corners.is_solid(c0);
                sign_change = flip != draw.corners.is_solid(c1);
            }
        }
        if !sign_change {
            return;
        }

        let indices = match leaves.map(|(_, draw)| draw.vertex_index) {
            [Some(i0), Some(i1), Some(i2), Some(i3)] => [i0, i1, i2, i3],
            // Left out of a full vertex buffer
            _ => return,
        };

        let corners = if flip {
            [[0, 3, 1], [0, 2, 3]]
        }
        else {
            [[0, 1, 3], [0, 3, 2]]
        };
        // Coarse leaves can fill more than one slot of the quad
        let triangles: ArrayVec<[u32; 3], 2> = corners.into_iter()
            .map(|triangle| triangle.map(|corner| indices[corner]))
            .filter(|[a, b, c]| a != b && b != c && a != c)
            .collect();

        if self.capacity.indices - self.buffers.indices.len() < triangles.len() * 3 {
            self.indices_full = true;
            self.buffers.status = EmitStatus::Truncated;
            return;
        }

        for triangle in triangles {
            self.buffers.indices.extend_from_slice(&triangle);
        }
    }
}

/// Child `slot` of an internal node. A leaf stands in for all of its own children.
fn descend(tree: &Octree, id: NodeId, slot: usize) -> Option<NodeId> {
    match &tree.get(id).kind {
        NodeKind::Leaf(_) => Some(id),
        NodeKind::Internal { children } => children[slot],
    }
}

#[cfg(test)]
fn contour<S: crate::sampler::VolumeSampler + ?Sized>(sampler: &S, size: i32, threshold: Option<f32>, capacity: MeshCapacity) -> MeshBuffers {
    use glam::IVec3;
    use crate::ActiveCellScanner;

    let leaves = ActiveCellScanner::new(sampler, IVec3::ZERO).scan(size);
    let mut tree = Octree::build(leaves, size);
    if let Some(threshold) = threshold {
        tree.simplify(threshold);
    }
    ContourEmitter::new(capacity).emit(&mut tree)
}

#[cfg(test)]
fn signed_volume(mesh: &MeshBuffers) -> f32 {
    mesh.indices.chunks_exact(3).map(|triangle| {
        let [a, b, c] = [0, 1, 2].map(|i| mesh.vertices[triangle[i] as usize].position);
        a.dot(b.cross(c)) / 6.0
    }).sum()
}

/// Mesh edges not shared by exactly two triangles.
#[cfg(test)]
fn unpaired_edges(mesh: &MeshBuffers) -> usize {
    use ahash::AHashMap;

    let mut edges: AHashMap<(u32, u32), usize> = AHashMap::new();
    for triangle in mesh.indices.chunks_exact(3) {
        for (a, b) in [(triangle[0], triangle[1]), (triangle[1], triangle[2]), (triangle[2], triangle[0])] {
            *edges.entry((a.min(b), a.max(b))).or_default() += 1;
        }
    }
    edges.values().filter(|count| **count != 2).count()
}

#[test]
fn contour_sphere_is_closed() {
    use crate::sampler::Sphere;

    let sphere = Sphere::new(Vec3::splat(4.0), 3.0);
    for threshold in [0.0, 0.01, 0.2] {
        let mesh = contour(&sphere, 8, Some(threshold), MeshCapacity::UNBOUNDED);
        assert_eq!(mesh.status, EmitStatus::Complete);
        assert!(mesh.triangle_count() > 0);
        assert_eq!(unpaired_edges(&mesh), 0, "open mesh at threshold {threshold}");
    }
}

#[test]
fn contour_simplified_fields_are_closed() {
    use crate::sampler::{ Sphere, Cuboid, Csg, VolumeSampler };

    let c = 8.0;
    let sphere = Sphere::new(Vec3::splat(c) + Vec3::new(0.13, 0.37, -0.21), c - 2.3);
    let pair = Csg::place(Sphere::new(Vec3::splat(c * 0.6), c * 0.35), Sphere::new(Vec3::splat(c * 1.35), c * 0.4));
    let cavity = Csg::remove(Cuboid::new(Vec3::splat(c), Vec3::splat(c - 1.5)), Sphere::new(Vec3::splat(c) + 0.2, c * 0.5));
    let fields: [(&str, &dyn VolumeSampler); 3] = [("sphere", &sphere), ("pair", &pair), ("cavity", &cavity)];

    for (name, field) in fields {
        for threshold in [0.0, 0.01, 0.05, 0.2, 1.0] {
            let mesh = contour(field, 16, Some(threshold), MeshCapacity::UNBOUNDED);
            assert!(mesh.triangle_count() > 0, "{name} at threshold {threshold}");
            let open = unpaired_edges(&mesh);
            assert_eq!(open, 0, "{name} at threshold {threshold}: {open} unpaired edges");
        }
    }
}

#[test]
fn contour_faces_point_out_of_the_solid() {
    use crate::sampler::{ Sphere, Inverted };

    let sphere = Sphere::new(Vec3::splat(4.0), 3.0);
    let volume = signed_volume(&contour(&sphere, 8, Some(0.0), MeshCapacity::UNBOUNDED));
    // 4/3 π r³ ≈ 113
    assert!((volume - 113.1).abs() < 15.0, "volume {volume}");

    let hollow = signed_volume(&contour(&Inverted(sphere), 8, Some(0.0), MeshCapacity::UNBOUNDED));
    assert!(hollow < 0.0, "volume {hollow}");
}

#[test]
fn contour_inverted_field_flips_winding() {
    use glam::IVec3;
    use crate::{ sampler::{ Sphere, Inverted }, ActiveCellScanner };

    // No lattice point lies exactly on this surface
    let sphere = Sphere::new(Vec3::splat(4.0), 3.3);
    let solid = contour(&sphere, 8, None, MeshCapacity::UNBOUNDED);
    let hollow = contour(&Inverted(sphere), 8, None, MeshCapacity::UNBOUNDED);

    let leaves = ActiveCellScanner::new(&sphere, IVec3::ZERO).scan(8);
    let inverted_leaves = ActiveCellScanner::new(&Inverted(sphere), IVec3::ZERO).scan(8);
    assert_eq!(leaves.len(), inverted_leaves.len());
    for (leaf, inverted) in leaves.iter().zip(inverted_leaves.iter()) {
        let (draw, inverted) = (leaf.draw_info().unwrap(), inverted.draw_info().unwrap());
        assert_eq!(draw.corners.complement(), inverted.corners);
    }

    assert_eq!(solid.vertices.len(), hollow.vertices.len());
    for (a, b) in solid.vertices.iter().zip(hollow.vertices.iter()) {
        assert_eq!(a.position, b.position);
        assert_eq!(a.normal, -b.normal);
    }

    assert_eq!(solid.indices.len(), hollow.indices.len());
    for (a, b) in solid.indices.chunks_exact(3).zip(hollow.indices.chunks_exact(3)) {
        assert_eq!([a[0], a[2], a[1]], [b[0], b[1], b[2]]);
    }
}

#[test]
fn contour_respects_capacity() {
    use crate::sampler::Sphere;

    let sphere = Sphere::new(Vec3::splat(4.0), 3.0);
    let full = contour(&sphere, 8, Some(0.0), MeshCapacity::UNBOUNDED);

    let clipped = contour(&sphere, 8, Some(0.0), MeshCapacity::new(usize::MAX, 31));
    assert_eq!(clipped.status, EmitStatus::Truncated);
    assert_eq!(clipped.vertices, full.vertices);
    assert!(clipped.indices.len() <= 31);
    assert_eq!(clipped.indices.len() % 3, 0);
    assert_eq!(clipped.indices[..], full.indices[..clipped.indices.len()]);

    let few = contour(&sphere, 8, Some(0.0), MeshCapacity::new(10, usize::MAX));
    assert_eq!(few.status, EmitStatus::Truncated);
    assert_eq!(few.vertices[..], full.vertices[..10]);
    assert!(few.indices.iter().all(|index| *index < 10));
    assert!(few.triangle_count() < full.triangle_count());
}

#[test]
fn contour_empty_tree() {
    let mut tree = Octree::new(8);
    let mesh = ContourEmitter::new(MeshCapacity::UNBOUNDED).emit(&mut tree);
    assert_eq!(mesh, MeshBuffers::default());
    assert_eq!(mesh.status, EmitStatus::Complete);
}

#[test]
#[should_panic]
fn contour_emits_a_tree_once() {
    use crate::sampler::Sphere;
    use glam::IVec3;
    use crate::ActiveCellScanner;

    let sphere = Sphere::new(Vec3::splat(4.0), 3.0);
    let mut tree = Octree::build(ActiveCellScanner::new(&sphere, IVec3::ZERO).scan(8), 8);
    ContourEmitter::new(MeshCapacity::UNBOUNDED).emit(&mut tree);
    ContourEmitter::new(MeshCapacity::UNBOUNDED).emit(&mut tree);
}
