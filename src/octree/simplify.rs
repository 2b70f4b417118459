use glam::Vec3;

use crate::{
    octree::{ Octree, NodeId, NodeKind, DrawInfo },
    CornerMask, QefData,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimplifyStats {
    /// Internal nodes turned into leaves
    pub collapsed: usize,
    /// Nodes dropped from the arena
    pub released: usize,
}

impl Octree {
    /// Collapses every subtree whose leaves fit a single vertex with QEF
    /// error at most `threshold`.
    pub fn simplify(&mut self, threshold: f32) -> SimplifyStats {
        let mut stats = SimplifyStats::default();
        if let Some(root) = self.root() {
            self.simplify_recurse(root, threshold, &mut stats);
        }
        stats
    }

    /// Simplifies the subtree under `id` in place. The node keeps its handle
    /// whether or not it became a leaf.
    pub fn simplify_node(&mut self, id: NodeId, threshold: f32) -> NodeId {
        self.simplify_recurse(id, threshold, &mut SimplifyStats::default());
        id
    }

    fn simplify_recurse(&mut self, id: NodeId, threshold: f32, stats: &mut SimplifyStats) {
        let children = match self.get(id).children() {
            Some(children) => *children,
            None => return,
        };

        children.iter().flatten().for_each(|child| self.simplify_recurse(*child, threshold, stats));

        let mut leaves = [None; 8];
        for (slot, child) in children.iter().enumerate() {
            if let Some(child) = child {
                match &self.get(*child).kind {
                    NodeKind::Leaf(draw) => leaves[slot] = Some(*draw),
                    // Children that could not collapse pin their parent
                    NodeKind::Internal { .. } => return,
                }
            }
        }

        let merged = match merge_leaves(&leaves, threshold) {
            Some(merged) => merged,
            None => return,
        };

        let mut released = 0;
        children.iter().flatten().for_each(|child| {
            self.release(*child);
            released += 1;
        });

        let node = self.get_mut(id);
        log::trace!("collapsed {} children of node at {} (size {})", released, node.min, node.size);
        node.kind = NodeKind::Leaf(merged);

        stats.collapsed += 1;
        stats.released += released;
    }
}

/// One vertex standing in for all of `children`, if it fits them within `threshold`.
pub fn merge_leaves(children: &[Option<DrawInfo>; 8], threshold: f32) -> Option<DrawInfo> {
    let mut qef = QefData::new();
    let mut normal_sum = Vec3::ZERO;
    for child in children.iter().flatten() {
        qef.add(child.normal, child.position);
        normal_sum += child.normal;
    }

    if qef.is_empty() {
        return None;
    }

    let solution = qef.solve();
    if solution.error > threshold {
        return None;
    }

    Some(DrawInfo::new(solution.position, normal_sum.normalize_or_zero(), merged_corners(children)))
}

/// Corner solidity of a coarse node from its children.
///
/// Parent corner `i` is child `i`'s own corner `i`. An absent child holds no
/// surface, so its outer corner has the sign of the parent's center, which
/// every present child `c` samples as its corner `7 - c`.
pub fn merged_corners(children: &[Option<DrawInfo>; 8]) -> CornerMask {
    let mid = children.iter()
        .enumerate()
        .find_map(|(slot, child)| child.as_ref().map(|child| child.corners.is_solid(7 - slot)))
        .unwrap_or(false);

    let mut corners = CornerMask::EMPTY;
    for (corner, child) in children.iter().enumerate() {
        let solid = match child {
            Some(child) => child.corners.is_solid(corner),
            None => mid,
        };
        corners.set_solid(corner, solid);
    }
    corners
}

#[test]
fn simplify_infinite_threshold_collapses_everything() {
    use glam::IVec3;
    use crate::{ sampler::Sphere, ActiveCellScanner };

    let sphere = Sphere::new(Vec3::splat(4.0), 3.0);
    let leaves = ActiveCellScanner::new(&sphere, IVec3::ZERO).scan(8);
    let leaf_count = leaves.len();
    let mut tree = Octree::build(leaves, 8);
    let before = tree.len();

    let stats = tree.simplify(f32::INFINITY);
    let root = tree.get(tree.root().unwrap());
    assert!(root.is_leaf());
    assert_eq!(root.size, 8);
    assert_eq!(tree.len(), 1);
    assert_eq!(stats.released, before - 1);
    assert_eq!(stats.collapsed, before - leaf_count);

    // Sphere center is inside
    let draw = root.draw_info().unwrap();
    assert!(draw.position.abs_diff_eq(Vec3::splat(4.0), 1.0));
}

#[test]
fn simplify_zero_threshold_keeps_curvature() {
    use glam::IVec3;
    use crate::OctreeNode;

    // Two parallel sheets one cell apart can't share a vertex
    let leaves = vec![
        OctreeNode::leaf(IVec3::new(0, 0, 0), 1, DrawInfo::new(Vec3::new(0.5, 0.5, 0.5), Vec3::Y, CornerMask::from_bits(0b0011_0011))),
        OctreeNode::leaf(IVec3::new(0, 1, 0), 1, DrawInfo::new(Vec3::new(0.5, 1.5, 0.5), Vec3::Y, CornerMask::from_bits(0b0011_0011))),
    ];
    let mut tree = Octree::build(leaves, 2);
    let stats = tree.simplify(0.0);
    assert_eq!(stats, SimplifyStats::default());
    assert!(!tree.get(tree.root().unwrap()).is_leaf());
    assert_eq!(tree.leaves().len(), 2);

    // ...until the threshold allows for the 2 * 0.5² error
    let root = tree.root().unwrap();
    assert_eq!(tree.simplify_node(root, 0.5), root);
    assert!(tree.get(root).is_leaf());
}

#[test]
fn simplify_collapses_flat_surface() {
    use glam::IVec3;
    use crate::{ sampler::Plane, ActiveCellScanner };

    let ground = Plane::ground(1.5);
    let leaves = ActiveCellScanner::new(&ground, IVec3::ZERO).scan(4);
    assert_eq!(leaves.len(), 16);

    let mut tree = Octree::build(leaves, 4);
    tree.simplify(0.0);

    let root = tree.get(tree.root().unwrap());
    let draw = root.draw_info().expect("a plane collapses to one vertex");
    assert!((draw.position.y - 1.5).abs() < 1e-5);
    assert_eq!(draw.normal, Vec3::Y);
    // Bottom corners solid, top corners air
    assert_eq!(draw.corners.bits(), 0b0011_0011);
}

#[test]
fn merged_corners_midsign() {
    let draw = |bits: u8| Some(DrawInfo::new(Vec3::ZERO, Vec3::Y, CornerMask::from_bits(bits)));

    // Child 0 has an air outer corner and a solid center corner
    let mut children = [None; 8];
    children[0] = draw(0b1000_0000);
    children[7] = draw(0b0000_0001);

    let corners = merged_corners(&children);
    // Own corners
    assert!(!corners.is_solid(0));
    assert!(!corners.is_solid(7));
    // Every absent octant takes the solid center
    for corner in 1..7 {
        assert!(corners.is_solid(corner), "corner {corner}");
    }

    // Air center
    let mut children = [None; 8];
    children[3] = draw(0b0000_1000);
    assert_eq!(merged_corners(&children).bits(), 0b0000_1000);

    assert_eq!(merged_corners(&[None; 8]), CornerMask::EMPTY);
}

#[test]
fn merged_corners_fill_absent_octants_from_center() {
    use glam::IVec3;
    use crate::{ sampler::{ from_fn, Sample, VolumeSampler }, ActiveCellScanner, CORNER_OFFSETS };

    // Solid everywhere but the lattice origin
    let field = from_fn(|point: IVec3| if point == IVec3::ZERO { Sample::AIR } else { Sample::SOLID });
    let mut tree = Octree::build(ActiveCellScanner::new(&field, IVec3::ZERO).scan(2), 2);
    tree.simplify(f32::INFINITY);

    let root = tree.get(tree.root().unwrap());
    let draw = root.draw_info().expect("root collapses");
    for (corner, offset) in CORNER_OFFSETS.iter().enumerate() {
        assert_eq!(draw.corners.is_solid(corner), field.sample(*offset * 2).is_solid(), "corner {corner}");
    }
    assert_eq!(draw.corners.bits(), 0b1111_1110);
}

#[test]
fn collapsed_leaves_match_sampled_corners() {
    use glam::IVec3;
    use crate::{ sampler::{ Sphere, Cuboid, Csg, VolumeSampler }, ActiveCellScanner, CORNER_OFFSETS };

    let sphere = Sphere::new(Vec3::splat(8.0) + Vec3::new(0.13, 0.37, -0.21), 5.7);
    let cavity = Csg::remove(Cuboid::new(Vec3::splat(8.0), Vec3::splat(6.5)), Sphere::new(Vec3::splat(8.2), 4.0));
    let fields: [&dyn VolumeSampler; 2] = [&sphere, &cavity];

    for field in fields {
        for threshold in [0.05, 0.2, 1.0] {
            let mut tree = Octree::build(ActiveCellScanner::new(field, IVec3::ZERO).scan(16), 16);
            tree.simplify(threshold);

            for id in tree.leaves() {
                let node = tree.get(id);
                let draw = node.draw_info().unwrap();
                for (corner, offset) in CORNER_OFFSETS.iter().enumerate() {
                    let sampled = field.sample(node.min + *offset * node.size).is_solid();
                    assert_eq!(draw.corners.is_solid(corner), sampled, "node at {} size {} corner {corner}", node.min, node.size);
                }
            }
        }
    }
}
