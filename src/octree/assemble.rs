use ahash::AHashMap;
use glam::IVec3;

use crate::octree::{ Octree, OctreeNode, NodeId };

impl Octree {
    /// Assembles a complete tree of size `root_size` over a sparse set of
    /// equally sized leaves.
    ///
    /// Works bottom-up one level at a time: each node is bucketed under the
    /// parent whose corner is its own `min` rounded down to the doubled size,
    /// until a single node spans the whole tree. Parent slots with no leaves
    /// below them stay empty.
    pub fn build(leaves: Vec<OctreeNode>, root_size: i32) -> Octree {
        let mut tree = Octree::new(root_size);
        let leaf_size = match leaves.first() {
            Some(leaf) => leaf.size,
            None => return tree,
        };

        let mut level: Vec<NodeId> = leaves.into_iter().map(|leaf| {
            assert!(leaf.is_leaf(), "octree is assembled from leaves only");
            assert_eq!(leaf.size, leaf_size, "leaves must share one size");
            assert!(
                leaf.min.cmpge(IVec3::ZERO).all() && (leaf.min + leaf.size).cmple(IVec3::splat(root_size)).all(),
                "leaf at {} lies outside the tree", leaf.min
            );
            tree.insert(leaf)
        }).collect();

        let mut parent_size = leaf_size * 2;
        while parent_size <= root_size {
            let mut parents: AHashMap<IVec3, NodeId> = AHashMap::with_capacity(level.len() / 4 + 1);
            let mut next_level = Vec::new();

            for child in level {
                let parent_min = parent_corner(tree.get(child).min, parent_size);
                let parent = *parents.entry(parent_min).or_insert_with(|| {
                    let id = tree.insert(OctreeNode::internal(parent_min, parent_size));
                    next_level.push(id);
                    id
                });
                tree.attach(parent, child);
            }

            level = next_level;
            parent_size *= 2;
        }

        assert_eq!(level.len(), 1, "assembly did not converge on a single root");
        tree.set_root(level.first().copied());
        tree
    }
}

/// `min` rounded down to a multiple of `parent_size`.
fn parent_corner(min: IVec3, parent_size: i32) -> IVec3 {
    min - IVec3::new(
        min.x.rem_euclid(parent_size),
        min.y.rem_euclid(parent_size),
        min.z.rem_euclid(parent_size),
    )
}

#[cfg(test)]
fn test_leaf(min: IVec3) -> OctreeNode {
    use glam::Vec3;
    use crate::{ DrawInfo, CornerMask };

    OctreeNode::leaf(min, 1, DrawInfo::new(min.as_vec3() + Vec3::splat(0.5), Vec3::Y, CornerMask::from_bits(0x0f)))
}

#[test]
fn parent_corner_rounds_down() {
    assert_eq!(parent_corner(IVec3::new(5, 2, 7), 2), IVec3::new(4, 2, 6));
    assert_eq!(parent_corner(IVec3::new(5, 2, 7), 8), IVec3::ZERO);
    assert_eq!(parent_corner(IVec3::new(-3, 9, 0), 4), IVec3::new(-4, 8, 0));
}

#[test]
fn build_reaches_every_leaf() {
    // Scattered, deterministic cells in a 16³ chunk
    let mut mins: Vec<IVec3> = (0..200)
        .map(|i: i32| IVec3::new((i * 7) % 16, (i * 13 + 3) % 16, (i * i + 5) % 16))
        .collect();
    mins.sort_by_key(|min| (min.x, min.y, min.z));
    mins.dedup();

    let tree = Octree::build(mins.iter().copied().map(test_leaf).collect(), 16);
    assert_eq!(tree.depth(), 4);
    assert_eq!(tree.leaves().len(), mins.len());

    let root = tree.get(tree.root().unwrap());
    assert_eq!(root.min, IVec3::ZERO);
    assert_eq!(root.size, 16);

    for min in mins {
        let found = tree.get(tree.locate(min).expect("leaf is reachable"));
        assert!(found.is_leaf());
        assert_eq!(found.min, min);
        assert_eq!(found.size, 1);
    }
}

#[test]
fn build_keeps_tree_invariants() {
    let tree = Octree::build(vec![test_leaf(IVec3::new(0, 0, 0)), test_leaf(IVec3::new(7, 7, 7)), test_leaf(IVec3::new(3, 4, 5))], 8);

    fn check(tree: &Octree, id: NodeId) {
        let node = tree.get(id);
        if let Some(children) = node.children() {
            assert!(children.iter().any(Option::is_some));
            for (slot, child) in children.iter().enumerate() {
                if let Some(child) = child {
                    let child = tree.get(*child);
                    assert_eq!(child.size * 2, node.size);
                    assert_eq!(child.min, node.child_min(slot));
                }
            }
            children.iter().flatten().for_each(|child| check(tree, *child));
        }
    }
    check(&tree, tree.root().unwrap());

    // 3 leaves + 3 root children + 3 grandchildren + root
    assert_eq!(tree.len(), 10);
    // Empty octant
    assert_eq!(tree.get(tree.locate(IVec3::new(7, 0, 0)).unwrap()).size, 8);
}

#[test]
fn build_degenerate_inputs() {
    let empty = Octree::build(Vec::new(), 8);
    assert!(empty.is_empty());
    assert_eq!(empty.depth(), 0);
    assert!(empty.leaves().is_empty());

    let single = Octree::build(vec![test_leaf(IVec3::ZERO)], 1);
    let root = single.root().unwrap();
    assert!(single.get(root).is_leaf());
    assert_eq!(single.depth(), 0);
}
