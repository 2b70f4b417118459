#![warn(unused_extern_crates)]
//! Sparse-octree Dual Contouring.
//!
//! Turns a signed density field sampled on an integer lattice into an indexed
//! triangle mesh. Cells whose corners disagree in sign get one vertex each,
//! placed by a QEF fit to the Hermite data on their edges; the cells are
//! grouped into an octree whose near-planar subtrees collapse into single
//! vertices before contouring.
//!
//! ```ignore
//! use hermite_crust::{ mesh_chunk, ChunkConfig, sampler::Sphere };
//! use hermite_crust::glam::{ IVec3, Vec3 };
//!
//! let sphere = Sphere::new(Vec3::splat(16.0), 10.0);
//! let config = ChunkConfig::new(IVec3::ZERO, 32).with_threshold(0.05);
//! let mesh = mesh_chunk(&sphere, &config)?;
//! println!("{} vertices, {} triangles", mesh.vertices.len(), mesh.triangle_count());
//! ```
use glam::IVec3;

pub use glam;

pub mod sampler;

mod aabb;
pub use aabb::*;

mod mask;
pub use mask::*;

pub mod qef;
pub use qef::{ QefData, QefSolution };

mod scan;
pub use scan::*;

pub mod octree;
pub use octree::{ Octree, OctreeNode, NodeId, NodeKind, DrawInfo };

mod contour;
pub use contour::*;

mod config;
pub use config::*;

mod chunk;
pub use chunk::*;

mod error;
pub use error::*;

pub(crate) mod utils;

/// Lattice offset of each cube corner, and of each child octant.
///
/// The index bits are `x << 2 | y << 1 | z`.
pub const CORNER_OFFSETS: [IVec3; 8] = [
    IVec3::new(0, 0, 0),
    IVec3::new(0, 0, 1),
    IVec3::new(0, 1, 0),
    IVec3::new(0, 1, 1),
    IVec3::new(1, 0, 0),
    IVec3::new(1, 0, 1),
    IVec3::new(1, 1, 0),
    IVec3::new(1, 1, 1),
];

/// Corner pairs of the 12 cube edges: 4 along x, then 4 along y, then 4 along z.
pub const EDGE_CORNERS: [[usize; 2]; 12] = [
    [0, 4], [1, 5], [2, 6], [3, 7],
    [0, 2], [1, 3], [4, 6], [5, 7],
    [0, 1], [2, 3], [4, 5], [6, 7],
];

/// Child slot of the octant `offset` (each component 0 or 1).
#[inline(always)]
pub fn octant_index(offset: IVec3) -> usize {
    debug_assert!(offset.cmpge(IVec3::ZERO).all() && offset.cmple(IVec3::ONE).all());
    (offset.x << 2 | offset.y << 1 | offset.z) as usize
}

#[test]
fn octant_index_matches_offsets() {
    CORNER_OFFSETS.iter().enumerate().for_each(|(index, offset)| {
        assert_eq!(octant_index(*offset), index);
    });

    // Each edge joins two corners that differ along exactly one axis
    EDGE_CORNERS.iter().enumerate().for_each(|(edge, [c0, c1])| {
        let delta = CORNER_OFFSETS[*c1] - CORNER_OFFSETS[*c0];
        let axis = edge / 4;
        assert_eq!(delta, [IVec3::X, IVec3::Y, IVec3::Z][axis]);
    });
}
