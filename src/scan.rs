use arrayvec::ArrayVec;
use glam::{ IVec3, Vec3 };

use crate::{
    sampler::{ Sample, VolumeSampler },
    octree::{ OctreeNode, DrawInfo },
    CornerMask, QefData, CORNER_OFFSETS, EDGE_CORNERS,
};

/// Edges whose corner densities are closer than this are skipped; the
/// crossing position would be meaningless.
pub const GRADIENT_EPSILON: f32 = 1e-6;

/// A surface crossing on one cube edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCrossing {
    pub position: Vec3,
    pub normal: Vec3,
}

/// Finds the lattice cells the surface passes through and builds one leaf
/// per cell.
///
/// Cell `c` spans lattice points `c` to `c + 1`. Cells are chunk-local; the
/// sampler is queried at `origin + c + corner`.
pub struct ActiveCellScanner<'a, S: ?Sized> {
    sampler: &'a S,
    origin: IVec3,
}

impl<'a, S: VolumeSampler + ?Sized> ActiveCellScanner<'a, S> {
    pub fn new(sampler: &'a S, origin: IVec3) -> Self {
        Self {
            sampler,
            origin,
        }
    }

    /// Scans the `size³` cells of the chunk, in x, y, z order.
    pub fn scan(&self, size: i32) -> Vec<OctreeNode> {
        let mut leaves = Vec::new();
        for x in 0..size {
            for y in 0..size {
                for z in 0..size {
                    if let Some(leaf) = self.scan_cell(IVec3::new(x, y, z)) {
                        leaves.push(leaf);
                    }
                }
            }
        }
        leaves
    }

    fn corner_samples(&self, cell: IVec3) -> [Sample; 8] {
        let base = self.origin + cell;
        CORNER_OFFSETS.map(|offset| self.sampler.sample(base + offset))
    }

    /// Builds the size-1 leaf for `cell`, or `None` if no surface passes through it.
    pub fn scan_cell(&self, cell: IVec3) -> Option<OctreeNode> {
        let samples = self.corner_samples(cell);
        let corners = CornerMask::from_densities(&samples.map(|sample| sample.density));
        if corners.is_homogeneous() {
            return None;
        }

        let crossings = edge_crossings(cell, &samples, corners);
        if crossings.is_empty() {
            log::trace!("dropping cell {cell} (mask {:#010b}): no usable edge crossings", corners.bits());
            return None;
        }

        let mut qef = QefData::new();
        let mut normal_sum = Vec3::ZERO;
        for crossing in crossings.iter() {
            qef.add(crossing.normal, crossing.position);
            normal_sum += crossing.normal;
        }

        let mut position = qef.solve().position;
        let cell_min = cell.as_vec3();
        if position.cmplt(cell_min).any() || position.cmpgt(cell_min + Vec3::ONE).any() {
            position = qef.mass_point();
        }

        Some(OctreeNode::leaf(cell, 1, DrawInfo::new(position, normal_sum.normalize_or_zero(), corners)))
    }
}

/// Linear zero crossings on every sign-changing edge of a cell, with corner
/// normals interpolated to the crossing.
pub fn edge_crossings(cell: IVec3, samples: &[Sample; 8], corners: CornerMask) -> ArrayVec<EdgeCrossing, 12> {
    let mut crossings = ArrayVec::new();
    for (edge, [c0, c1]) in EDGE_CORNERS.iter().copied().enumerate() {
        if !corners.edge_crosses(edge) {
            continue;
        }

        let (s0, s1) = (samples[c0], samples[c1]);
        let delta = s0.density - s1.density;
        if delta.abs() <= GRADIENT_EPSILON {
            continue;
        }

        let t = s0.density / delta;
        let p0 = (cell + CORNER_OFFSETS[c0]).as_vec3();
        let p1 = (cell + CORNER_OFFSETS[c1]).as_vec3();
        crossings.push(EdgeCrossing {
            position: p0.lerp(p1, t),
            normal: s0.normal.lerp(s1.normal, t).normalize_or_zero(),
        });
    }
    crossings
}

#[test]
fn scan_plane_cell() {
    use crate::sampler::Plane;

    // Solid below y = 0.25
    let ground = Plane::ground(0.25);
    let scanner = ActiveCellScanner::new(&ground, IVec3::ZERO);

    let leaf = scanner.scan_cell(IVec3::ZERO).expect("cell straddles the plane");
    let draw = leaf.draw_info().unwrap();
    assert_eq!(leaf.size, 1);
    assert_eq!(draw.corners.bits(), 0b0011_0011);
    assert!((draw.position.y - 0.25).abs() < 1e-5, "{:?}", draw.position);
    assert!(draw.normal.abs_diff_eq(Vec3::Y, 1e-6));
    assert_eq!(draw.vertex_index, None);

    assert!(scanner.scan_cell(IVec3::new(0, 1, 0)).is_none());
    assert!(scanner.scan_cell(IVec3::new(0, -1, 0)).is_none());
}

#[test]
fn scan_sphere_cells() {
    use crate::sampler::Sphere;

    let sphere = Sphere::new(Vec3::splat(4.0), 3.0);
    let scanner = ActiveCellScanner::new(&sphere, IVec3::ZERO);
    let leaves = scanner.scan(8);

    assert!(!leaves.is_empty());
    for leaf in leaves.iter() {
        let draw = leaf.draw_info().unwrap();
        assert!(!draw.corners.is_homogeneous());
        // Vertices stay inside their own cell
        let min = leaf.min.as_vec3();
        assert!(draw.position.cmpge(min).all() && draw.position.cmple(min + Vec3::ONE).all());
        assert!((sphere.distance(draw.position)).abs() < 1.0);
    }
}

#[test]
fn scan_uniform_fields() {
    use crate::sampler::from_fn;

    let air = from_fn(|_| Sample::AIR);
    let solid = from_fn(|_| Sample::SOLID);
    assert!(ActiveCellScanner::new(&air, IVec3::ZERO).scan(8).is_empty());
    assert!(ActiveCellScanner::new(&solid, IVec3::ZERO).scan(8).is_empty());
}

#[test]
fn scan_skips_flat_edges() {
    // Signs differ but densities are within epsilon of each other
    let mut samples = [Sample::new(1e-7, Vec3::Y); 8];
    samples[0] = Sample::new(-1e-7, Vec3::Y);
    let corners = CornerMask::from_densities(&samples.map(|sample| sample.density));
    assert_eq!(corners.bits(), 1);
    assert!(edge_crossings(IVec3::ZERO, &samples, corners).is_empty());
}
