use glam::IVec3;

use crate::{
    sampler::{ VolumeSampler, SampleGrid },
    ActiveCellScanner, Aabb, ChunkConfig, ContourEmitter, EmitStatus, Octree, Result, Vertex,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChunkStats {
    /// Size-1 cells the surface passes through
    pub active_cells: usize,
    /// Nodes in the octree before simplification
    pub octree_nodes: usize,
    /// Internal nodes collapsed into leaves
    pub collapsed_nodes: usize,
    pub vertices: usize,
    pub triangles: usize,
}

/// World-space mesh of one chunk.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChunkMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub status: EmitStatus,
    /// Box around every vertex, `None` for an empty mesh
    pub bounds: Option<Aabb>,
    pub stats: ChunkStats,
}

impl ChunkMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Runs the whole pipeline over one chunk: scan, assemble, simplify, contour.
///
/// Vertex positions come out in world space, `(origin + local) * cell_size`.
pub fn mesh_chunk<S: VolumeSampler + ?Sized>(sampler: &S, config: &ChunkConfig) -> Result<ChunkMesh> {
    config.validate()?;

    if let Some(bounds) = sampler.bounds() {
        if !bounds.intersects(Aabb::from_lattice(config.origin, config.size)) {
            log::debug!("chunk at {} is outside the field bounds", config.origin);
            return Ok(ChunkMesh::default());
        }
    }

    let grid = SampleGrid::new(sampler, config.origin, config.size);
    if !grid.has_surface() {
        log::debug!("chunk at {} has no surface", config.origin);
        return Ok(ChunkMesh::default());
    }

    let leaves = ActiveCellScanner::new(&grid, config.origin).scan(config.size);
    let active_cells = leaves.len();

    let mut tree = Octree::build(leaves, config.size);
    let octree_nodes = tree.len();

    let simplified = tree.simplify(config.threshold);
    log::debug!(
        "chunk at {}: {} active cells, {} octree nodes, {} collapsed, {} remaining",
        config.origin, active_cells, octree_nodes, simplified.collapsed, tree.len(),
    );

    let buffers = ContourEmitter::new(config.capacity).emit(&mut tree);

    let mut bounds: Option<Aabb> = None;
    let vertices: Vec<Vertex> = buffers.vertices.into_iter().map(|vertex| {
        let position = config.to_world(vertex.position);
        match bounds.as_mut() {
            Some(bounds) => bounds.expand(position),
            None => bounds = Some(Aabb::from_point(position)),
        }
        Vertex {
            position,
            normal: vertex.normal,
        }
    }).collect();

    let stats = ChunkStats {
        active_cells,
        octree_nodes,
        collapsed_nodes: simplified.collapsed,
        vertices: vertices.len(),
        triangles: buffers.indices.len() / 3,
    };
    log::debug!("chunk at {}: {} vertices, {} triangles", config.origin, stats.vertices, stats.triangles);

    Ok(ChunkMesh {
        vertices,
        indices: buffers.indices,
        status: buffers.status,
        bounds,
        stats,
    })
}

/// Meshes independent chunks in parallel, one result per config in order.
#[cfg(feature = "multi-thread")]
pub fn mesh_chunks<S: VolumeSampler + Sync + ?Sized>(sampler: &S, configs: &[ChunkConfig]) -> Vec<Result<ChunkMesh>> {
    use rayon::prelude::*;

    configs.par_iter()
        .map(|config| mesh_chunk(sampler, config))
        .collect()
}

/// Origins of the chunks of `size` covering the lattice box `min..max`.
pub fn chunk_origins(min: IVec3, max: IVec3, size: i32) -> impl Iterator<Item = IVec3> {
    let start = IVec3::new(min.x.div_euclid(size), min.y.div_euclid(size), min.z.div_euclid(size));
    let end = IVec3::new((max.x - 1).div_euclid(size), (max.y - 1).div_euclid(size), (max.z - 1).div_euclid(size));
    (start.x..=end.x).flat_map(move |x| {
        (start.y..=end.y).flat_map(move |y| {
            (start.z..=end.z).map(move |z| IVec3::new(x, y, z) * size)
        })
    })
}

#[test]
fn mesh_chunk_sphere() {
    use glam::Vec3;
    use crate::sampler::Sphere;

    let sphere = Sphere::new(Vec3::splat(4.0), 3.0);
    let mesh = mesh_chunk(&sphere, &ChunkConfig::new(IVec3::ZERO, 8)).unwrap();

    assert!(!mesh.vertices.is_empty());
    assert!(mesh.triangle_count() > 0);
    assert_eq!(mesh.status, EmitStatus::Complete);
    for vertex in mesh.vertices.iter() {
        assert!(sphere.distance(vertex.position).abs() <= 1.0, "{:?}", vertex.position);
        assert!((vertex.normal.length() - 1.0).abs() < 1e-4);
    }
    assert!(mesh.indices.iter().all(|index| (*index as usize) < mesh.vertices.len()));

    let stats = mesh.stats;
    assert_eq!(stats.vertices, mesh.vertices.len());
    assert_eq!(stats.triangles, mesh.triangle_count());
    assert!(stats.active_cells >= stats.vertices);
    assert!(stats.octree_nodes > stats.active_cells);

    let bounds = mesh.bounds.unwrap();
    assert!(bounds.start.cmpge(Vec3::splat(0.5)).all() && bounds.end.cmple(Vec3::splat(7.5)).all());
}

#[test]
fn mesh_chunk_world_space() {
    use glam::Vec3;
    use crate::sampler::Sphere;

    let local = mesh_chunk(&Sphere::new(Vec3::splat(4.0), 3.0), &ChunkConfig::new(IVec3::ZERO, 8)).unwrap();

    let sphere = Sphere::new(Vec3::new(12.0, 4.0, -4.0), 3.0);
    let config = ChunkConfig::new(IVec3::new(8, 0, -8), 8).with_cell_size(0.5);
    let mesh = mesh_chunk(&sphere, &config).unwrap();

    assert_eq!(mesh.indices, local.indices);
    assert_eq!(mesh.vertices.len(), local.vertices.len());
    for (vertex, local) in mesh.vertices.iter().zip(local.vertices.iter()) {
        let expected = (local.position + Vec3::new(8.0, 0.0, -8.0)) * 0.5;
        assert!(vertex.position.abs_diff_eq(expected, 1e-4), "{:?} vs {:?}", vertex.position, expected);
        assert!(vertex.normal.abs_diff_eq(local.normal, 1e-5));
    }
}

#[test]
fn mesh_chunk_uniform_fields() {
    use crate::sampler::{ from_fn, Sample };

    let air = from_fn(|_| Sample::AIR);
    let solid = from_fn(|_| Sample::SOLID);
    for mesh in [mesh_chunk(&air, &ChunkConfig::new(IVec3::ZERO, 8)), mesh_chunk(&solid, &ChunkConfig::new(IVec3::ZERO, 8))] {
        let mesh = mesh.unwrap();
        assert!(mesh.vertices.is_empty());
        assert!(mesh.is_empty());
        assert_eq!(mesh.stats, ChunkStats::default());
        assert_eq!(mesh.bounds, None);
    }
}

#[test]
fn mesh_chunk_culls_outside_bounds() {
    use glam::Vec3;
    use crate::sampler::Sphere;

    let sphere = Sphere::new(Vec3::splat(100.0), 3.0);
    let mesh = mesh_chunk(&sphere, &ChunkConfig::new(IVec3::ZERO, 16)).unwrap();
    assert_eq!(mesh, ChunkMesh::default());
}

#[test]
fn mesh_chunk_rejects_bad_config() {
    use glam::Vec3;
    use crate::{ sampler::Sphere, Error };

    let sphere = Sphere::new(Vec3::splat(4.0), 3.0);
    assert_eq!(mesh_chunk(&sphere, &ChunkConfig::new(IVec3::ZERO, 6)), Err(Error::InvalidChunkSize(6)));
    let config = ChunkConfig::new(IVec3::ZERO, 8).with_threshold(-1.0);
    assert_eq!(mesh_chunk(&sphere, &config), Err(Error::InvalidThreshold(-1.0)));
}

#[test]
fn mesh_chunk_simplifies_flat_ground() {
    use crate::sampler::Plane;

    let ground = Plane::ground(3.5);
    let exact = mesh_chunk(&ground, &ChunkConfig::new(IVec3::ZERO, 8)).unwrap();
    assert_eq!(exact.stats.active_cells, 64);
    // A plane has zero error at every level
    assert_eq!(exact.stats.vertices, 1);
    assert!(exact.stats.collapsed_nodes > 0);
}

#[test]
fn chunk_origins_cover_box() {
    let origins: Vec<IVec3> = chunk_origins(IVec3::new(-4, 0, 0), IVec3::new(16, 8, 1), 8).collect();
    assert_eq!(origins.len(), 3);
    assert_eq!(origins[0], IVec3::new(-8, 0, 0));
    assert_eq!(origins[2], IVec3::new(8, 0, 0));
}

#[cfg(feature = "multi-thread")]
#[test]
fn mesh_chunks_matches_sequential() {
    use glam::Vec3;
    use crate::sampler::Sphere;

    let sphere = Sphere::new(Vec3::splat(8.0), 5.5);
    let configs: Vec<ChunkConfig> = chunk_origins(IVec3::ZERO, IVec3::splat(16), 8)
        .map(|origin| ChunkConfig::new(origin, 8).with_threshold(0.01))
        .collect();
    let parallel = mesh_chunks(&sphere, &configs);
    assert_eq!(parallel.len(), 8);
    for (config, mesh) in configs.iter().zip(parallel) {
        assert_eq!(mesh, mesh_chunk(&sphere, config));
    }
}

#[test]
#[ignore]
fn mesh_chunk_timing() {
    use glam::Vec3;
    use crate::{ sampler::{ Sphere, Csg }, utils::time_test };

    let _ = env_logger::builder().is_test(true).filter_level(log::LevelFilter::Debug).try_init();

    let terrain = Csg::remove(Sphere::new(Vec3::splat(32.0), 24.0), Sphere::new(Vec3::new(32.0, 48.0, 32.0), 14.0))
        .with_smoothness(4.0);
    let config = ChunkConfig::new(IVec3::ZERO, 64).with_threshold(0.05);

    let mesh = time_test!(mesh_chunk(&terrain, &config).unwrap(), "mesh_chunk 64³ carved sphere");
    assert!(mesh.triangle_count() > 0);

    let exact = time_test!(mesh_chunk(&terrain, &config.with_threshold(0.0)).unwrap(), "mesh_chunk 64³ unsimplified");
    assert!(exact.stats.vertices >= mesh.stats.vertices);
}
