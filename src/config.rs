use glam::{ IVec3, Vec3 };

use crate::{ Error, Result, MeshCapacity };

/// Largest accepted chunk size, in cells per axis.
pub const MAX_CHUNK_SIZE: i32 = 1024;

/// Where a chunk sits on the lattice and how it is meshed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkConfig {
    /// Lattice coordinate of the chunk's minimum corner
    pub origin: IVec3,
    /// Cells per axis, a power of two up to [`MAX_CHUNK_SIZE`]
    pub size: i32,
    /// World units per lattice unit
    pub cell_size: f32,
    /// Largest QEF error a collapsed node may have
    pub threshold: f32,
    pub capacity: MeshCapacity,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            origin: IVec3::ZERO,
            size: 32,
            cell_size: 1.0,
            threshold: 0.0,
            capacity: MeshCapacity::UNBOUNDED,
        }
    }
}

impl ChunkConfig {
    pub fn new(origin: IVec3, size: i32) -> Self {
        Self {
            origin,
            size,
            ..Default::default()
        }
    }

    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_capacity(mut self, capacity: MeshCapacity) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.size <= 0 || self.size > MAX_CHUNK_SIZE || (self.size & (self.size - 1)) != 0 {
            return Err(Error::InvalidChunkSize(self.size));
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(Error::InvalidCellSize(self.cell_size));
        }
        // Infinity is allowed and collapses everything
        if self.threshold.is_nan() || self.threshold < 0.0 {
            return Err(Error::InvalidThreshold(self.threshold));
        }
        Ok(())
    }

    /// World position of a chunk-local lattice position.
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        (self.origin.as_vec3() + local) * self.cell_size
    }
}

#[test]
fn config_defaults() {
    let config = ChunkConfig::default();
    assert_eq!(config.size, 32);
    assert_eq!(config.cell_size, 1.0);
    assert_eq!(config.threshold, 0.0);
    assert_eq!(config.capacity, MeshCapacity::UNBOUNDED);
    assert_eq!(config.validate(), Ok(()));

    let config = ChunkConfig::new(IVec3::new(16, 0, -16), 16).with_cell_size(0.5).with_threshold(0.05);
    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.to_world(Vec3::new(1.0, 2.0, 3.0)), Vec3::new(8.5, 1.0, -6.5));
}

#[test]
fn config_rejects_bad_values() {
    assert_eq!(ChunkConfig::new(IVec3::ZERO, 12).validate(), Err(Error::InvalidChunkSize(12)));
    assert_eq!(ChunkConfig::new(IVec3::ZERO, 0).validate(), Err(Error::InvalidChunkSize(0)));
    assert_eq!(ChunkConfig::new(IVec3::ZERO, -8).validate(), Err(Error::InvalidChunkSize(-8)));
    assert_eq!(ChunkConfig::new(IVec3::ZERO, MAX_CHUNK_SIZE).validate(), Ok(()));
    assert_eq!(ChunkConfig::new(IVec3::ZERO, MAX_CHUNK_SIZE * 2).validate(), Err(Error::InvalidChunkSize(2048)));

    let config = ChunkConfig::new(IVec3::ZERO, 8);
    assert_eq!(config.with_cell_size(0.0).validate(), Err(Error::InvalidCellSize(0.0)));
    assert!(matches!(config.with_cell_size(f32::INFINITY).validate(), Err(Error::InvalidCellSize(_))));
    assert_eq!(config.with_threshold(-0.5).validate(), Err(Error::InvalidThreshold(-0.5)));
    assert!(matches!(config.with_threshold(f32::NAN).validate(), Err(Error::InvalidThreshold(_))));
    assert_eq!(config.with_threshold(f32::INFINITY).validate(), Ok(()));
}
