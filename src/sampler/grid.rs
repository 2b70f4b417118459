use glam::IVec3;

use crate::{
    sampler::{ Sample, VolumeSampler },
    Aabb,
};

/// Precomputed samples for every lattice point of a chunk.
///
/// Adjacent cells share corners, so scanning a chunk straight off the field
/// samples most points 8 times. The grid samples each once up front; points
/// outside it fall through to the wrapped field.
pub struct SampleGrid<'a, S: ?Sized> {
    inner: &'a S,
    min: IVec3,
    // Points per axis
    extent: i32,
    samples: Vec<Sample>,
}

impl<'a, S: VolumeSampler + ?Sized> SampleGrid<'a, S> {
    /// Samples the `(cells + 1)³` lattice points starting at `min`.
    pub fn new(inner: &'a S, min: IVec3, cells: i32) -> Self {
        assert!(cells >= 0);
        let extent = cells + 1;
        let mut samples = Vec::with_capacity(point_count(cells));
        for x in 0..extent {
            for y in 0..extent {
                for z in 0..extent {
                    samples.push(inner.sample(min + IVec3::new(x, y, z)));
                }
            }
        }

        Self {
            inner,
            min,
            extent,
            samples,
        }
    }

    fn index(&self, point: IVec3) -> Option<usize> {
        let local = point - self.min;
        if local.cmplt(IVec3::ZERO).any() || local.cmpge(IVec3::splat(self.extent)).any() {
            return None;
        }
        let extent = self.extent as usize;
        Some((local.x as usize * extent + local.y as usize) * extent + local.z as usize)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether any sampled point is solid and any is air.
    pub fn has_surface(&self) -> bool {
        let solid = self.samples.iter().filter(|sample| sample.is_solid()).count();
        solid != 0 && solid != self.samples.len()
    }
}

/// Lattice points sampled for `cells` cells per axis.
fn point_count(cells: i32) -> usize {
    let extent = cells as usize + 1;
    extent * extent * extent
}

impl<'a, S: VolumeSampler + ?Sized> VolumeSampler for SampleGrid<'a, S> {
    fn sample(&self, point: IVec3) -> Sample {
        match self.index(point) {
            Some(index) => self.samples[index],
            None => self.inner.sample(point),
        }
    }

    fn bounds(&self) -> Option<Aabb> {
        self.inner.bounds()
    }
}

#[test]
fn sample_grid_matches_field() {
    use glam::Vec3;
    use crate::sampler::Sphere;

    let sphere = Sphere::new(Vec3::new(4.5, 3.0, 5.0), 2.5);
    let grid = SampleGrid::new(&sphere, IVec3::new(1, 0, 2), 6);
    assert_eq!(grid.len(), 7 * 7 * 7);
    assert!(grid.has_surface());

    for x in -1..9 {
        for y in -1..9 {
            for z in -1..9 {
                let point = IVec3::new(x, y, z);
                assert_eq!(grid.sample(point), sphere.sample(point));
            }
        }
    }
}

#[cfg(target_pointer_width = "64")]
#[test]
fn sample_grid_point_count_does_not_wrap() {
    assert_eq!(point_count(0), 1);
    assert_eq!(point_count(8), 729);
    assert_eq!(point_count(2047), 2048 * 2048 * 2048);
}
