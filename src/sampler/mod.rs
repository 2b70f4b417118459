//! Density fields the mesher can sample.
//!
//! The mesher itself only needs [`VolumeSampler`]; the shapes here are small
//! reference fields for terrain edits, tests and demos.
mod sphere;
pub use sphere::*;

mod cuboid;
pub use cuboid::*;

mod plane;
pub use plane::*;

mod action;
pub use action::*;

mod grid;
pub use grid::*;

use glam::{ IVec3, Vec3 };
use crate::Aabb;

/// Density and surface normal at one lattice point.
///
/// Negative density is solid, zero and positive are air. The normal points
/// towards increasing density, out of the solid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub density: f32,
    pub normal: Vec3,
}

impl Sample {
    pub const AIR: Self = Self {
        density: 1.0,
        normal: Vec3::Y,
    };

    pub const SOLID: Self = Self {
        density: -1.0,
        normal: Vec3::Y,
    };

    #[inline(always)]
    pub fn new(density: f32, normal: Vec3) -> Self {
        Self {
            density,
            normal,
        }
    }

    #[inline(always)]
    pub fn is_solid(&self) -> bool {
        self.density < 0.0
    }

    /// Same surface, solid and air swapped.
    pub fn inverted(&self) -> Self {
        Self {
            density: -self.density,
            normal: -self.normal,
        }
    }
}

/// A signed density field queried at integer lattice coordinates.
///
/// Must be deterministic: the scanner samples shared corners more than once.
pub trait VolumeSampler {
    fn sample(&self, point: IVec3) -> Sample;

    /// Lattice-space box outside of which the field is known to be air.
    ///
    /// `None` means unbounded; chunks are never culled against it.
    fn bounds(&self) -> Option<Aabb> {
        None
    }
}

impl<S: VolumeSampler + ?Sized> VolumeSampler for Box<S> {
    fn sample(&self, point: IVec3) -> Sample {
        (**self).sample(point)
    }

    fn bounds(&self) -> Option<Aabb> {
        (**self).bounds()
    }
}

/// Field defined by a closure.
#[derive(Clone, Copy)]
pub struct FnSampler<F>(pub F);

pub fn from_fn<F: Fn(IVec3) -> Sample>(f: F) -> FnSampler<F> {
    FnSampler(f)
}

impl<F: Fn(IVec3) -> Sample> VolumeSampler for FnSampler<F> {
    fn sample(&self, point: IVec3) -> Sample {
        (self.0)(point)
    }
}

/// Negated density and normal: every solid point becomes air and vice versa.
#[derive(Debug, Clone, Copy)]
pub struct Inverted<S>(pub S);

impl<S: VolumeSampler> VolumeSampler for Inverted<S> {
    fn sample(&self, point: IVec3) -> Sample {
        self.0.sample(point).inverted()
    }

    // The outside of a bounded shape is unbounded once inverted.
}

/// Normalised gradient direction, or `fallback` where it vanishes.
pub(crate) fn normal_or(direction: Vec3, fallback: Vec3) -> Vec3 {
    let normal = direction.normalize_or_zero();
    if normal == Vec3::ZERO {
        fallback
    }
    else {
        normal
    }
}

#[test]
fn inverted_sampler() {
    let air = from_fn(|_| Sample::AIR);
    assert!(!air.sample(IVec3::ZERO).is_solid());

    let solid = Inverted(air);
    let sample = solid.sample(IVec3::new(3, -2, 1));
    assert!(sample.is_solid());
    assert_eq!(sample.normal, -Vec3::Y);
    assert!(solid.bounds().is_none());
}
