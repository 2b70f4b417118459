use glam::{ IVec3, Vec3 };

use crate::{
    sampler::{ Sample, VolumeSampler, normal_or },
    Aabb,
};

/// Signed distance to a sphere, in lattice units.
#[derive(Clone, Copy, Debug)]
pub struct Sphere {
    pub origin: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(origin: Vec3, radius: f32) -> Self {
        Self {
            origin,
            radius,
        }
    }

    pub fn distance(&self, pos: Vec3) -> f32 {
        (pos - self.origin).length() - self.radius
    }
}

impl VolumeSampler for Sphere {
    fn sample(&self, point: IVec3) -> Sample {
        let pos = point.as_vec3();
        Sample {
            density: self.distance(pos),
            normal: normal_or(pos - self.origin, Vec3::Y),
        }
    }

    fn bounds(&self) -> Option<Aabb> {
        Some(Aabb::from_radius(self.origin, self.radius))
    }
}

#[test]
fn sphere_sample() {
    let sphere = Sphere::new(Vec3::splat(4.0), 3.0);

    let center = sphere.sample(IVec3::splat(4));
    assert_eq!(center.density, -3.0);
    assert_eq!(center.normal, Vec3::Y);

    let outside = sphere.sample(IVec3::new(4, 4, 9));
    assert_eq!(outside.density, 2.0);
    assert_eq!(outside.normal, Vec3::Z);

    // Exactly on the surface counts as air
    assert!(!sphere.sample(IVec3::new(7, 4, 4)).is_solid());
}
