use glam::{ IVec3, Vec3 };

use crate::{
    sampler::{ Sample, VolumeSampler, normal_or },
    Aabb,
};

/// Signed distance to an axis-aligned box.
#[derive(Clone, Copy, Debug)]
pub struct Cuboid {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl Cuboid {
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
        }
    }

    pub fn from_aabb(aabb: Aabb) -> Self {
        Self::new((aabb.start + aabb.end) * 0.5, aabb.size() * 0.5)
    }
}

impl VolumeSampler for Cuboid {
    fn sample(&self, point: IVec3) -> Sample {
        let local = point.as_vec3() - self.center;
        let q = local.abs() - self.half_extents;
        let outside = q.max(Vec3::ZERO);
        let outside_len = outside.length();

        if outside_len > 0.0 {
            return Sample {
                density: outside_len,
                normal: normal_or(outside * local.signum(), Vec3::Y),
            };
        }

        // Inside: the nearest face wins
        let inside = q.max_element();
        let axis = if q.x >= q.y && q.x >= q.z {
            Vec3::X
        }
        else if q.y >= q.z {
            Vec3::Y
        }
        else {
            Vec3::Z
        };

        Sample {
            density: inside,
            normal: axis * local.signum(),
        }
    }

    fn bounds(&self) -> Option<Aabb> {
        Some(Aabb {
            start: self.center - self.half_extents,
            end: self.center + self.half_extents,
        })
    }
}

#[test]
fn cuboid_sample() {
    let cuboid = Cuboid::new(Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0));

    let inside = cuboid.sample(IVec3::new(1, 0, 0));
    assert_eq!(inside.density, -1.0);
    assert!(inside.is_solid());

    let above = cuboid.sample(IVec3::new(0, 3, 0));
    assert_eq!(above.density, 2.0);
    assert_eq!(above.normal, Vec3::Y);

    let beside = cuboid.sample(IVec3::new(-4, 0, 0));
    assert_eq!(beside.density, 2.0);
    assert_eq!(beside.normal, -Vec3::X);

    assert_eq!(Cuboid::from_aabb(cuboid.bounds().unwrap()).half_extents, cuboid.half_extents);
}
