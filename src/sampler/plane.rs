use glam::{ IVec3, Vec3 };

use crate::sampler::{ Sample, VolumeSampler };

/// Half-space: solid below the plane `normal·p = offset`, air above.
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    pub fn new(normal: Vec3, offset: f32) -> Self {
        Self {
            normal: normal.normalize(),
            offset,
        }
    }

    /// Flat ground at height `y`.
    pub fn ground(y: f32) -> Self {
        Self::new(Vec3::Y, y)
    }
}

impl VolumeSampler for Plane {
    fn sample(&self, point: IVec3) -> Sample {
        Sample {
            density: self.normal.dot(point.as_vec3()) - self.offset,
            normal: self.normal,
        }
    }
}

#[test]
fn plane_sample() {
    let ground = Plane::ground(2.5);
    assert!(ground.sample(IVec3::new(10, 2, -3)).is_solid());
    assert!(!ground.sample(IVec3::new(10, 3, -3)).is_solid());
    assert_eq!(ground.sample(IVec3::new(0, 4, 0)).density, 1.5);
}
