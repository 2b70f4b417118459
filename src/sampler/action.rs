use glam::IVec3;
use lerp::Lerp;

use crate::{
    sampler::{ Sample, VolumeSampler, normal_or },
    Aabb,
};

/// How a [`Csg`] combines its second field into the first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action
{
    /// Add material: union of both solids
    Place,
    /// Carve material: the first solid minus the second
    Remove,
}

impl Action
{
    /// Combines `base` with `tool`. `smoothness` is the blend radius in
    /// lattice units; zero gives a hard edge.
    pub fn apply(&self, base: Sample, tool: Sample, smoothness: f32) -> Sample
    {
        let tool = match self {
            Action::Place => tool,
            Action::Remove => tool.inverted(),
        };

        if smoothness <= 0.0 {
            let pick_tool = match self {
                Action::Place => tool.density < base.density,
                Action::Remove => tool.density > base.density,
            };
            return if pick_tool { tool } else { base };
        }

        // Polynomial smooth min/max
        let k = smoothness;
        match self {
            Action::Place => {
                let h = (0.5 + 0.5 * (tool.density - base.density) / k).clamp(0.0, 1.0);
                Sample {
                    density: tool.density.lerp(base.density, h) - k * h * (1.0 - h),
                    normal: normal_or(tool.normal.lerp(base.normal, h), base.normal),
                }
            },
            Action::Remove => {
                let h = (0.5 - 0.5 * (tool.density - base.density) / k).clamp(0.0, 1.0);
                Sample {
                    density: tool.density.lerp(base.density, h) + k * h * (1.0 - h),
                    normal: normal_or(tool.normal.lerp(base.normal, h), base.normal),
                }
            },
        }
    }
}

/// Constructive solid geometry over two fields.
#[derive(Clone, Copy, Debug)]
pub struct Csg<A, B> {
    pub base: A,
    pub tool: B,
    pub action: Action,
    pub smoothness: f32,
}

impl<A, B> Csg<A, B> {
    pub fn place(base: A, tool: B) -> Self {
        Self {
            base,
            tool,
            action: Action::Place,
            smoothness: 0.0,
        }
    }

    pub fn remove(base: A, tool: B) -> Self {
        Self {
            base,
            tool,
            action: Action::Remove,
            smoothness: 0.0,
        }
    }

    pub fn with_smoothness(mut self, smoothness: f32) -> Self {
        self.smoothness = smoothness;
        self
    }
}

impl<A: VolumeSampler, B: VolumeSampler> VolumeSampler for Csg<A, B> {
    fn sample(&self, point: IVec3) -> Sample {
        self.action.apply(self.base.sample(point), self.tool.sample(point), self.smoothness)
    }

    fn bounds(&self) -> Option<Aabb> {
        match self.action {
            // Removal never adds solid, whatever the blend
            Action::Remove => self.base.bounds(),
            Action::Place => {
                let mut bounds = self.base.bounds()?.union(self.tool.bounds()?);
                // Smooth union bulges out by at most a quarter of the radius
                let bulge = glam::Vec3::splat(self.smoothness.max(0.0) * 0.25);
                bounds.start -= bulge;
                bounds.end += bulge;
                Some(bounds)
            },
        }
    }
}

#[test]
fn csg_place_remove() {
    use glam::Vec3;
    use crate::sampler::Sphere;

    let a = Sphere::new(Vec3::ZERO, 2.0);
    let b = Sphere::new(Vec3::new(3.0, 0.0, 0.0), 2.0);

    let union = Csg::place(a, b);
    assert!(union.sample(IVec3::new(-1, 0, 0)).is_solid());
    assert!(union.sample(IVec3::new(4, 0, 0)).is_solid());
    assert!(!union.sample(IVec3::new(0, 3, 0)).is_solid());
    assert_eq!(union.bounds(), Some(Aabb::new(Vec3::splat(-2.0), Vec3::new(5.0, 2.0, 2.0))));

    let carved = Csg::remove(a, b);
    assert!(carved.sample(IVec3::new(-1, 0, 0)).is_solid());
    assert!(!carved.sample(IVec3::new(1, 0, 0)).is_solid());
    assert!(!carved.sample(IVec3::new(4, 0, 0)).is_solid());
    // Carved face normal points into the removed region
    assert_eq!(carved.sample(IVec3::new(1, 0, 0)).normal, Vec3::X);
    assert_eq!(carved.bounds(), a.bounds());
}

#[test]
fn csg_smooth_blend() {
    use glam::Vec3;
    use crate::sampler::Sphere;

    let a = Sphere::new(Vec3::ZERO, 2.0);
    let b = Sphere::new(Vec3::new(5.0, 0.0, 0.0), 2.0);
    let hard = Csg::place(a, b);
    let smooth = Csg::place(a, b).with_smoothness(2.0);

    // Smooth union is never thinner than the hard one and fills the gap between the spheres
    let gap = IVec3::new(2, 0, 0);
    assert!(smooth.sample(gap).density < hard.sample(gap).density);
    let far = IVec3::new(-10, 0, 0);
    assert_eq!(smooth.sample(far).density, hard.sample(far).density);
}
