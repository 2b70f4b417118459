use glam::{ IVec3, Vec3 };

/// Axis-aligned box, `start` inclusive to `end` inclusive.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Aabb {
    pub start: Vec3,
    pub end: Vec3,
}

pub enum IntersectType {
    DoesNotIntersect,
    Intersects(Aabb), // Contains the Aabb of the intersection
    Contains,
}

impl Aabb {
    pub const UNIT: Self = Self {
        start: Vec3::ZERO,
        end: Vec3::ONE,
    };

    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Box around a single point, ready to be grown with [`Aabb::expand`].
    pub fn from_point(point: Vec3) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    pub fn from_radius(pos: Vec3, radius: f32) -> Self {
        Self {
            start: pos - Vec3::splat(radius),
            end: pos + Vec3::splat(radius),
        }
    }

    /// The lattice box of a chunk: every corner the scanner samples.
    pub fn from_lattice(min: IVec3, size: i32) -> Self {
        Self {
            start: min.as_vec3(),
            end: (min + IVec3::splat(size)).as_vec3(),
        }
    }

    pub fn expand(&mut self, point: Vec3) {
        self.start = self.start.min(point);
        self.end = self.end.max(point);
    }

    pub fn union(&self, other: Aabb) -> Aabb {
        Aabb {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.end - self.start
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.start).all() && point.cmple(self.end).all()
    }

    pub fn intersects(&self, other: Aabb) -> bool {
        !matches!(self.intersect(other), IntersectType::DoesNotIntersect)
    }

    /// Touching boxes count as intersecting: a surface on the shared face
    /// still produces sign changes on the lattice.
    pub fn intersect(&self, other: Aabb) -> IntersectType {
        if self.start.cmpgt(other.end).any() || other.start.cmpgt(self.end).any() {
            return IntersectType::DoesNotIntersect;
        }

        if self.start.cmple(other.start).all() && self.end.cmpge(other.end).all() {
            return IntersectType::Contains;
        }

        IntersectType::Intersects(Aabb {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }
}

#[test]
fn aabb_intersect_test() {
    use glam::vec3;

    let unit = Aabb::UNIT;
    assert!(matches!(unit.intersect(Aabb::from_radius(Vec3::splat(0.5), 0.25)), IntersectType::Contains));
    assert!(matches!(unit.intersect(Aabb::from_radius(Vec3::splat(3.0), 1.0)), IntersectType::DoesNotIntersect));

    match unit.intersect(Aabb::new(Vec3::splat(0.5), Vec3::splat(2.0))) {
        IntersectType::Intersects(overlap) => assert_eq!(overlap, Aabb::new(Vec3::splat(0.5), Vec3::ONE)),
        _ => panic!("expected a partial overlap"),
    }

    // Shared face
    assert!(unit.intersects(Aabb::new(vec3(1.0, 0.0, 0.0), vec3(2.0, 1.0, 1.0))));
}

#[test]
fn aabb_expand_test() {
    use glam::vec3;

    let mut aabb = Aabb::from_point(vec3(1.0, 2.0, 3.0));
    aabb.expand(vec3(-1.0, 4.0, 3.0));
    assert_eq!(aabb, Aabb::new(vec3(-1.0, 2.0, 3.0), vec3(1.0, 4.0, 3.0)));
    assert_eq!(aabb.size(), vec3(2.0, 2.0, 0.0));
    assert!(aabb.contains(vec3(0.0, 3.0, 3.0)));
    assert!(!aabb.contains(vec3(0.0, 3.0, 3.5)));

    assert_eq!(Aabb::from_lattice(IVec3::new(8, 0, -8), 8), Aabb::new(vec3(8.0, 0.0, -8.0), vec3(16.0, 8.0, 0.0)));
}
