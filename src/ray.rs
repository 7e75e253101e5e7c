use crate::material::Material;
use glam::{vec3, Vec3};
use smallvec::SmallVec;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// The ray data type
#[derive(Clone, Copy, Debug, Default)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub inv_direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        let inv_direction = vec3(1.0 / direction.x, 1.0 / direction.y, 1.0 / direction.z);

        Self {
            origin,
            direction,
            inv_direction,
        }
    }

    pub fn point_at_parameter(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }
}

/// Identifies the posed object a hit belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(u64);

impl ShapeId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        ShapeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Contains data to be used in the generation of a new ray as a result of an intersection.
#[derive(Clone, Debug)]
pub struct Hit {
    pub t: f32,
    pub point: Vec3,
    /// Unit normal pointing out of the solid
    pub normal: Vec3,
    pub material: Option<Arc<dyn Material>>,
    /// Innermost `Instance` the hit passed through. Bare primitives, CSG
    /// nodes and BVHs have no identity of their own and leave this `None`.
    pub owner: Option<ShapeId>,
}

impl Hit {
    pub fn new(t: f32, point: Vec3, normal: Vec3) -> Self {
        Self {
            t,
            point,
            normal,
            material: None,
            owner: None,
        }
    }
}

/// A single place where a ray passes through the surface of a solid.
#[derive(Clone, Debug)]
pub struct Crossing {
    pub hit: Hit,
    /// Whether the ray goes from outside to inside here
    pub entering: bool,
}

impl Crossing {
    /// Builds a crossing at `t`, deciding entry or exit from the outward normal.
    pub fn new(ray: Ray, t: f32, normal: Vec3) -> Self {
        let entering = ray.direction.dot(normal) < 0.0;
        Self {
            hit: Hit::new(t, ray.point_at_parameter(t), normal),
            entering,
        }
    }

    pub fn t(&self) -> f32 {
        self.hit.t
    }
}

/// Crossings along one ray, ascending by `t`.
pub type Crossings = SmallVec<[Crossing; 4]>;

/// Sorts crossings ascending by `t`. Shapes with several surfaces gather
/// candidates out of order.
pub fn sort_crossings(crossings: &mut Crossings) {
    crossings.sort_by(|a, b| a.t().total_cmp(&b.t()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_at_parameter() {
        let ray = Ray::new(vec3(1.0, 0.0, 0.0), vec3(0.0, 2.0, 0.0));
        assert_eq!(ray.point_at_parameter(1.5), vec3(1.0, 3.0, 0.0));
    }

    #[test]
    fn test_crossing_orientation() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(Crossing::new(ray, 1.0, -Vec3::X).entering);
        assert!(!Crossing::new(ray, 1.0, Vec3::X).entering);
    }

    #[test]
    fn test_shape_ids_are_unique() {
        let a = ShapeId::next();
        let b = ShapeId::next();
        assert_ne!(a, b);
    }
}
