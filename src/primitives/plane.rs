use super::{Containment, Intersect, AABB};
use crate::ray::{Crossing, Crossings, Ray};
use glam::Vec3;

/// How far the bounds of a half-space reach along its unbounded directions
pub const PLANE_EXTENT: f32 = 1.0e4;

/// The half-space `normal . p <= offset`.
#[derive(Clone, Debug)]
pub struct Plane {
    /// Unit normal pointing out of the solid side
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    pub fn new(normal: Vec3, offset: f32) -> Self {
        let length = normal.length();
        Self {
            normal: normal / length,
            offset: offset / length,
        }
    }

    /// The half-space on the side of `point` opposite to `normal`
    pub fn through(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self::new(normal, normal.dot(point))
    }

    fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.offset
    }
}

impl Intersect for Plane {
    fn intersections(&self, ray: Ray, t_min: f32, t_max: f32) -> Crossings {
        let mut crossings = Crossings::new();
        let denom = self.normal.dot(ray.direction);

        if denom.abs() > f32::EPSILON {
            let t = (self.offset - self.normal.dot(ray.origin)) / denom;
            if t_min < t && t < t_max {
                crossings.push(Crossing::new(ray, t, self.normal));
            }
        }

        crossings
    }

    /// Finite stand-in for an unbounded solid, tight along an axis aligned normal
    fn bounds(&self) -> AABB {
        let mut bounds = AABB::new(Vec3::splat(-PLANE_EXTENT), Vec3::splat(PLANE_EXTENT));
        for axis in 0..3 {
            let n = self.normal[axis];
            if (n.abs() - 1.0).abs() > 1e-6 {
                continue;
            }
            if n > 0.0 {
                bounds.max[axis] = self.offset / n;
            } else {
                bounds.min[axis] = self.offset / n;
            }
        }
        bounds
    }

    fn contains(&self, point: Vec3) -> bool {
        self.signed_distance(point) <= 0.0
    }

    fn classify(&self, region: &AABB) -> Containment {
        let corners = region.corners();

        if corners.iter().all(|&c| self.signed_distance(c) >= 0.0) {
            Containment::Outside
        } else if corners.iter().all(|&c| self.signed_distance(c) <= 0.0) {
            Containment::Inside
        } else {
            Containment::Straddling
        }
    }
}
