use super::{Containment, Intersect, AABB};
use crate::ray::{Crossing, Crossings, Ray};
use glam::Vec3;

/// Determinants below this are treated as a ray parallel to the triangle
const PARALLEL_EPSILON: f32 = 1e-9;

/// A single triangle. It is a surface with no interior; closed solids are built
/// from triangles with `Mesh`.
#[derive(Clone, Debug)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    /// Unit normal, counter-clockwise winding faces outward
    pub normal: Vec3,
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        Self { v0, v1, v2, normal }
    }

    /// Möller–Trumbore; returns the ray parameter of the hit
    pub fn hit_parameter(&self, ray: Ray) -> Option<f32> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        let p = ray.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < PARALLEL_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = ray.origin - self.v0;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = ray.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        Some(edge2.dot(q) * inv_det)
    }
}

impl Intersect for Triangle {
    fn intersections(&self, ray: Ray, t_min: f32, t_max: f32) -> Crossings {
        let mut crossings = Crossings::new();
        if let Some(t) = self.hit_parameter(ray) {
            if t_min < t && t < t_max {
                crossings.push(Crossing::new(ray, t, self.normal));
            }
        }
        crossings
    }

    /// Padded along flat axes so the box never has zero volume
    fn bounds(&self) -> AABB {
        let bounds = AABB::new(self.v0, self.v0)
            .point_union(self.v1)
            .point_union(self.v2);
        let pad = Vec3::splat(1e-4);
        AABB::new(bounds.min - pad, bounds.max + pad)
    }

    fn contains(&self, _point: Vec3) -> bool {
        false
    }

    fn classify(&self, _region: &AABB) -> Containment {
        Containment::Outside
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    fn triangle() -> Triangle {
        Triangle::new(
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_ray_hits_front_face() {
        let ray = Ray::new(vec3(0.2, 0.2, 2.0), -Vec3::Z);
        let crossings = triangle().intersections(ray, 0.0, f32::INFINITY);

        assert_eq!(crossings.len(), 1);
        assert!((crossings[0].t() - 2.0).abs() < 1e-6);
        assert_eq!(crossings[0].hit.normal, Vec3::Z);
        assert!(crossings[0].entering);
    }

    #[test]
    fn test_ray_outside_edges_misses() {
        let ray = Ray::new(vec3(0.8, 0.8, 2.0), -Vec3::Z);
        assert!(triangle().intersection(ray, 0.0, f32::INFINITY).is_none());
    }

    #[test]
    fn test_parallel_ray_misses() {
        let ray = Ray::new(vec3(-1.0, 0.2, 0.0), Vec3::X);
        assert!(triangle().hit_parameter(ray).is_none());
    }

    #[test]
    fn test_flat_bounds_have_volume() {
        assert!(triangle().bounds().volume() > 0.0);
    }
}
