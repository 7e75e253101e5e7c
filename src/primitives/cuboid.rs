use super::{Containment, Intersect, AABB};
use crate::ray::{Crossing, Crossings, Ray};
use glam::Vec3;

/// An axis aligned solid box. Rotated boxes are cuboids wrapped in an `Instance`.
#[derive(Clone, Debug)]
pub struct Cuboid {
    pub min: Vec3,
    pub max: Vec3,
}

impl Cuboid {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Slab entry and exit over the whole ray, with the axis each came from
    fn slabs(&self, ray: Ray) -> Option<((f32, usize), (f32, usize))> {
        let mut near = (f32::NEG_INFINITY, 0);
        let mut far = (f32::INFINITY, 0);

        for axis in 0..3 {
            let origin = ray.origin[axis];
            if ray.direction[axis] == 0.0 {
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }

            let inv = ray.inv_direction[axis];
            let t0 = (self.min[axis] - origin) * inv;
            let t1 = (self.max[axis] - origin) * inv;
            let (t0, t1) = if t0 < t1 { (t0, t1) } else { (t1, t0) };

            if t0 > near.0 {
                near = (t0, axis);
            }
            if t1 < far.0 {
                far = (t1, axis);
            }
        }

        if near.0 <= far.0 {
            Some((near, far))
        } else {
            None
        }
    }

    fn face_normal(&self, point: Vec3, axis: usize) -> Vec3 {
        let mut normal = Vec3::ZERO;
        let center = 0.5 * (self.min[axis] + self.max[axis]);
        normal[axis] = if point[axis] < center { -1.0 } else { 1.0 };
        normal
    }
}

impl Intersect for Cuboid {
    fn intersections(&self, ray: Ray, t_min: f32, t_max: f32) -> Crossings {
        let mut crossings = Crossings::new();

        if let Some(((near, near_axis), (far, far_axis))) = self.slabs(ray) {
            for &(t, axis) in &[(near, near_axis), (far, far_axis)] {
                if t_min < t && t < t_max && t.is_finite() {
                    let normal = self.face_normal(ray.point_at_parameter(t), axis);
                    crossings.push(Crossing::new(ray, t, normal));
                }
            }
        }

        crossings
    }

    fn bounds(&self) -> AABB {
        AABB::new(self.min, self.max)
    }

    fn contains(&self, point: Vec3) -> bool {
        self.bounds().contains_point(point)
    }

    fn classify(&self, region: &AABB) -> Containment {
        let bounds = self.bounds();
        if !bounds.overlaps(region) {
            Containment::Outside
        } else if bounds.contains(region) {
            Containment::Inside
        } else {
            Containment::Straddling
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    #[test]
    fn test_ray_cuboid_entry_exit() {
        let cuboid = Cuboid::new(Vec3::ZERO, Vec3::ONE);
        let ray = Ray::new(vec3(-1.0, 0.5, 0.5), Vec3::X);

        let crossings = cuboid.intersections(ray, 0.0, f32::INFINITY);
        assert_eq!(crossings.len(), 2);
        assert!((crossings[0].t() - 1.0).abs() < 1e-6);
        assert_eq!(crossings[0].hit.normal, -Vec3::X);
        assert!(crossings[0].entering);
        assert!((crossings[1].t() - 2.0).abs() < 1e-6);
        assert_eq!(crossings[1].hit.normal, Vec3::X);
        assert!(!crossings[1].entering);
    }

    #[test]
    fn test_ray_cuboid_diagonal_face() {
        let cuboid = Cuboid::new(Vec3::ZERO, Vec3::ONE);
        let ray = Ray::new(vec3(0.5, 3.0, 0.5), vec3(0.1, -1.0, 0.0));

        let hit = cuboid.intersection(ray, 0.0, f32::INFINITY).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-5);
        assert_eq!(hit.normal, Vec3::Y);
    }

    #[test]
    fn test_parallel_ray_outside_slab_misses() {
        let cuboid = Cuboid::new(Vec3::ZERO, Vec3::ONE);
        let ray = Ray::new(vec3(-1.0, 2.0, 0.5), Vec3::X);
        assert!(cuboid.intersections(ray, 0.0, f32::INFINITY).is_empty());
    }

    #[test]
    fn test_classify() {
        let cuboid = Cuboid::new(Vec3::ZERO, Vec3::splat(2.0));
        let inner = AABB::new(Vec3::splat(0.5), Vec3::splat(1.0));
        let touching = AABB::new(vec3(2.0, 0.0, 0.0), vec3(3.0, 1.0, 1.0));
        let across = AABB::new(Vec3::splat(1.5), Vec3::splat(2.5));

        assert_eq!(cuboid.classify(&inner), Containment::Inside);
        assert_eq!(cuboid.classify(&touching), Containment::Outside);
        assert_eq!(cuboid.classify(&across), Containment::Straddling);
    }
}
