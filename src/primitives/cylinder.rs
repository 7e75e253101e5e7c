use super::{radial_range, solve_quadratic, Containment, Intersect, AABB};
use crate::ray::{sort_crossings, Crossing, Crossings, Ray};
use glam::{vec3, Vec3};

/// A capped cylinder around the Y axis, centered on the origin.
#[derive(Clone, Debug)]
pub struct Cylinder {
    pub radius: f32,
    pub half_height: f32,
}

impl Cylinder {
    pub fn new(radius: f32, half_height: f32) -> Self {
        Self {
            radius,
            half_height,
        }
    }
}

impl Intersect for Cylinder {
    fn intersections(&self, ray: Ray, t_min: f32, t_max: f32) -> Crossings {
        let mut crossings = Crossings::new();
        let (o, d) = (ray.origin, ray.direction);
        let r2 = self.radius * self.radius;

        // Side: x^2 + z^2 = r^2
        let a = d.x * d.x + d.z * d.z;
        let b = o.x * d.x + o.z * d.z;
        let c = o.x * o.x + o.z * o.z - r2;
        if let Some((t_1, t_2)) = solve_quadratic(a, b, c) {
            for &t in &[t_1, t_2] {
                let p = ray.point_at_parameter(t);
                if p.y.abs() <= self.half_height {
                    crossings.push(Crossing::new(ray, t, vec3(p.x, 0.0, p.z) / self.radius));
                }
            }
        }

        // Caps
        if d.y != 0.0 {
            for &(y, normal) in &[(-self.half_height, -Vec3::Y), (self.half_height, Vec3::Y)] {
                let t = (y - o.y) / d.y;
                let p = ray.point_at_parameter(t);
                if p.x * p.x + p.z * p.z <= r2 {
                    crossings.push(Crossing::new(ray, t, normal));
                }
            }
        }

        crossings.retain(|c| t_min < c.t() && c.t() < t_max);
        sort_crossings(&mut crossings);
        crossings
    }

    fn bounds(&self) -> AABB {
        let extent = vec3(self.radius, self.half_height, self.radius);
        AABB::new(-extent, extent)
    }

    fn contains(&self, point: Vec3) -> bool {
        point.y.abs() <= self.half_height
            && point.x * point.x + point.z * point.z <= self.radius * self.radius
    }

    fn classify(&self, region: &AABB) -> Containment {
        let (near, far) = radial_range(region);

        if !self.bounds().overlaps(region) || near >= self.radius {
            Containment::Outside
        } else if far <= self.radius
            && region.min.y >= -self.half_height
            && region.max.y <= self.half_height
        {
            Containment::Inside
        } else {
            Containment::Straddling
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_through_side() {
        let cylinder = Cylinder::new(1.0, 2.0);
        let ray = Ray::new(vec3(-5.0, 0.0, 0.0), Vec3::X);

        let crossings = cylinder.intersections(ray, 0.0, f32::INFINITY);
        assert_eq!(crossings.len(), 2);
        assert!((crossings[0].t() - 4.0).abs() < 1e-5);
        assert!(crossings[0].entering);
        assert!((crossings[1].t() - 6.0).abs() < 1e-5);
        assert!(!crossings[1].entering);
    }

    #[test]
    fn test_ray_through_caps() {
        let cylinder = Cylinder::new(1.0, 2.0);
        let ray = Ray::new(vec3(0.2, 5.0, 0.0), -Vec3::Y);

        let crossings = cylinder.intersections(ray, 0.0, f32::INFINITY);
        assert_eq!(crossings.len(), 2);
        assert!((crossings[0].t() - 3.0).abs() < 1e-5);
        assert_eq!(crossings[0].hit.normal, Vec3::Y);
        assert!((crossings[1].t() - 7.0).abs() < 1e-5);
        assert_eq!(crossings[1].hit.normal, -Vec3::Y);
    }

    #[test]
    fn test_ray_enters_cap_leaves_side() {
        let cylinder = Cylinder::new(1.0, 1.0);
        let ray = Ray::new(vec3(0.0, 2.0, 0.0), vec3(0.5, -1.0, 0.0));

        let crossings = cylinder.intersections(ray, 0.0, f32::INFINITY);
        assert_eq!(crossings.len(), 2);
        assert!((crossings[0].t() - 1.0).abs() < 1e-5);
        assert_eq!(crossings[0].hit.normal, Vec3::Y);
        assert!((crossings[1].t() - 2.0).abs() < 1e-5);
        assert!(crossings[0].entering);
        assert!(!crossings[1].entering);
    }

    #[test]
    fn test_contains_and_classify() {
        let cylinder = Cylinder::new(1.0, 1.0);
        assert!(cylinder.contains(vec3(0.5, 0.9, 0.5)));
        assert!(!cylinder.contains(vec3(0.9, 0.0, 0.9)));

        let core = AABB::new(Vec3::splat(-0.5), Vec3::splat(0.5));
        let beside = AABB::new(vec3(1.0, -0.5, 1.0), vec3(2.0, 0.5, 2.0));
        assert_eq!(cylinder.classify(&core), Containment::Inside);
        assert_eq!(cylinder.classify(&beside), Containment::Outside);
    }
}
