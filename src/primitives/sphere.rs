use super::{solve_quadratic, Containment, Intersect, AABB};
use crate::ray::{Crossing, Crossings, Hit, Ray};
use glam::{vec3, Vec3};
use smallvec::smallvec;

#[derive(Clone, Debug)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    fn roots(&self, ray: Ray) -> Option<(f32, f32)> {
        let oc = ray.origin - self.center;
        let a = ray.direction.dot(ray.direction);
        let b = oc.dot(ray.direction);
        let c = oc.dot(oc) - self.radius * self.radius;

        solve_quadratic(a, b, c)
    }

    fn crossing(&self, ray: Ray, t: f32) -> Crossing {
        let point = ray.point_at_parameter(t);
        Crossing::new(ray, t, (point - self.center) / self.radius)
    }
}

impl Intersect for Sphere {
    fn intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        let (t_1, t_2) = self.roots(ray)?;

        for &t in &[t_1, t_2] {
            if t_min < t && t < t_max {
                return Some(self.crossing(ray, t).hit);
            }
        }

        None
    }

    fn intersections(&self, ray: Ray, t_min: f32, t_max: f32) -> Crossings {
        let (t_1, t_2) = match self.roots(ray) {
            Some(roots) => roots,
            None => return Crossings::new(),
        };

        let mut crossings: Crossings = smallvec![];
        for &t in &[t_1, t_2] {
            if t_min < t && t < t_max {
                crossings.push(self.crossing(ray, t));
            }
        }

        crossings
    }

    fn has_intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> bool {
        match self.roots(ray) {
            Some((t_1, t_2)) => (t_min < t_1 && t_1 < t_max) || (t_min < t_2 && t_2 < t_max),
            None => false,
        }
    }

    fn bounds(&self) -> AABB {
        AABB::new(
            self.center - vec3(self.radius, self.radius, self.radius),
            self.center + vec3(self.radius, self.radius, self.radius),
        )
    }

    fn contains(&self, point: Vec3) -> bool {
        (point - self.center).length_squared() <= self.radius * self.radius
    }

    fn classify(&self, region: &AABB) -> Containment {
        let r2 = self.radius * self.radius;

        if (region.closest_point(self.center) - self.center).length_squared() >= r2 {
            Containment::Outside
        } else if (region.farthest_point(self.center) - self.center).length_squared() <= r2 {
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
    fn test_ray_sphere_through_center() {
        let sphere = Sphere::new(Vec3::ZERO, 5.0);
        let ray = Ray::new(vec3(-10.0, 0.0, 0.0), Vec3::X);

        let crossings = sphere.intersections(ray, 0.0, f32::INFINITY);
        assert_eq!(crossings.len(), 2);
        assert!((crossings[0].t() - 5.0).abs() < 1e-5);
        assert!(crossings[0].entering);
        assert!((crossings[1].t() - 15.0).abs() < 1e-5);
        assert!(!crossings[1].entering);
        assert!((crossings[0].hit.normal - -Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_ray_from_inside_exits() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);

        let hit = sphere.intersection(ray, 0.0, f32::INFINITY).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-6);

        let crossings = sphere.intersections(ray, 0.0, f32::INFINITY);
        assert_eq!(crossings.len(), 1);
        assert!(!crossings[0].entering);
    }

    #[test]
    fn test_unnormalized_direction_keeps_parameter() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let ray = Ray::new(vec3(-3.0, 0.0, 0.0), vec3(2.0, 0.0, 0.0));

        let hit = sphere.intersection(ray, 0.0, f32::INFINITY).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-6);
        assert!((hit.point - vec3(-1.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let ray = Ray::new(vec3(-3.0, 2.0, 0.0), Vec3::X);
        assert!(!sphere.has_intersection(ray, 0.0, f32::INFINITY));
        assert!(sphere.intersections(ray, 0.0, f32::INFINITY).is_empty());
    }

    #[test]
    fn test_classify_boxes() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let inside = AABB::new(Vec3::splat(-0.2), Vec3::splat(0.2));
        let outside = AABB::new(Vec3::splat(2.0), Vec3::splat(3.0));
        let across = AABB::new(Vec3::splat(0.5), Vec3::splat(1.5));

        assert_eq!(sphere.classify(&inside), Containment::Inside);
        assert_eq!(sphere.classify(&outside), Containment::Outside);
        assert_eq!(sphere.classify(&across), Containment::Straddling);
    }
}
