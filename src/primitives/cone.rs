use super::{radial_range, solve_quadratic, Containment, Intersect, AABB};
use crate::ray::{sort_crossings, Crossing, Crossings, Ray};
use glam::{vec3, Vec3};

/// A solid cone around the Y axis with its base disk at y = 0 and apex at y = height.
#[derive(Clone, Debug)]
pub struct Cone {
    pub radius: f32,
    pub height: f32,
}

impl Cone {
    pub fn new(radius: f32, height: f32) -> Self {
        Self { radius, height }
    }

    /// Radius of the cross section at height `y`
    fn radius_at(&self, y: f32) -> f32 {
        self.radius * (self.height - y) / self.height
    }
}

impl Intersect for Cone {
    fn intersections(&self, ray: Ray, t_min: f32, t_max: f32) -> Crossings {
        let mut crossings = Crossings::new();
        let (o, d) = (ray.origin, ray.direction);
        let k = self.radius / self.height;
        let k2 = k * k;
        let h0 = self.height - o.y;

        // Side: x^2 + z^2 = k^2 (height - y)^2
        let a = d.x * d.x + d.z * d.z - k2 * d.y * d.y;
        let b = o.x * d.x + o.z * d.z + k2 * h0 * d.y;
        let c = o.x * o.x + o.z * o.z - k2 * h0 * h0;
        if let Some((t_1, t_2)) = solve_quadratic(a, b, c) {
            for &t in &[t_1, t_2] {
                let p = ray.point_at_parameter(t);
                if (0.0..=self.height).contains(&p.y) {
                    let gradient = vec3(p.x, k2 * (self.height - p.y), p.z);
                    let normal = if gradient.length_squared() > 0.0 {
                        gradient.normalize()
                    } else {
                        Vec3::Y
                    };
                    crossings.push(Crossing::new(ray, t, normal));
                }
            }
        }

        // Base
        if d.y != 0.0 {
            let t = -o.y / d.y;
            let p = ray.point_at_parameter(t);
            if p.x * p.x + p.z * p.z <= self.radius * self.radius {
                crossings.push(Crossing::new(ray, t, -Vec3::Y));
            }
        }

        crossings.retain(|c| t_min < c.t() && c.t() < t_max);
        sort_crossings(&mut crossings);
        crossings
    }

    fn bounds(&self) -> AABB {
        AABB::new(
            vec3(-self.radius, 0.0, -self.radius),
            vec3(self.radius, self.height, self.radius),
        )
    }

    fn contains(&self, point: Vec3) -> bool {
        if !(0.0..=self.height).contains(&point.y) {
            return false;
        }
        let r = self.radius_at(point.y);
        point.x * point.x + point.z * point.z <= r * r
    }

    fn classify(&self, region: &AABB) -> Containment {
        let (near, far) = radial_range(region);
        let widest = self.radius_at(region.min.y.max(0.0));

        if !self.bounds().overlaps(region) || near >= widest {
            Containment::Outside
        } else if region.min.y >= 0.0
            && region.max.y <= self.height
            && far <= self.radius_at(region.max.y)
        {
            Containment::Inside
        } else {
            Containment::Straddling
        }
    }
}
