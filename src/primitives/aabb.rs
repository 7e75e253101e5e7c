use crate::{bvh::Axis, Ray};
use glam::{vec3, Mat4, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for AABB {
    fn default() -> Self {
        Self::empty()
    }
}

impl AABB {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// The box enclosing nothing, neutral for `union`
    pub fn empty() -> Self {
        Self::new(Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    // Create a union AABB of two AABBs that surrounds both of them
    pub fn union(self, other: AABB) -> Self {
        let min = vec3(
            self.min.x.min(other.min.x),
            self.min.y.min(other.min.y),
            self.min.z.min(other.min.z),
        );
        let max = vec3(
            self.max.x.max(other.max.x),
            self.max.y.max(other.max.y),
            self.max.z.max(other.max.z),
        );

        AABB::new(min, max)
    }

    pub fn point_union(self, other: Vec3) -> Self {
        let min = vec3(
            self.min.x.min(other.x),
            self.min.y.min(other.y),
            self.min.z.min(other.z),
        );
        let max = vec3(
            self.max.x.max(other.x),
            self.max.y.max(other.y),
            self.max.z.max(other.z),
        );

        AABB::new(min, max)
    }

    /// The region shared by both boxes, empty if they are disjoint
    pub fn overlap(self, other: AABB) -> Self {
        let min = vec3(
            self.min.x.max(other.min.x),
            self.min.y.max(other.min.y),
            self.min.z.max(other.min.z),
        );
        let max = vec3(
            self.max.x.min(other.max.x),
            self.max.y.min(other.max.y),
            self.max.z.min(other.max.z),
        );

        let overlap = AABB::new(min, max);
        if overlap.is_empty() {
            AABB::empty()
        } else {
            overlap
        }
    }

    /// Whether the boxes share a region of positive volume. Touching faces do not count.
    pub fn overlaps(&self, other: &AABB) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
            && self.min.z < other.max.z
            && other.min.z < self.max.z
    }

    pub fn contains(&self, other: &AABB) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
            && other.max.z <= self.max.z
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.min.x <= p.x
            && p.x <= self.max.x
            && self.min.y <= p.y
            && p.y <= self.max.y
            && self.min.z <= p.z
            && p.z <= self.max.z
    }

    pub fn centroid(&self) -> Vec3 {
        0.5 * (self.min + self.max)
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    // Returns the axis which has greatest extent
    pub fn max_extent(&self) -> Axis {
        let extent = self.extent();

        if extent.x > extent.y && extent.x > extent.z {
            Axis::X
        } else if extent.y > extent.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.extent();
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    pub fn volume(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.extent();
        d.x * d.y * d.z
    }

    /// The point of the box closest to `p`
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p.max(self.min).min(self.max)
    }

    /// The corner of the box farthest from `p`
    pub fn farthest_point(&self, p: Vec3) -> Vec3 {
        let pick = |p: f32, min: f32, max: f32| if p - min > max - p { min } else { max };
        vec3(
            pick(p.x, self.min.x, self.max.x),
            pick(p.y, self.min.y, self.max.y),
            pick(p.z, self.min.z, self.max.z),
        )
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let mut corners = [Vec3::ZERO; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            *corner = vec3(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
        }
        corners
    }

    /// The box enclosing this one after an affine transform
    pub fn transform(&self, transform: Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        self.corners()
            .iter()
            .fold(AABB::empty(), |b, &c| b.point_union(transform.transform_point3(c)))
    }

    /// Clips `[t_min, t_max]` to the part of the ray inside the box.
    // Slab test taken from tavianator.com; f32::min/max drop the NaNs produced
    // by rays parallel to a slab.
    pub fn hit_range(&self, ray: Ray, t_min: f32, t_max: f32) -> Option<(f32, f32)> {
        if self.is_empty() {
            return None;
        }

        let t1 = (self.min - ray.origin) * ray.inv_direction;
        let t2 = (self.max - ray.origin) * ray.inv_direction;

        // X
        let tmin = f32::min(t1.x, t2.x);
        let tmax = f32::max(t2.x, t1.x);

        // Y
        let tmin = f32::max(tmin, f32::min(t1.y, t2.y));
        let tmax = f32::min(tmax, f32::max(t1.y, t2.y));

        // Z
        let tmin = f32::max(tmin, f32::min(t1.z, t2.z));
        let tmax = f32::min(tmax, f32::max(t1.z, t2.z));

        let tmin = f32::max(tmin, t_min);
        let tmax = f32::min(tmax, t_max);

        if tmin <= tmax {
            Some((tmin, tmax))
        } else {
            None
        }
    }

    pub fn has_intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> bool {
        self.hit_range(ray, t_min, t_max).is_some()
    }
}
