//! This module is full of primitives that all impl Intersect

mod aabb;
mod cone;
mod cuboid;
mod cylinder;
mod instance;
mod mesh;
mod plane;
mod sphere;
mod torus;
mod triangle;

pub use aabb::*;
pub use cone::*;
pub use cuboid::*;
pub use cylinder::*;
pub use instance::*;
pub use mesh::*;
pub use plane::*;
pub use sphere::*;
pub use torus::*;
pub use triangle::*;

use crate::ray::{Crossings, Hit, Ray};
use glam::{Mat4, Vec3};
use std::sync::Arc;

/// How a region of space relates to a solid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Containment {
    /// No point of the region is inside
    Outside,
    /// Every point of the region is inside
    Inside,
    /// The boundary passes through the region, or it could not be decided
    Straddling,
}

/// Computes whether a ray intersects a primitive
pub trait Intersect: Send + Sync + std::fmt::Debug {
    /// Computes the nearest intersection between the ray and the primitive
    fn intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        self.intersections(ray, t_min, t_max)
            .into_iter()
            .next()
            .map(|crossing| crossing.hit)
    }

    /// Every place in `(t_min, t_max)` where the ray crosses the surface, ascending by `t`
    fn intersections(&self, ray: Ray, t_min: f32, t_max: f32) -> Crossings;

    /// Computes whether there is an intersection between the ray and the primitive.
    /// Could be cheaper than "intersection".
    fn has_intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> bool {
        self.intersection(ray, t_min, t_max).is_some()
    }

    /// Generate a bounds for the primitive
    fn bounds(&self) -> AABB;

    fn contains(&self, point: Vec3) -> bool;

    /// Decides whether `region` lies inside, outside or across the surface.
    /// `Straddling` is always an acceptable answer.
    fn classify(&self, region: &AABB) -> Containment;

    /// Rebuilds this shape under an extra transform, if it knows how to
    fn transformed(&self, _transform: Mat4) -> Option<Arc<dyn Intersect>> {
        None
    }

    /// Rebuilds this shape with every reference to `target` swapped for `replacement`.
    /// Returns `None` when `target` is not referenced.
    fn replaced(
        &self,
        _target: &Arc<dyn Intersect>,
        _replacement: &Arc<dyn Intersect>,
    ) -> Option<Arc<dyn Intersect>> {
        None
    }
}

/// Whether two handles point at the same shape
pub fn same_shape(a: &Arc<dyn Intersect>, b: &Arc<dyn Intersect>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Smallest and largest distance from the Y axis over the XZ footprint of `region`
fn radial_range(region: &AABB) -> (f32, f32) {
    let near_x = 0.0f32.max(region.min.x).min(region.max.x);
    let near_z = 0.0f32.max(region.min.z).min(region.max.z);
    let far_x = region.min.x.abs().max(region.max.x.abs());
    let far_z = region.min.z.abs().max(region.max.z.abs());

    (
        (near_x * near_x + near_z * near_z).sqrt(),
        (far_x * far_x + far_z * far_z).sqrt(),
    )
}

/// Roots of `a t^2 + 2 b t + c`, ascending. Uses the half-b form the sphere test always used.
fn solve_quadratic(a: f32, b: f32, c: f32) -> Option<(f32, f32)> {
    if a.abs() < f32::EPSILON {
        return None;
    }

    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let t_1 = (-b - root) / a;
    let t_2 = (-b + root) / a;

    Some((t_1.min(t_2), t_1.max(t_2)))
}
