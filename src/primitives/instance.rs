use super::{same_shape, Containment, Intersect, AABB};
use crate::{
    material::Material,
    ray::{Crossings, Hit, Ray, ShapeId},
};
use glam::{Mat3, Mat4, Vec3};
use std::{fmt, sync::Arc};

/// A shape placed in the world with a transform and a material.
///
/// The shape itself may be shared between many instances and CSG trees. Rays
/// are moved into the shape's local space without normalizing the direction,
/// so hit parameters stay in world units.
#[derive(Clone)]
pub struct Instance {
    primitive: Arc<dyn Intersect>,
    material: Option<Arc<dyn Material>>,
    transform: Mat4,
    inverse: Mat4,
    normal_matrix: Mat3,
    bounds: AABB,
    id: ShapeId,
}

impl Instance {
    pub fn new(
        primitive: Arc<dyn Intersect>,
        material: Option<Arc<dyn Material>>,
        transform: Mat4,
    ) -> Self {
        let inverse = transform.inverse();
        let normal_matrix = Mat3::from_mat4(inverse).transpose();
        let bounds = primitive.bounds().transform(transform);

        Self {
            primitive,
            material,
            transform,
            inverse,
            normal_matrix,
            bounds,
            id: ShapeId::next(),
        }
    }

    pub fn receiver(primitive: Arc<dyn Intersect>, material: Arc<dyn Material>) -> Self {
        Self::new(primitive, Some(material), Mat4::IDENTITY)
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn primitive(&self) -> &Arc<dyn Intersect> {
        &self.primitive
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// Same shape and material under a new transform, with freshly computed bounds
    pub fn with_transform(&self, transform: Mat4) -> Self {
        Self {
            id: self.id,
            ..Self::new(self.primitive.clone(), self.material.clone(), transform)
        }
    }

    fn local_ray(&self, ray: Ray) -> Ray {
        Ray::new(
            self.inverse.transform_point3(ray.origin),
            self.inverse.transform_vector3(ray.direction),
        )
    }

    /// Moves a hit found in local space back into the world
    fn world_hit(&self, ray: Ray, mut hit: Hit) -> Hit {
        hit.point = ray.point_at_parameter(hit.t);
        hit.normal = (self.normal_matrix * hit.normal).normalize();
        if hit.material.is_none() {
            hit.material = self.material.clone();
        }
        if hit.owner.is_none() {
            hit.owner = Some(self.id);
        }
        hit
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("primitive", &self.primitive)
            .field("transform", &self.transform)
            .finish()
    }
}

impl Intersect for Instance {
    fn intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        if !self.bounds.has_intersection(ray, t_min, t_max) {
            return None;
        }

        self.primitive
            .intersection(self.local_ray(ray), t_min, t_max)
            .map(|hit| self.world_hit(ray, hit))
    }

    fn intersections(&self, ray: Ray, t_min: f32, t_max: f32) -> Crossings {
        if !self.bounds.has_intersection(ray, t_min, t_max) {
            return Crossings::new();
        }

        let mut crossings = self.primitive.intersections(self.local_ray(ray), t_min, t_max);
        for crossing in crossings.iter_mut() {
            crossing.hit = self.world_hit(ray, crossing.hit.clone());
        }
        crossings
    }

    fn has_intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> bool {
        self.bounds.has_intersection(ray, t_min, t_max)
            && self
                .primitive
                .has_intersection(self.local_ray(ray), t_min, t_max)
    }

    fn bounds(&self) -> AABB {
        self.bounds
    }

    fn contains(&self, point: Vec3) -> bool {
        self.primitive.contains(self.inverse.transform_point3(point))
    }

    /// Classifies the local box enclosing the region; exact for translations and scales.
    fn classify(&self, region: &AABB) -> Containment {
        if !self.bounds.overlaps(region) {
            return Containment::Outside;
        }
        self.primitive.classify(&region.transform(self.inverse))
    }

    fn transformed(&self, transform: Mat4) -> Option<Arc<dyn Intersect>> {
        Some(Arc::new(self.with_transform(transform * self.transform)))
    }

    fn replaced(
        &self,
        target: &Arc<dyn Intersect>,
        replacement: &Arc<dyn Intersect>,
    ) -> Option<Arc<dyn Intersect>> {
        let primitive = if same_shape(&self.primitive, target) {
            replacement.clone()
        } else {
            self.primitive.replaced(target, replacement)?
        };

        Some(Arc::new(Self {
            id: self.id,
            ..Self::new(primitive, self.material.clone(), self.transform)
        }))
    }
}
