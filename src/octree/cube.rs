use crate::primitives::AABB;
use glam::{vec3, Vec3};

/// An axis aligned cube given by its minimum corner and edge length.
///
/// Octants are numbered by bit: bit 0 selects the upper half in x, bit 1 in y
/// and bit 2 in z.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cube {
    pub min: Vec3,
    pub width: f32,
}

impl Cube {
    pub fn new(min: Vec3, width: f32) -> Self {
        Self { min, width }
    }

    /// Smallest cube sharing the minimum corner of `bounds` that holds all of it
    pub fn enclosing(bounds: &AABB) -> Self {
        let extent = bounds.extent();
        Self::new(bounds.min, extent.x.max(extent.y).max(extent.z))
    }

    /// Whether the cube has a finite position and a finite, positive width
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.width > 0.0 && self.min.is_finite()
    }

    pub fn max(&self) -> Vec3 {
        self.min + Vec3::splat(self.width)
    }

    pub fn center(&self) -> Vec3 {
        self.min + Vec3::splat(0.5 * self.width)
    }

    pub fn volume(&self) -> f32 {
        self.width * self.width * self.width
    }

    pub fn aabb(&self) -> AABB {
        AABB::new(self.min, self.max())
    }

    pub fn octant(&self, index: usize) -> Cube {
        let half = 0.5 * self.width;
        let offset = vec3(
            (index & 1) as f32,
            ((index >> 1) & 1) as f32,
            ((index >> 2) & 1) as f32,
        );
        Cube::new(self.min + offset * half, half)
    }

    /// Octant holding `point`; points on a splitting plane go to the upper half
    pub fn octant_index(&self, point: Vec3) -> usize {
        let center = self.center();
        (point.x >= center.x) as usize
            | ((point.y >= center.y) as usize) << 1
            | ((point.z >= center.z) as usize) << 2
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.aabb().contains_point(point)
    }

    /// Cube enclosing both cubes, anchored at their common minimum corner
    pub fn union(&self, other: &Cube) -> Cube {
        Cube::enclosing(&self.aabb().union(other.aabb()))
    }
}
