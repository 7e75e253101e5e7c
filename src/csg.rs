//! Constructive solid geometry over anything that implements `Intersect`.
//!
//! A `Csg` node asks both operands for every crossing along a ray, merges the
//! two sorted lists and replays them while tracking whether the ray is inside
//! each operand. The node reports its own crossings wherever the combined
//! inside state flips, so nodes nest to any depth and children may be shared
//! between trees.

use crate::{
    config::CsgConfig,
    primitives::{same_shape, Containment, Intersect, AABB},
    ray::{Crossing, Crossings, Hit, Ray},
};
use glam::{Mat4, Vec3};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Operation {
    Union,
    Intersection,
    /// Left minus right
    Difference,
}

impl Operation {
    /// Whether a point is in the result given whether it is in each operand
    pub fn apply(self, left: bool, right: bool) -> bool {
        match self {
            Operation::Union => left || right,
            Operation::Intersection => left && right,
            Operation::Difference => left && !right,
        }
    }

    /// The same truth table over three valued region classifications
    pub fn classify(self, left: Containment, right: Containment) -> Containment {
        use Containment::*;

        match (self, left, right) {
            (Operation::Union, Inside, _) | (Operation::Union, _, Inside) => Inside,
            (Operation::Union, Outside, Outside) => Outside,
            (Operation::Intersection, Outside, _) | (Operation::Intersection, _, Outside) => {
                Outside
            }
            (Operation::Intersection, Inside, Inside) => Inside,
            (Operation::Difference, Outside, _) | (Operation::Difference, _, Inside) => Outside,
            (Operation::Difference, Inside, Outside) => Inside,
            _ => Straddling,
        }
    }

    /// Box guaranteed to hold the result
    pub fn bounds(self, left: AABB, right: AABB) -> AABB {
        match self {
            Operation::Union => left.union(right),
            Operation::Intersection => left.overlap(right),
            // Removing material never grows the left operand
            Operation::Difference => left,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Debug)]
pub struct Csg {
    operation: Operation,
    left: Arc<dyn Intersect>,
    right: Arc<dyn Intersect>,
    bounds: AABB,
    config: CsgConfig,
}

impl Csg {
    pub fn new(operation: Operation, left: Arc<dyn Intersect>, right: Arc<dyn Intersect>) -> Self {
        Self::with_config(operation, left, right, &CsgConfig::default())
    }

    pub fn with_config(
        operation: Operation,
        left: Arc<dyn Intersect>,
        right: Arc<dyn Intersect>,
        config: &CsgConfig,
    ) -> Self {
        let bounds = operation.bounds(left.bounds(), right.bounds());
        Self {
            operation,
            left,
            right,
            bounds,
            config: *config,
        }
    }

    pub fn union(left: Arc<dyn Intersect>, right: Arc<dyn Intersect>) -> Self {
        Self::new(Operation::Union, left, right)
    }

    pub fn intersection(left: Arc<dyn Intersect>, right: Arc<dyn Intersect>) -> Self {
        Self::new(Operation::Intersection, left, right)
    }

    pub fn difference(left: Arc<dyn Intersect>, right: Arc<dyn Intersect>) -> Self {
        Self::new(Operation::Difference, left, right)
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn left(&self) -> &Arc<dyn Intersect> {
        &self.left
    }

    pub fn right(&self) -> &Arc<dyn Intersect> {
        &self.right
    }

    /// Same operation and tolerances over new operands; bounds are recomputed
    fn rebuilt(&self, left: Arc<dyn Intersect>, right: Arc<dyn Intersect>) -> Self {
        Self::with_config(self.operation, left, right, &self.config)
    }

    /// Crossings of the same surface reported by both operands, or a ray grazing one operand
    fn coincident(&self, a: &Crossing, b: &Crossing) -> bool {
        (a.t() - b.t()).abs() < self.config.coincidence_epsilon
            && a.hit.normal.dot(b.hit.normal).abs() >= self.config.parallel_cosine
    }

    /// Whether crossing out of (or into) the right operand of a difference
    /// means entering (or leaving) the result
    fn oriented(&self, side: Side, crossing: &Crossing) -> bool {
        match (self.operation, side) {
            (Operation::Difference, Side::Right) => !crossing.entering,
            _ => crossing.entering,
        }
    }

    fn emit(&self, side: Side, crossing: &Crossing, entering: bool) -> Crossing {
        let mut hit = crossing.hit.clone();
        if self.operation == Operation::Difference && side == Side::Right {
            hit.normal = -hit.normal;
        }
        Crossing { hit, entering }
    }

    /// Every place along the ray where the combined inside state flips
    fn evaluate(&self, ray: Ray, t_min: f32, t_max: f32) -> Crossings {
        let mut result = Crossings::new();
        if !self.bounds.has_intersection(ray, t_min, t_max) {
            return result;
        }

        let left = self.left.intersections(ray, t_min, t_max);
        let right = self.right.intersections(ray, t_min, t_max);
        if left.is_empty() && right.is_empty() {
            return result;
        }

        // The ray may start inside either operand
        let origin = ray.point_at_parameter(t_min);
        let mut in_left = self.left.contains(origin);
        let mut in_right = self.right.contains(origin);
        let mut inside = self.operation.apply(in_left, in_right);

        let merged = left
            .into_iter()
            .map(|c| (Side::Left, c))
            .merge_by(right.into_iter().map(|c| (Side::Right, c)), |a, b| {
                a.1.t() <= b.1.t()
            })
            .collect::<Vec<_>>();

        let mut start = 0;
        while start < merged.len() {
            // Coincident crossings toggle their operands together before the
            // combined state is looked at again
            let mut end = start + 1;
            while end < merged.len() && self.coincident(&merged[start].1, &merged[end].1) {
                end += 1;
            }

            let group = &merged[start..end];
            for (side, crossing) in group {
                match side {
                    Side::Left => in_left = crossing.entering,
                    Side::Right => in_right = crossing.entering,
                }
            }

            let now = self.operation.apply(in_left, in_right);
            if now != inside {
                let (side, crossing) = group
                    .iter()
                    .find(|(side, crossing)| self.oriented(*side, crossing) == now)
                    .unwrap_or(&group[0]);
                result.push(self.emit(*side, crossing, now));
                inside = now;
            }

            start = end;
        }

        result
    }
}

impl Intersect for Csg {
    /// The nearest point where the ray enters the combined solid
    fn intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        self.evaluate(ray, t_min, t_max)
            .into_iter()
            .find(|crossing| crossing.entering)
            .map(|crossing| crossing.hit)
    }

    fn intersections(&self, ray: Ray, t_min: f32, t_max: f32) -> Crossings {
        self.evaluate(ray, t_min, t_max)
    }

    fn bounds(&self) -> AABB {
        self.bounds
    }

    fn contains(&self, point: Vec3) -> bool {
        self.bounds.contains_point(point)
            && self
                .operation
                .apply(self.left.contains(point), self.right.contains(point))
    }

    fn classify(&self, region: &AABB) -> Containment {
        if !self.bounds.overlaps(region) {
            return Containment::Outside;
        }

        let left = self.left.classify(region);
        // Skip the right operand when the left one already decides the result
        match (self.operation, left) {
            (Operation::Intersection, Containment::Outside)
            | (Operation::Difference, Containment::Outside) => Containment::Outside,
            (Operation::Union, Containment::Inside) => Containment::Inside,
            _ => self.operation.classify(left, self.right.classify(region)),
        }
    }

    /// Rebuilds the whole tree under the transform, recomputing bounds bottom-up
    fn transformed(&self, transform: Mat4) -> Option<Arc<dyn Intersect>> {
        let left = transformed(&self.left, transform);
        let right = transformed(&self.right, transform);
        Some(Arc::new(self.rebuilt(left, right)))
    }

    fn replaced(
        &self,
        target: &Arc<dyn Intersect>,
        replacement: &Arc<dyn Intersect>,
    ) -> Option<Arc<dyn Intersect>> {
        let swap = |child: &Arc<dyn Intersect>| {
            if same_shape(child, target) {
                Some(replacement.clone())
            } else {
                child.replaced(target, replacement)
            }
        };

        match (swap(&self.left), swap(&self.right)) {
            (None, None) => None,
            (left, right) => Some(Arc::new(self.rebuilt(
                left.unwrap_or_else(|| self.left.clone()),
                right.unwrap_or_else(|| self.right.clone()),
            ))),
        }
    }
}

/// Applies `transform` to a shape, wrapping it in an `Instance` if it cannot rebuild itself
pub fn transformed(shape: &Arc<dyn Intersect>, transform: Mat4) -> Arc<dyn Intersect> {
    shape.transformed(transform).unwrap_or_else(|| {
        Arc::new(crate::primitives::Instance::new(
            shape.clone(),
            None,
            transform,
        ))
    })
}
