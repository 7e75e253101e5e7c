use super::{Cube, OctreeNode};
use crate::{config::LeafPolicy, primitives::AABB};
use std::array;

/// Rebuilds the cells of `cube` from a set of disjoint filled boxes.
///
/// A cell covered by one box is Full, a cell no box overlaps is Empty and
/// anything else is subdivided. Once `depth` runs out `policy` decides.
pub(super) fn rebase_node(
    cube: Cube,
    boxes: &[AABB],
    depth: u32,
    policy: LeafPolicy,
) -> OctreeNode {
    let region = cube.aabb();
    let overlapping = boxes
        .iter()
        .filter(|b| b.overlaps(&region))
        .copied()
        .collect::<Vec<_>>();

    if overlapping.is_empty() {
        return OctreeNode::Empty;
    }
    if overlapping.iter().any(|b| b.contains(&region)) {
        return OctreeNode::Full;
    }
    if depth == 0 {
        return match policy {
            LeafPolicy::Full => OctreeNode::Full,
            LeafPolicy::Empty => OctreeNode::Empty,
            LeafPolicy::Center => {
                let center = cube.center();
                OctreeNode::leaf(overlapping.iter().any(|b| b.contains_point(center)))
            }
        };
    }

    OctreeNode::partial(array::from_fn(|i| {
        rebase_node(cube.octant(i), &overlapping, depth - 1, policy)
    }))
}

/// Depth needed on `target` for cells of width `finest` to line up
pub(super) fn aligned_depth(target: &Cube, finest: f32, cap: u32) -> u32 {
    let ratio = (target.width / finest).log2();
    if !ratio.is_finite() || ratio <= 0.0 {
        return 0;
    }
    // Tolerate rounding when the ratio is an exact power of two
    ((ratio - 1e-3).ceil() as u32).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{vec3, Vec3};

    #[test]
    fn test_aligned_depth() {
        let cube = Cube::new(Vec3::ZERO, 4.0);
        assert_eq!(aligned_depth(&cube, 4.0, 10), 0);
        assert_eq!(aligned_depth(&cube, 0.5, 10), 3);
        assert_eq!(aligned_depth(&cube, 0.3, 10), 4);
        assert_eq!(aligned_depth(&cube, 1e-9, 10), 10);
    }

    #[test]
    fn test_covering_box_is_full() {
        let cube = Cube::new(Vec3::ZERO, 1.0);
        let boxes = [AABB::new(Vec3::splat(-1.0), Vec3::splat(2.0))];
        assert_eq!(
            rebase_node(cube, &boxes, 3, LeafPolicy::Empty),
            OctreeNode::Full
        );
    }

    #[test]
    fn test_aligned_boxes_rebuild_exactly() {
        let cube = Cube::new(Vec3::ZERO, 2.0);
        let boxes = [AABB::new(Vec3::ZERO, vec3(1.0, 2.0, 2.0))];
        let node = rebase_node(cube, &boxes, 4, LeafPolicy::Full);
        assert_eq!(node.to_string(), "(BWBWBWBW");
    }

    #[test]
    fn test_policy_at_depth_exhaustion() {
        let cube = Cube::new(Vec3::ZERO, 1.0);
        let boxes = [AABB::new(Vec3::ZERO, vec3(0.6, 1.0, 1.0))];

        assert_eq!(rebase_node(cube, &boxes, 0, LeafPolicy::Full), OctreeNode::Full);
        assert_eq!(rebase_node(cube, &boxes, 0, LeafPolicy::Empty), OctreeNode::Empty);
        assert_eq!(rebase_node(cube, &boxes, 0, LeafPolicy::Center), OctreeNode::Full);
    }
}
