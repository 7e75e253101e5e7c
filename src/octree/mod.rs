//! Boolean sparse voxel octrees.
//!
//! An `Octree` approximates a solid over a cube. Cells entirely outside the
//! solid are Empty, cells entirely inside are Full and cells the surface
//! passes through are split into eight octants until the depth limit. Trees
//! over different cubes are re-based onto a shared cube before combination.

mod cube;
mod node;
mod rebase;

pub use cube::*;
pub use node::*;

use crate::{
    config::{LeafPolicy, OctreeConfig},
    csg::Operation,
    error::{Error, Result},
    primitives::{Containment, Intersect, AABB},
};
use glam::Vec3;
use log::debug;
use std::{array, collections::HashSet, fmt::Write};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OctreeStats {
    pub nodes: usize,
    pub leaves: usize,
    pub full_leaves: usize,
    pub depth: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Octree {
    cube: Cube,
    root: OctreeNode,
}

impl Octree {
    pub fn new(cube: Cube, root: OctreeNode) -> Result<Self> {
        if !cube.is_valid() {
            return Err(Error::DegenerateBounds { width: cube.width });
        }
        check_depth(root.depth())?;
        Ok(Self { cube, root })
    }

    /// Voxelizes `shape` over `cube`, subdividing straddling cells at most
    /// `max_depth` times.
    pub fn build(cube: Cube, shape: &dyn Intersect, max_depth: u32) -> Result<Self> {
        Self::build_with(
            cube,
            shape,
            &OctreeConfig {
                max_depth,
                ..OctreeConfig::default()
            },
        )
    }

    pub fn build_with(cube: Cube, shape: &dyn Intersect, config: &OctreeConfig) -> Result<Self> {
        if !cube.is_valid() {
            return Err(Error::DegenerateBounds { width: cube.width });
        }
        check_depth(config.max_depth)?;

        let root = build_node(shape, cube, config.max_depth, config.leaf_policy);
        let octree = Self { cube, root };
        debug!("built octree over {:?}: {:?}", cube, octree.stats());
        Ok(octree)
    }

    /// Voxelizes `shape` over the cube enclosing its bounds
    pub fn from_shape(shape: &dyn Intersect, max_depth: u32) -> Result<Self> {
        Self::build(Cube::enclosing(&shape.bounds()), shape, max_depth)
    }

    /// Reads the text produced by `Display` back into a tree over `cube`
    pub fn parse(cube: Cube, text: &str) -> Result<Self> {
        Self::new(cube, text.parse()?)
    }

    pub fn cube(&self) -> Cube {
        self.cube
    }

    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    /// Complement within the root cube
    pub fn invert(&self) -> Self {
        Self {
            cube: self.cube,
            root: self.root.inverted(),
        }
    }

    pub fn combine(&self, other: &Octree, op: Operation) -> Result<Self> {
        self.combine_with(other, op, &OctreeConfig::default())
    }

    /// Boolean combination. Operands over different cubes are first re-based
    /// onto the cube enclosing both, deep enough that their finest cells line up.
    pub fn combine_with(
        &self,
        other: &Octree,
        op: Operation,
        config: &OctreeConfig,
    ) -> Result<Self> {
        if self.cube == other.cube {
            return Self::new(self.cube, self.root.combine(&other.root, op));
        }

        let shared = self.cube.union(&other.cube);
        if !shared.is_valid() {
            return Err(Error::IncompatibleBounds);
        }

        let align = |octree: &Octree| -> Result<Octree> {
            if octree.cube == shared {
                return Ok(octree.clone());
            }
            let depth =
                rebase::aligned_depth(&shared, octree.finest_width(), config.max_rebase_depth);
            debug!(
                "re-basing octree from {:?} onto {:?} at depth {}",
                octree.cube, shared, depth
            );
            octree.rebuild_onto(shared, depth, config.rebase_policy)
        };

        let left = align(self)?;
        let right = align(other)?;
        let combined = Self::new(shared, left.root.combine(&right.root, op))?;
        debug!("combined octrees with {:?}: {:?}", op, combined.stats());
        Ok(combined)
    }

    /// Rebuilds this tree's filled cells onto a different cube.
    ///
    /// Cells that are still ambiguous after `max_depth` subdivisions are
    /// resolved by `policy`.
    pub fn rebuild_onto(&self, cube: Cube, max_depth: u32, policy: LeafPolicy) -> Result<Self> {
        if !cube.is_valid() {
            return Err(Error::DegenerateBounds { width: cube.width });
        }
        check_depth(max_depth)?;
        let boxes = self.filled_boxes();
        Ok(Self {
            cube,
            root: rebase::rebase_node(cube, &boxes, max_depth, policy),
        })
    }

    /// Calls `f` with the cube, level and grid position of every leaf
    fn visit_leaves(&self, mut f: impl FnMut(&OctreeNode, Cube, usize, [u64; 3])) {
        fn visit(
            node: &OctreeNode,
            cube: Cube,
            level: usize,
            index: [u64; 3],
            f: &mut impl FnMut(&OctreeNode, Cube, usize, [u64; 3]),
        ) {
            match node {
                OctreeNode::Partial(children) => {
                    for (i, child) in children.iter().enumerate() {
                        let index = [
                            index[0] * 2 + (i & 1) as u64,
                            index[1] * 2 + ((i >> 1) & 1) as u64,
                            index[2] * 2 + ((i >> 2) & 1) as u64,
                        ];
                        visit(child, cube.octant(i), level + 1, index, f);
                    }
                }
                leaf => f(leaf, cube, level, index),
            }
        }

        visit(&self.root, self.cube, 0, [0; 3], &mut f);
    }

    /// Boxes of every Full leaf
    pub fn filled_boxes(&self) -> Vec<AABB> {
        let mut boxes = Vec::new();
        self.visit_leaves(|node, cube, _, _| {
            if node.is_full() {
                boxes.push(cube.aabb());
            }
        });
        boxes
    }

    pub fn volume(&self) -> f32 {
        let mut volume = 0.0;
        self.visit_leaves(|node, cube, _, _| {
            if node.is_full() {
                volume += cube.volume();
            }
        });
        volume
    }

    /// Area of the faces of Full leaves that no Full leaf of the same size
    /// touches. A face against a coarser or finer Full neighbour still counts.
    pub fn surface_area(&self) -> f32 {
        let mut cells = Vec::new();
        self.visit_leaves(|node, cube, level, index| {
            if node.is_full() {
                cells.push((cube.width, level, index));
            }
        });

        let occupied = cells
            .iter()
            .map(|&(_, level, index)| (level, index))
            .collect::<HashSet<_>>();

        let neighbours = |level: usize, index: [u64; 3]| {
            (0..3)
                .flat_map(move |axis| {
                    let mut below = index;
                    let mut above = index;
                    above[axis] += 1;
                    // The grid starts at zero so a cell on the low face has no neighbour below
                    let below = if index[axis] > 0 {
                        below[axis] -= 1;
                        Some(below)
                    } else {
                        None
                    };
                    [below, Some(above)]
                })
                .map(move |neighbour| neighbour.map(|n| (level, n)))
        };

        cells
            .iter()
            .map(|&(width, level, index)| {
                let exposed = neighbours(level, index)
                    .filter(|neighbour| match neighbour {
                        Some(key) => !occupied.contains(key),
                        None => true,
                    })
                    .count();
                exposed as f32 * width * width
            })
            .sum()
    }

    /// Whether `point` lies in a Full cell. Points outside the root cube are not.
    pub fn test_point(&self, point: Vec3) -> bool {
        if !self.cube.contains_point(point) {
            return false;
        }

        let mut node = &self.root;
        let mut cube = self.cube;
        while let OctreeNode::Partial(children) = node {
            let i = cube.octant_index(point);
            node = &children[i];
            cube = cube.octant(i);
        }
        node.is_full()
    }

    /// Width of the smallest leaf
    pub fn finest_width(&self) -> f32 {
        let mut finest = self.cube.width;
        self.visit_leaves(|_, cube, _, _| finest = finest.min(cube.width));
        finest
    }

    pub fn stats(&self) -> OctreeStats {
        fn walk(node: &OctreeNode, level: usize, stats: &mut OctreeStats) {
            stats.nodes += 1;
            stats.depth = stats.depth.max(level);
            match node {
                OctreeNode::Partial(children) => {
                    for child in children.iter() {
                        walk(child, level + 1, stats);
                    }
                }
                leaf => {
                    stats.leaves += 1;
                    if leaf.is_full() {
                        stats.full_leaves += 1;
                    }
                }
            }
        }

        let mut stats = OctreeStats::default();
        walk(&self.root, 0, &mut stats);
        stats
    }

    /// Indented dump of the tree, one node per line
    pub fn hierarchy(&self) -> String {
        fn dump(node: &OctreeNode, cube: Cube, level: usize, out: &mut String) {
            let kind = match node {
                OctreeNode::Empty => "empty",
                OctreeNode::Full => "full",
                OctreeNode::Partial(_) => "partial",
            };
            let _ = writeln!(
                out,
                "{:indent$}{} [{}, {}, {}] width {}",
                "",
                kind,
                cube.min.x,
                cube.min.y,
                cube.min.z,
                cube.width,
                indent = level * 2
            );
            if let Some(children) = node.children() {
                for (i, child) in children.iter().enumerate() {
                    dump(child, cube.octant(i), level + 1, out);
                }
            }
        }

        let mut out = String::new();
        dump(&self.root, self.cube, 0, &mut out);
        out
    }
}

fn check_depth(depth: u32) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::TooDeep {
            depth,
            max: MAX_DEPTH,
        });
    }
    Ok(())
}

impl std::fmt::Display for Octree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.root)
    }
}

fn build_node(shape: &dyn Intersect, cube: Cube, depth: u32, policy: LeafPolicy) -> OctreeNode {
    match shape.classify(&cube.aabb()) {
        Containment::Outside => OctreeNode::Empty,
        Containment::Inside => OctreeNode::Full,
        Containment::Straddling if depth == 0 => match policy {
            LeafPolicy::Full => OctreeNode::Full,
            LeafPolicy::Empty => OctreeNode::Empty,
            LeafPolicy::Center => OctreeNode::leaf(shape.contains(cube.center())),
        },
        Containment::Straddling => OctreeNode::partial(array::from_fn(|i| {
            build_node(shape, cube.octant(i), depth - 1, policy)
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{Cuboid, Sphere};
    use approx::assert_relative_eq;
    use glam::vec3;
    use std::f32::consts::PI;

    fn half_cube() -> Octree {
        Octree::parse(Cube::new(Vec3::ZERO, 2.0), "(BWBWBWBW").unwrap()
    }

    #[test]
    fn test_degenerate_cube_is_rejected() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let result = Octree::build(Cube::new(Vec3::ZERO, 0.0), &sphere, 3);
        assert!(matches!(result, Err(Error::DegenerateBounds { .. })));
        assert!(Octree::build(Cube::new(Vec3::ZERO, -1.0), &sphere, 3).is_err());
    }

    #[test]
    fn test_aligned_box_is_exact() {
        let cuboid = Cuboid::new(Vec3::ZERO, vec3(1.0, 2.0, 2.0));
        let octree = Octree::build(Cube::new(Vec3::ZERO, 2.0), &cuboid, 4).unwrap();

        assert_eq!(octree, half_cube());
        assert_relative_eq!(octree.volume(), 4.0);
        assert_relative_eq!(octree.surface_area(), 16.0);
    }

    #[test]
    fn test_sphere_volume_and_containment() {
        let sphere = Sphere::new(Vec3::splat(0.75), 0.6);
        let octree = Octree::build(Cube::new(Vec3::ZERO, 1.5), &sphere, 3).unwrap();

        let exact = 4.0 / 3.0 * PI * 0.6f32.powi(3);
        assert!((octree.volume() - exact).abs() / exact < 0.15);

        let root = octree.cube().aabb();
        assert!(octree.filled_boxes().iter().all(|b| root.contains(b)));
        assert!(octree.test_point(Vec3::splat(0.75)));
        assert!(!octree.test_point(Vec3::splat(0.01)));
        assert!(!octree.test_point(Vec3::splat(5.0)));
    }

    #[test]
    fn test_leaf_policies_bracket_the_solid() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let cube = Cube::new(Vec3::splat(-1.0), 2.0);
        let build = |leaf_policy| {
            let config = OctreeConfig {
                max_depth: 3,
                leaf_policy,
                ..OctreeConfig::default()
            };
            Octree::build_with(cube, &sphere, &config).unwrap().volume()
        };

        let exact = 4.0 / 3.0 * PI;
        assert!(build(LeafPolicy::Empty) < exact);
        assert!(build(LeafPolicy::Full) > exact);
        let center = build(LeafPolicy::Center);
        assert!(build(LeafPolicy::Empty) <= center && center <= build(LeafPolicy::Full));
    }

    #[test]
    fn test_empty_tree_queries() {
        let octree = Octree::new(Cube::new(Vec3::ZERO, 1.0), OctreeNode::Empty).unwrap();
        assert_eq!(octree.volume(), 0.0);
        assert_eq!(octree.surface_area(), 0.0);
        assert!(octree.filled_boxes().is_empty());
        assert!(!octree.test_point(Vec3::splat(0.5)));
    }

    #[test]
    fn test_invert() {
        let inverted = half_cube().invert();
        assert_relative_eq!(inverted.volume(), 4.0);
        assert!(inverted.test_point(vec3(1.5, 0.5, 0.5)));
        assert!(!inverted.test_point(vec3(0.5, 0.5, 0.5)));
    }

    #[test]
    fn test_combine_same_cube() {
        let union = half_cube().combine(&half_cube().invert(), Operation::Union).unwrap();
        assert_eq!(union.root(), &OctreeNode::Full);
        assert_relative_eq!(union.surface_area(), 24.0);

        let difference = half_cube().combine(&half_cube(), Operation::Difference).unwrap();
        assert_eq!(difference.root(), &OctreeNode::Empty);
    }

    #[test]
    fn test_combine_rebases_onto_shared_cube() {
        let small = Octree::new(Cube::new(Vec3::ZERO, 1.0), OctreeNode::Full).unwrap();
        let far = Octree::new(Cube::new(vec3(1.0, 0.0, 0.0), 1.0), OctreeNode::Full).unwrap();

        let union = small.combine(&far, Operation::Union).unwrap();
        assert_eq!(union.cube(), Cube::new(Vec3::ZERO, 2.0));
        assert_relative_eq!(union.volume(), 2.0);
        assert!(union.test_point(vec3(0.5, 0.5, 0.5)));
        assert!(union.test_point(vec3(1.5, 0.5, 0.5)));
        assert!(!union.test_point(vec3(1.5, 1.5, 0.5)));
    }

    fn chain(levels: u32) -> OctreeNode {
        (0..levels).fold(OctreeNode::Full, |node, _| {
            let mut children: [OctreeNode; 8] = Default::default();
            children[7] = node;
            OctreeNode::Partial(Box::new(children))
        })
    }

    #[test]
    fn test_depth_limit() {
        let cube = Cube::new(Vec3::ZERO, 1.0);
        let deepest = Octree::new(cube, chain(MAX_DEPTH)).unwrap();
        assert_eq!(deepest.stats().depth, MAX_DEPTH as usize);

        let width = deepest.finest_width();
        assert_eq!(width, 0.5f32.powi(MAX_DEPTH as i32));
        assert_eq!(deepest.surface_area(), 6.0 * width * width);

        assert!(matches!(
            Octree::new(cube, chain(MAX_DEPTH + 1)),
            Err(Error::TooDeep { depth: 64, max: 63 })
        ));
        let sphere = Sphere::new(Vec3::splat(0.5), 0.4);
        assert!(matches!(
            Octree::build(cube, &sphere, MAX_DEPTH + 1),
            Err(Error::TooDeep { .. })
        ));
        assert!(matches!(
            half_cube().rebuild_onto(cube, MAX_DEPTH + 1, LeafPolicy::Full),
            Err(Error::TooDeep { .. })
        ));
    }

    #[test]
    fn test_stats_and_hierarchy() {
        let octree = half_cube();
        let stats = octree.stats();
        assert_eq!(stats.nodes, 9);
        assert_eq!(stats.leaves, 8);
        assert_eq!(stats.full_leaves, 4);
        assert_eq!(stats.depth, 1);
        assert_relative_eq!(octree.finest_width(), 1.0);

        let hierarchy = octree.hierarchy();
        assert_eq!(hierarchy.lines().count(), 9);
        assert!(hierarchy.starts_with("partial [0, 0, 0] width 2"));
        assert!(hierarchy.lines().nth(1).unwrap().starts_with("  full"));
    }

    #[test]
    fn test_text_round_trip() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let octree = Octree::from_shape(&sphere, 3).unwrap();
        let parsed = Octree::parse(octree.cube(), &octree.to_string()).unwrap();
        assert_eq!(parsed.filled_boxes(), octree.filled_boxes());
    }
}
