use crate::{
    config::BvhConfig,
    error::{Error, Result},
    primitives::{Containment, Intersect, AABB},
    ray::{sort_crossings, Crossings, Hit, Ray},
};
use glam::Vec3;
use log::debug;
use rayon::prelude::*;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

pub(crate) trait GetAxis {
    type Output;

    fn axis(&self, axis: Axis) -> Self::Output;
}

impl GetAxis for Vec3 {
    type Output = f32;

    fn axis(&self, axis: Axis) -> Self::Output {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// A Bounding Volume Hirarchy
///
/// Built by splitting each range of objects at the median center along the
/// axis where the centers spread the most. Large ranges are split on rayon
/// tasks; the result is the same tree a single threaded build produces.
#[derive(Debug)]
pub struct Bvh {
    /// The objects that make up the scene, ordered so every leaf is a contiguous run
    geometry: Vec<Arc<dyn Intersect>>,
    /// The BVH tree
    tree: Vec<FlatNode>,
}

/// Shape of a built hierarchy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BvhStats {
    pub nodes: usize,
    pub leaves: usize,
    pub depth: usize,
}

impl Bvh {
    pub fn new(geometry: Vec<Arc<dyn Intersect>>) -> Result<Self> {
        Self::with_config(geometry, &BvhConfig::default())
    }

    pub fn with_config(geometry: Vec<Arc<dyn Intersect>>, config: &BvhConfig) -> Result<Self> {
        if geometry.is_empty() {
            return Err(Error::EmptyScene);
        }

        // How many objects can be in the same node
        let leaf_size = config.leaf_size.max(1);
        let parallel_threshold = config.parallel_threshold.max(2);

        // Precompute build info about the geometry
        let mut build_geometry = geometry
            .iter()
            .enumerate()
            .map(|(index, geom)| {
                let bounds = geom.bounds();
                GeometryInfo {
                    index,
                    center: bounds.centroid(),
                    bounds,
                }
            })
            .collect::<Vec<_>>();

        let root = Bvh::build(&mut build_geometry, 0, leaf_size, parallel_threshold);

        // Make a flat tree of FlatNodes from the root node of a BuildNode tree
        let tree = Self::flatten(root);

        // Leaves refer to the geometry in the order the build left it in
        let geometry = build_geometry
            .iter()
            .map(|g| geometry[g.index].clone())
            .collect();

        let bvh = Self { geometry, tree };
        let stats = bvh.stats();
        debug!(
            "Built BVH over {} objects: {} nodes, {} leaves, depth {}",
            bvh.len(),
            stats.nodes,
            stats.leaves,
            stats.depth
        );

        Ok(bvh)
    }

    fn build(
        geometry: &mut [GeometryInfo],
        offset: usize,
        leaf_size: usize,
        parallel_threshold: usize,
    ) -> BuildNode {
        // Create bounding box for all geometry in this BuildNode
        let bounds = geometry
            .iter()
            .fold(AABB::empty(), |b, g| b.union(g.bounds));

        // Check if we are a leaf
        if geometry.len() <= leaf_size {
            return BuildNode::leaf(bounds, offset, geometry.len());
        }

        // Decide which axis to spilt the objects along
        let split_axis = Self::centroid_bounds(geometry, parallel_threshold).max_extent();

        // Partition around the median center without sorting the whole range
        let mid = geometry.len() / 2;
        geometry.select_nth_unstable_by(mid, |a, b| {
            a.center.axis(split_axis).total_cmp(&b.center.axis(split_axis))
        });

        let parallel = geometry.len() >= parallel_threshold;
        let (left, right) = geometry.split_at_mut(mid);
        let (left, right) = if parallel {
            rayon::join(
                || Bvh::build(left, offset, leaf_size, parallel_threshold),
                || Bvh::build(right, offset + mid, leaf_size, parallel_threshold),
            )
        } else {
            (
                Bvh::build(left, offset, leaf_size, parallel_threshold),
                Bvh::build(right, offset + mid, leaf_size, parallel_threshold),
            )
        };

        BuildNode::interior(Box::new(left), Box::new(right))
    }

    /// Box around the centers of all geometry in range, reduced in parallel for large ranges
    fn centroid_bounds(geometry: &[GeometryInfo], parallel_threshold: usize) -> AABB {
        if geometry.len() >= parallel_threshold {
            geometry
                .par_iter()
                .fold(AABB::empty, |b, g| b.point_union(g.center))
                .reduce(AABB::empty, AABB::union)
        } else {
            geometry
                .iter()
                .fold(AABB::empty(), |b, g| b.point_union(g.center))
        }
    }

    fn flatten(root: BuildNode) -> Vec<FlatNode> {
        let mut tree = Vec::new();
        Self::flatten_impl(root, &mut tree);

        tree
    }

    fn flatten_impl(node: BuildNode, tree: &mut Vec<FlatNode>) -> usize {
        let offset = tree.len();
        match node.inner {
            BuildNodeInner::Interior { left, right } => {
                tree.push(FlatNode::interior(node.bounds, 0, 0));
                let left_idx = Self::flatten_impl(*left, tree);
                let right_idx = Self::flatten_impl(*right, tree);
                if let FlatNodeInner::Interior {
                    ref mut left,
                    ref mut right,
                } = tree[offset].inner
                {
                    *left = left_idx;
                    *right = right_idx;
                }
            }
            BuildNodeInner::Leaf {
                geometry_offset,
                num_primitives,
            } => {
                tree.push(FlatNode::leaf(node.bounds, geometry_offset, num_primitives));
            }
        }

        offset
    }

    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    /// Always false; a hierarchy cannot be built empty
    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    /// Every object, in leaf order
    pub fn objects(&self) -> &[Arc<dyn Intersect>] {
        &self.geometry
    }

    /// The members of every leaf
    pub fn leaves(&self) -> impl Iterator<Item = &[Arc<dyn Intersect>]> + '_ {
        self.tree.iter().filter_map(move |node| match node.inner {
            FlatNodeInner::Leaf {
                geometry_offset,
                num_primitives,
            } => Some(&self.geometry[geometry_offset..geometry_offset + num_primitives]),
            FlatNodeInner::Interior { .. } => None,
        })
    }

    pub fn stats(&self) -> BvhStats {
        fn depth(tree: &[FlatNode], index: usize) -> usize {
            match tree[index].inner {
                FlatNodeInner::Interior { left, right } => {
                    1 + depth(tree, left).max(depth(tree, right))
                }
                FlatNodeInner::Leaf { .. } => 1,
            }
        }

        BvhStats {
            nodes: self.tree.len(),
            leaves: self.leaves().count(),
            depth: depth(&self.tree, 0),
        }
    }

    fn members(&self, node: &FlatNode) -> &[Arc<dyn Intersect>] {
        match node.inner {
            FlatNodeInner::Leaf {
                geometry_offset,
                num_primitives,
            } => &self.geometry[geometry_offset..geometry_offset + num_primitives],
            FlatNodeInner::Interior { .. } => &[],
        }
    }

    fn intersect(&self, index: usize, ray: Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        let node = &self.tree[index];
        if !node.bounds.has_intersection(ray, t_min, t_max) {
            return None;
        }

        match node.inner {
            FlatNodeInner::Interior { left, right } => {
                // Whatever the right side finds has to beat the left side's hit
                let left = self.intersect(left, ray, t_min, t_max);
                let closest = left.as_ref().map_or(t_max, |hit| hit.t);
                let right = self.intersect(right, ray, t_min, closest);

                right.or(left)
            }
            FlatNodeInner::Leaf { .. } => {
                let mut hit = None;
                let mut closest = t_max;

                // Find the closest intersection
                for primitive in self.members(node) {
                    if let Some(h) = primitive.intersection(ray, t_min, closest) {
                        closest = h.t;
                        hit = Some(h);
                    }
                }

                hit
            }
        }
    }

    fn collect_crossings(
        &self,
        index: usize,
        ray: Ray,
        t_min: f32,
        t_max: f32,
        crossings: &mut Crossings,
        inside: &mut usize,
    ) {
        let node = &self.tree[index];
        if !node.bounds.has_intersection(ray, t_min, t_max) {
            return;
        }

        match node.inner {
            FlatNodeInner::Interior { left, right } => {
                self.collect_crossings(left, ray, t_min, t_max, crossings, inside);
                self.collect_crossings(right, ray, t_min, t_max, crossings, inside);
            }
            FlatNodeInner::Leaf { .. } => {
                for primitive in self.members(node) {
                    let found = primitive.intersections(ray, t_min, t_max);
                    let starts_inside = match found.first() {
                        Some(first) => !first.entering,
                        None => primitive.contains(ray.point_at_parameter(t_min)),
                    };
                    if starts_inside {
                        *inside += 1;
                    }
                    crossings.extend(found);
                }
            }
        }
    }

    fn contains_impl(&self, index: usize, point: Vec3) -> bool {
        let node = &self.tree[index];
        if !node.bounds.contains_point(point) {
            return false;
        }

        match node.inner {
            FlatNodeInner::Interior { left, right } => {
                self.contains_impl(left, point) || self.contains_impl(right, point)
            }
            FlatNodeInner::Leaf { .. } => self.members(node).iter().any(|p| p.contains(point)),
        }
    }

    /// Folds member classifications the way a union of the members would
    fn classify_impl(&self, index: usize, region: &AABB, acc: Containment) -> Containment {
        let node = &self.tree[index];
        if acc == Containment::Inside || !node.bounds.overlaps(region) {
            return acc;
        }

        match node.inner {
            FlatNodeInner::Interior { left, right } => {
                let acc = self.classify_impl(left, region, acc);
                self.classify_impl(right, region, acc)
            }
            FlatNodeInner::Leaf { .. } => {
                self.members(node)
                    .iter()
                    .fold(acc, |acc, p| match (acc, p.classify(region)) {
                        (Containment::Inside, _) | (_, Containment::Inside) => Containment::Inside,
                        (Containment::Outside, Containment::Outside) => Containment::Outside,
                        _ => Containment::Straddling,
                    })
            }
        }
    }
}

impl Intersect for Bvh {
    fn intersection(&self, ray: Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        self.intersect(0, ray, t_min, t_max)
    }

    /// Crossings of the union of the members. Where members overlap, only
    /// the changes between outside all of them and inside at least one are kept.
    fn intersections(&self, ray: Ray, t_min: f32, t_max: f32) -> Crossings {
        let mut crossings = Crossings::new();
        let mut depth = 0;
        self.collect_crossings(0, ray, t_min, t_max, &mut crossings, &mut depth);
        sort_crossings(&mut crossings);

        crossings.retain(|crossing| {
            if crossing.entering {
                depth += 1;
                depth == 1
            } else if depth > 0 {
                depth -= 1;
                depth == 0
            } else {
                false
            }
        });
        crossings
    }

    fn bounds(&self) -> AABB {
        self.tree[0].bounds
    }

    fn contains(&self, point: Vec3) -> bool {
        self.contains_impl(0, point)
    }

    fn classify(&self, region: &AABB) -> Containment {
        self.classify_impl(0, region, Containment::Outside)
    }
}

struct GeometryInfo {
    index: usize,
    center: Vec3,
    bounds: AABB,
}

#[derive(Debug)]
enum BuildNodeInner {
    Interior {
        left: Box<BuildNode>,
        right: Box<BuildNode>,
    },
    Leaf {
        geometry_offset: usize,
        num_primitives: usize,
    },
}

#[derive(Debug)]
struct BuildNode {
    bounds: AABB,
    inner: BuildNodeInner,
}

impl BuildNode {
    fn interior(left: Box<BuildNode>, right: Box<BuildNode>) -> Self {
        let bounds = left.bounds.union(right.bounds);

        Self {
            bounds,
            inner: BuildNodeInner::Interior { left, right },
        }
    }

    fn leaf(bounds: AABB, geometry_offset: usize, num_primitives: usize) -> Self {
        Self {
            bounds,
            inner: BuildNodeInner::Leaf {
                geometry_offset,
                num_primitives,
            },
        }
    }
}

#[derive(Debug, PartialEq)]
enum FlatNodeInner {
    Interior {
        left: usize,
        right: usize,
    },
    Leaf {
        geometry_offset: usize,
        num_primitives: usize,
    },
}

#[derive(Debug, PartialEq)]
struct FlatNode {
    bounds: AABB,
    inner: FlatNodeInner,
}

impl FlatNode {
    fn interior(bounds: AABB, left: usize, right: usize) -> Self {
        Self {
            bounds,
            inner: FlatNodeInner::Interior { left, right },
        }
    }

    fn leaf(bounds: AABB, geometry_offset: usize, num_primitives: usize) -> Self {
        Self {
            bounds,
            inner: FlatNodeInner::Leaf {
                geometry_offset,
                num_primitives,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{Cuboid, Sphere};
    use glam::vec3;

    fn row_of_spheres(count: usize) -> Vec<Arc<dyn Intersect>> {
        (0..count)
            .map(|i| {
                Arc::new(Sphere::new(vec3(i as f32 * 3.0, 0.0, 0.0), 1.0)) as Arc<dyn Intersect>
            })
            .collect()
    }

    #[test]
    fn test_empty_build_is_rejected() {
        assert!(matches!(Bvh::new(Vec::new()), Err(Error::EmptyScene)));
    }

    #[test]
    fn test_single_object_is_one_leaf() {
        let bvh = Bvh::new(row_of_spheres(1)).unwrap();
        assert_eq!(
            bvh.stats(),
            BvhStats {
                nodes: 1,
                leaves: 1,
                depth: 1
            }
        );
    }

    #[test]
    fn test_leaves_respect_leaf_size() {
        let bvh = Bvh::new(row_of_spheres(37)).unwrap();
        assert!(bvh.leaves().all(|leaf| !leaf.is_empty() && leaf.len() <= 4));
        assert_eq!(bvh.leaves().map(|leaf| leaf.len()).sum::<usize>(), 37);
    }

    #[test]
    fn test_nearest_hit_along_row() {
        let bvh = Bvh::new(row_of_spheres(20)).unwrap();
        let ray = Ray::new(vec3(-10.0, 0.0, 0.0), Vec3::X);

        let hit = bvh.intersection(ray, 0.0, f32::INFINITY).unwrap();
        assert!((hit.t - 9.0).abs() < 1e-5);

        let back = Ray::new(vec3(100.0, 0.0, 0.0), -Vec3::X);
        let hit = bvh.intersection(back, 0.0, f32::INFINITY).unwrap();
        assert!((hit.t - (100.0 - 58.0)).abs() < 1e-4);
    }

    #[test]
    fn test_all_crossings_sorted() {
        let bvh = Bvh::new(row_of_spheres(10)).unwrap();
        let ray = Ray::new(vec3(-10.0, 0.0, 0.0), Vec3::X);

        let crossings = bvh.intersections(ray, 0.0, f32::INFINITY);
        assert_eq!(crossings.len(), 20);
        assert!(crossings.windows(2).all(|w| w[0].t() <= w[1].t()));
    }

    #[test]
    fn test_overlapping_members_cross_as_union() {
        let objects: Vec<Arc<dyn Intersect>> = vec![
            Arc::new(Sphere::new(Vec3::ZERO, 1.0)),
            Arc::new(Sphere::new(vec3(1.0, 0.0, 0.0), 1.0)),
        ];
        let bvh = Bvh::new(objects).unwrap();

        let ray = Ray::new(vec3(-5.0, 0.0, 0.0), Vec3::X);
        let crossings = bvh.intersections(ray, 0.0, f32::INFINITY);
        assert_eq!(crossings.len(), 2);
        assert!((crossings[0].t() - 4.0).abs() < 1e-5 && crossings[0].entering);
        assert!((crossings[1].t() - 7.0).abs() < 1e-5 && !crossings[1].entering);

        // Starting inside both members leaves only the final exit
        let inside = Ray::new(vec3(0.5, 0.0, 0.0), Vec3::X);
        let crossings = bvh.intersections(inside, 0.0, f32::INFINITY);
        assert_eq!(crossings.len(), 1);
        assert!((crossings[0].t() - 1.5).abs() < 1e-5 && !crossings[0].entering);
    }

    #[test]
    fn test_parallel_and_sequential_builds_match() {
        let objects: Vec<Arc<dyn Intersect>> = (0..500)
            .map(|i| {
                let f = i as f32;
                let center = vec3((f * 7.31).sin() * 40.0, (f * 3.17).cos() * 40.0, f * 0.1);
                Arc::new(Cuboid::new(center, center + Vec3::ONE)) as Arc<dyn Intersect>
            })
            .collect();

        let sequential = Bvh::with_config(
            objects.clone(),
            &BvhConfig {
                leaf_size: 4,
                parallel_threshold: usize::MAX,
            },
        )
        .unwrap();
        let parallel = Bvh::with_config(
            objects,
            &BvhConfig {
                leaf_size: 4,
                parallel_threshold: 16,
            },
        )
        .unwrap();

        assert_eq!(sequential.tree, parallel.tree);
        let same_order = sequential
            .objects()
            .iter()
            .zip(parallel.objects())
            .all(|(a, b)| crate::primitives::same_shape(a, b));
        assert!(same_order);
    }

    #[test]
    fn test_contains_and_classify_as_union() {
        let bvh = Bvh::new(row_of_spheres(5)).unwrap();
        assert!(bvh.contains(vec3(6.0, 0.5, 0.0)));
        assert!(!bvh.contains(vec3(1.5, 0.0, 0.0)));

        let inside = AABB::new(vec3(2.8, -0.1, -0.1), vec3(3.2, 0.1, 0.1));
        let gap = AABB::new(vec3(1.2, -0.1, -0.1), vec3(1.8, 0.1, 0.1));
        assert_eq!(bvh.classify(&inside), Containment::Inside);
        assert_eq!(bvh.classify(&gap), Containment::Outside);
    }
}
