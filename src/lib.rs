//! Ray queries over solids built from primitives, CSG trees and bounding
//! volume hierarchies, plus Boolean voxel octrees for volume and area
//! estimates of the same solids.
//!
//! Everything that can be hit implements [`Intersect`]. A [`Csg`] node is
//! itself a shape, so CSG trees nest and can share children, and a [`Bvh`]
//! over shapes is a shape too. [`Octree`] voxelizes any shape through its
//! containment queries.

pub mod bvh;
pub mod camera;
pub mod config;
pub mod csg;
pub mod error;
pub mod material;
pub mod octree;
pub mod primitives;
pub mod ray;
pub mod scene;

pub use crate::{
    bvh::{Bvh, BvhStats},
    config::{Config, LeafPolicy},
    csg::{Csg, Operation},
    error::{Error, Result},
    octree::{Cube, Octree, OctreeNode},
    primitives::{Containment, Intersect, AABB},
    ray::{Crossing, Hit, Ray, ShapeId},
    scene::Scene,
};

/// Random number generator used for sampling
pub type DefaultRng = rand_xoshiro::Xoshiro256Plus;
