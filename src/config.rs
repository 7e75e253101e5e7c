//! Tunables for hierarchy construction, CSG evaluation, voxelization and the
//! demo renderer, loaded from TOML.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub bvh: BvhConfig,
    pub csg: CsgConfig,
    pub octree: OctreeConfig,
    pub render: RenderConfig,
}

impl Config {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BvhConfig {
    /// How many objects can share a leaf
    pub leaf_size: usize,
    /// Ranges at least this large are split on separate rayon tasks
    pub parallel_threshold: usize,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            leaf_size: 4,
            parallel_threshold: 1024,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CsgConfig {
    /// Crossings from different operands closer than this along the ray are
    /// treated as simultaneous
    pub coincidence_epsilon: f32,
    /// Minimum |cos| between two normals for their surfaces to count as coplanar
    pub parallel_cosine: f32,
}

impl Default for CsgConfig {
    fn default() -> Self {
        Self {
            coincidence_epsilon: 1e-4,
            parallel_cosine: 0.999,
        }
    }
}

/// How a cell is resolved once it straddles the boundary and no depth remains.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeafPolicy {
    /// Fill the cell; over-approximates the solid
    Full,
    /// Leave the cell empty; under-approximates the solid
    Empty,
    /// Fill the cell only if its center is inside
    Center,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OctreeConfig {
    pub max_depth: u32,
    pub leaf_policy: LeafPolicy,
    pub rebase_policy: LeafPolicy,
    pub max_rebase_depth: u32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            leaf_policy: LeafPolicy::Center,
            rebase_policy: LeafPolicy::Full,
            max_rebase_depth: 10,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub samples: usize,
    pub output: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            samples: 4,
            output: "output.png".to_string(),
        }
    }
}
