//! Error types for scene, CSG and octree construction.

use thiserror::Error;

/// Errors that can occur while building or combining acceleration structures.
#[derive(Error, Debug)]
pub enum Error {
    /// A BVH or scene was built from an empty object list.
    #[error("cannot build a hierarchy from an empty object list")]
    EmptyScene,

    /// An octree was requested over a cube with no usable volume.
    #[error("degenerate octree bounds: width {width}")]
    DegenerateBounds { width: f32 },

    /// Two octrees whose bounds cannot be reconciled onto a shared cube.
    #[error("octree bounds cannot be reconciled")]
    IncompatibleBounds,

    /// An octree would subdivide past the deepest addressable level.
    #[error("octree depth {depth} exceeds the maximum of {max}")]
    TooDeep { depth: u32, max: u32 },

    /// Malformed octree text.
    #[error("invalid octree encoding at {position}: {found}")]
    Parse { position: usize, found: String },

    /// Mesh has no triangles or refers to missing vertices.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// Scene mutation referred to a missing object.
    #[error("object index {index} out of range for scene of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for csgtrace operations.
pub type Result<T> = std::result::Result<T, Error>;
