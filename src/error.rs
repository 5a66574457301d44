//! Error kinds per spec §7: `BuildFailure`, `CorruptReference`,
//! `OutOfMemory`. `OutOfRange` is not a typed error — per spec policy it is
//! a silent no-op/`false` return on the editor's public operations.

use std::fmt;

/// Failure of an offline build (spec §7 `BuildFailure`): mesh load error or
/// an empty triangle set. Policy: abort, leave no file.
#[derive(Debug)]
pub enum BuildError {
    EmptyTriangleSet,
    MeshLoad(anyhow::Error),
    Other(anyhow::Error),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::EmptyTriangleSet => f.write_str("mesh contains no triangles"),
            BuildError::MeshLoad(err) => write!(f, "failed to load mesh: {err}"),
            BuildError::Other(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<anyhow::Error> for BuildError {
    fn from(value: anyhow::Error) -> Self {
        BuildError::Other(value)
    }
}

/// Failure to load a serialized DAG (spec §7 `CorruptReference`): a child
/// index outside `[0, nodeCount)`, or a `childMask` bit set that disagrees
/// with a zero child pointer. Policy: reject the file at load.
#[derive(Debug)]
pub enum LoadError {
    Truncated,
    ChildOutOfRange { node: u32, octant: u8, child: u32 },
    MaskChildMismatch { node: u32, octant: u8 },
    RefcountMismatch { node: u32, expected: u32, found: u32 },
    Cycle { node: u32 },
    Io(std::io::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Truncated => f.write_str("file ended before all node records were read"),
            LoadError::ChildOutOfRange { node, octant, child } => write!(
                f,
                "node {node} octant {octant} points to out-of-range child {child}"
            ),
            LoadError::MaskChildMismatch { node, octant } => write!(
                f,
                "node {node} octant {octant}: childMask bit disagrees with child pointer"
            ),
            LoadError::RefcountMismatch { node, expected, found } => write!(
                f,
                "node {node} has refs={found}, but {expected} reachable parents point to it"
            ),
            LoadError::Cycle { node } => write!(f, "node {node} is reachable from itself"),
            LoadError::Io(err) => write!(f, "io error reading DAG file: {err}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(value: std::io::Error) -> Self {
        LoadError::Io(value)
    }
}
