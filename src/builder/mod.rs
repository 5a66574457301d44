//! Offline construction pipeline (spec §4.4): voxelize a height field or
//! mesh into per-chunk trees, canonicalize and merge them into one DAG,
//! then linearize to a dense `NodeArray`.

pub mod canonicalize;
pub mod cpu_tree;
pub mod height_build;
pub mod linearize;
pub mod merge;
pub mod mesh_build;

pub use height_build::{build_from_heightmap, BuildStats};
pub use mesh_build::{build_from_mesh, Material, TextureSampler};
