//! Triangle-mesh voxelization: BVH query plus SAT test per candidate voxel,
//! barycentric UV interpolation and nearest-sample texture lookup (spec
//! §4.4.2). Grounded on the `Triangle`/`materialIndex` fields in
//! `examples/original_source/WorldBuilder/include/TriangleBVH.h` and the
//! barycentric/texture-sampling members declared in
//! `examples/original_source/WorldBuilder/include/SVDAGBuilder.h`
//! (`calculateBarycentric`, `sampleTextureColor`, `colorToRGB565`). Texture
//! data itself is an external collaborator behind the `TextureSampler`
//! trait, since the crate carries no image-decoding dependency.

use std::collections::{HashMap, HashSet};

use nalgebra::Vector3;
use parking_lot::Mutex;
use rayon::prelude::*;

use super::canonicalize::{canonicalize, NodeCache};
use super::cpu_tree::{from_node_array, CpuNode};
use super::linearize::linearize;
use super::merge::merge_subtrees;
use crate::color::rgb565;
use crate::error::BuildError;
use crate::geometry::{triangle_intersects_aabb, Aabb, Triangle, TriangleBvh};
use crate::morton::morton_encode;
use crate::node::NodeArray;

use super::height_build::BuildStats;

/// Per-material appearance: a flat color, or a nearest-sample texture
/// lookup keyed by a triangle's interpolated UV.
pub enum Material {
    Flat(Vector3<f32>),
    Textured(Box<dyn TextureSampler>),
}

/// Nearest-sample texture lookup abstraction (spec §1 "Out of scope": the
/// crate does not decode image files itself).
pub trait TextureSampler: Send + Sync {
    /// Samples at UV coordinates `(u, v)`, each conventionally in `[0, 1]`,
    /// returning an 8-bit-per-channel RGB color.
    fn sample(&self, u: f32, v: f32) -> [u8; 3];
}

fn material_color(materials: &[Material], triangle: &Triangle, uv: nalgebra::Vector2<f32>) -> u16 {
    match &materials[triangle.material_index as usize] {
        Material::Flat(color) => rgb565(*color),
        Material::Textured(sampler) => {
            let [r, g, b] = sampler.sample(uv.x, uv.y);
            rgb565(Vector3::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0))
        }
    }
}

/// Voxelizes `triangles` into a tree of `tree_size^3` voxels, processing one
/// `chunk_size^3` chunk at a time (spec §4.4.2, §4.4.7). `voxel_scale` maps
/// one voxel's edge length to world-space units. An empty triangle set is a
/// `BuildFailure` (spec §7): the build aborts before any work happens and
/// leaves no file.
pub fn build_from_mesh(
    tree_size: u32,
    chunk_size: u32,
    voxel_scale: f32,
    triangles: &[Triangle],
    materials: &[Material],
    default_material: u16,
) -> Result<(NodeArray, BuildStats), BuildError> {
    if triangles.is_empty() {
        return Err(BuildError::EmptyTriangleSet);
    }

    assert!(tree_size.is_power_of_two() && chunk_size.is_power_of_two());
    assert!(chunk_size <= tree_size);

    let max_depth = tree_size.trailing_zeros();
    let built_levels = chunk_size.trailing_zeros();
    let chunk_depth = max_depth - built_levels;

    let bvh = TriangleBvh::build(triangles);

    let chunk_coords: Vec<(u32, u32, u32)> = (0..tree_size)
        .step_by(chunk_size as usize)
        .flat_map(|cx| {
            (0..tree_size).step_by(chunk_size as usize).flat_map(move |cz| {
                (0..tree_size)
                    .step_by(chunk_size as usize)
                    .map(move |cy| (cx, cy, cz))
            })
        })
        .collect();

    let subtrees: Mutex<HashMap<u64, NodeArray>> = Mutex::new(HashMap::new());
    let leaf_voxels = std::sync::atomic::AtomicU64::new(0);

    chunk_coords.into_par_iter().for_each(|(chunk_x, chunk_y, chunk_z)| {
        let chunk_min = Vector3::new(chunk_x, chunk_y, chunk_z).map(|c| c as f32 * voxel_scale);
        let chunk_max = chunk_min + Vector3::repeat(chunk_size as f32 * voxel_scale);
        let chunk_aabb = Aabb::new_two_point(chunk_min, chunk_max);
        let candidates = bvh.query(&chunk_aabb);

        if candidates.is_empty() {
            return;
        }

        let subtree_root = CpuNode::new();
        let mut seen: HashSet<u64> = HashSet::new();
        let mut chunk_leaf_voxels = 0u64;

        for voxel_x in chunk_x..chunk_x + chunk_size {
            for voxel_y in chunk_y..chunk_y + chunk_size {
                for voxel_z in chunk_z..chunk_z + chunk_size {
                    let voxel_center = Vector3::new(voxel_x, voxel_y, voxel_z)
                        .map(|c| (c as f32 + 0.5) * voxel_scale);
                    let voxel_half = Vector3::repeat(voxel_scale * 0.5);

                    let mut hit_material: Option<u16> = None;
                    for &candidate in &candidates {
                        let triangle = &triangles[candidate as usize];
                        if triangle_intersects_aabb(triangle, voxel_center, voxel_half) {
                            let bary = triangle.barycentric(voxel_center);
                            let uv = triangle.interpolate_uv(bary);
                            hit_material = Some(if materials.is_empty() {
                                default_material
                            } else {
                                material_color(materials, triangle, uv)
                            });
                            break;
                        }
                    }

                    if let Some(material) = hit_material {
                        let morton = morton_encode(Vector3::new(voxel_x, voxel_y, voxel_z));
                        if seen.insert(morton) {
                            chunk_leaf_voxels += 1;
                            CpuNode::insert(&subtree_root, morton, chunk_depth, max_depth, material);
                        }
                    }
                }
            }
        }

        leaf_voxels.fetch_add(chunk_leaf_voxels, std::sync::atomic::Ordering::Relaxed);

        if chunk_leaf_voxels == 0 {
            return;
        }

        let mut local_cache = NodeCache::new();
        let mut local_max_refs = 0;
        let subtree_root = canonicalize(subtree_root, &mut local_cache, &mut local_max_refs);
        let subtree_array = linearize(&subtree_root);

        let subtree_code = morton_encode(Vector3::new(
            chunk_x / chunk_size,
            chunk_y / chunk_size,
            chunk_z / chunk_size,
        ));
        subtrees.lock().insert(subtree_code, subtree_array);
    });

    let subtrees = subtrees.into_inner();
    let levels = (tree_size / chunk_size).trailing_zeros();
    let rematerialized: HashMap<u64, _> = subtrees
        .iter()
        .map(|(&code, array)| (code, from_node_array(array, 1)))
        .collect();

    let mut max_refs = 0;
    let root = merge_subtrees(rematerialized, levels, &mut max_refs);
    let nodes = linearize(&root);

    let stats = BuildStats {
        leaf_voxels: leaf_voxels.load(std::sync::atomic::Ordering::Relaxed),
        max_height: 0,
        min_height: 0,
        max_refs,
    };

    Ok((nodes, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;

    fn cube_triangles() -> Vec<Triangle> {
        // A single downward-facing quad (two triangles) spanning the whole
        // chunk near the bottom, enough to exercise voxelization without a
        // full mesh loader.
        let uv = Vector2::zeros();
        vec![
            Triangle {
                v0: Vector3::new(0.0, 0.0, 0.0),
                v1: Vector3::new(8.0, 0.0, 0.0),
                v2: Vector3::new(0.0, 0.0, 8.0),
                uv0: uv,
                uv1: uv,
                uv2: uv,
                material_index: 0,
            },
            Triangle {
                v0: Vector3::new(8.0, 0.0, 0.0),
                v1: Vector3::new(8.0, 0.0, 8.0),
                v2: Vector3::new(0.0, 0.0, 8.0),
                uv0: uv,
                uv1: uv,
                uv2: uv,
                material_index: 0,
            },
        ]
    }

    #[test]
    fn voxelizes_a_flat_quad() {
        let triangles = cube_triangles();
        let materials = vec![Material::Flat(Vector3::new(0.2, 0.6, 0.2))];
        let (nodes, stats) = build_from_mesh(16, 8, 1.0, &triangles, &materials, 0).unwrap();
        assert!(stats.leaf_voxels > 0);
        assert!(nodes.len() > 1);
    }

    #[test]
    fn empty_mesh_is_a_build_failure() {
        let result = build_from_mesh(16, 8, 1.0, &[], &[], 0);
        assert!(matches!(result, Err(BuildError::EmptyTriangleSet)));
    }
}
