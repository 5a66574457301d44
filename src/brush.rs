//! Shape-to-voxel-set rasterizer that drives the editor (spec §4.5.5).
//! Grounded on the distance-based per-voxel enumeration and shape dispatch
//! in `examples/pengiie-rogue/src/engine/editor/brush/mod.rs`
//! (`EditorWorldEditing::apply_edit`).

use nalgebra::Vector3;

use crate::editor::Editor;
use crate::geometry::GridBox;

/// Result of the abstract "brush-center provider" (spec §6): an external
/// picking oracle, modeled here only as the shape of its answer. The
/// editor never runs the pick itself.
#[derive(Debug, Clone, Copy)]
pub struct PickHit {
    pub hit: bool,
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
}

/// The three brush shapes (spec §4.5.5). Sphere and paint enumerate voxels
/// individually because they are the common case at small radii; box
/// delegates to `modify_region` so it can exploit the region primitive's
/// whole-subtree pruning.
pub enum BrushShape {
    Sphere { center: Vector3<f32>, radius: f32 },
    Paint { center: Vector3<f32>, radius: f32 },
    Box { corner_a: Vector3<u32>, corner_b: Vector3<u32> },
}

/// Applies `shape` to `editor` with `material`, clearing instead of setting
/// when `add_voxels` is false. `resolution` is the tree's voxel-grid edge
/// length (`2^max_depth`), needed to convert a sphere/paint's world-space
/// center (`[0,1)^3`) into voxel coordinates.
pub fn apply(editor: &mut Editor, resolution: u32, shape: &BrushShape, add_voxels: bool, material: u16) {
    match *shape {
        BrushShape::Sphere { center, radius } => {
            enumerate_sphere(editor, resolution, center, radius, |editor, pos| {
                if add_voxels {
                    editor.set(pos, material);
                } else {
                    editor.clear(pos);
                }
            });
        }
        BrushShape::Paint { center, radius } => {
            enumerate_sphere(editor, resolution, center, radius, |editor, pos| {
                editor.paint(pos, material);
            });
        }
        BrushShape::Box { corner_a, corner_b } => {
            let min = corner_a.zip_map(&corner_b, |a, b| a.min(b));
            let max = corner_a.zip_map(&corner_b, |a, b| a.max(b));
            editor.modify_region(GridBox::new(min, max), add_voxels, material);
        }
    }
}

fn enumerate_sphere(
    editor: &mut Editor,
    resolution: u32,
    center: Vector3<f32>,
    radius: f32,
    mut touch: impl FnMut(&mut Editor, Vector3<f32>),
) {
    let voxel_center = center * resolution as f32;
    let voxel_radius = radius * resolution as f32;

    let min = voxel_center.map(|c| (c - voxel_radius).floor().max(0.0) as u32);
    let max = voxel_center.map(|c| (c + voxel_radius).ceil().min(resolution as f32 - 1.0) as u32);

    for x in min.x..=max.x {
        for y in min.y..=max.y {
            for z in min.z..=max.z {
                let voxel_pos = Vector3::new(x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5);
                if (voxel_pos - voxel_center).norm() <= voxel_radius {
                    touch(editor, voxel_pos / resolution as f32);
                }
            }
        }
    }
}
