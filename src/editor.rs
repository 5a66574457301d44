//! Copy-on-write live editing (spec §4.5, §4.6). Ported near 1:1 from
//! `examples/original_source/Renderer/src/SVDAGEditor.cpp`
//! (`ensureNodeIsMutable`, `recursiveModify`, `recursivePaint`,
//! `recursiveModifyRegion`, `createSolidLeafNode`), keeping the same
//! recursive shape with idiomatic `snake_case` names.

use nalgebra::Vector3;

use crate::geometry::GridBox;
use crate::node::{Node, NodeArray};

/// Wraps a `NodeArray` with a live root index and a copy-on-write
/// modification log (spec §4.6): every node touched since the last
/// `clear_modified_lists` call is recorded once, and every brand-new node
/// lives at or after `new_nodes_start_index()` — together enough for a
/// caller to re-upload only the delta to a renderer.
pub struct Editor {
    nodes: NodeArray,
    root_index: u32,
    max_depth: u32,
    original_node_count: usize,
    modified_indices: Vec<u32>,
}

impl Editor {
    pub fn new(nodes: NodeArray, root_index: u32, max_depth: u32) -> Self {
        let original_node_count = nodes.len();
        Editor {
            nodes,
            root_index,
            max_depth,
            original_node_count,
            modified_indices: Vec::new(),
        }
    }

    pub fn nodes(&self) -> &NodeArray {
        &self.nodes
    }

    pub fn root_index(&self) -> u32 {
        self.root_index
    }

    pub fn modified_indices(&self) -> &[u32] {
        &self.modified_indices
    }

    pub fn new_nodes_start_index(&self) -> usize {
        self.original_node_count
    }

    pub fn clear_modified_lists(&mut self) {
        self.modified_indices.clear();
        self.original_node_count = self.nodes.len();
    }

    fn in_unit_cube(world_pos: Vector3<f32>) -> bool {
        world_pos.iter().all(|&c| (0.0..1.0).contains(&c))
    }

    fn octant_at(world_pos: Vector3<f32>, depth: u32) -> (u8, u8) {
        let scale = 2f32.powi(depth as i32);
        let rel = (world_pos * scale).map(|c| c.fract());
        let octant = (rel.x > 0.5) as u8 | (((rel.y > 0.5) as u8) << 1) | (((rel.z > 0.5) as u8) << 2);
        (octant, 1u8 << octant)
    }

    /// Clones `node_index`'s node if it is shared (`refs > 1`), returning a
    /// fresh, exclusively-owned index; returns `node_index` unchanged
    /// otherwise. Either way the index is recorded as touched.
    fn ensure_node_is_mutable(&mut self, node_index: u32) -> u32 {
        if self.nodes.get(node_index).refs > 1 {
            self.nodes.get_mut(node_index).refs -= 1;
            self.modified_indices.push(node_index);

            let mut new_node = *self.nodes.get(node_index);
            new_node.refs = 1;
            self.nodes.push(new_node)
        } else {
            self.modified_indices.push(node_index);
            node_index
        }
    }

    /// Sets the voxel at `world_pos` (each component in `[0, 1)`) to
    /// `material`, creating intermediate nodes as needed. Returns `false`
    /// for an out-of-range position, leaving the tree untouched.
    pub fn set(&mut self, world_pos: Vector3<f32>, material: u16) -> bool {
        if !Self::in_unit_cube(world_pos) {
            return false;
        }
        self.root_index = self.recursive_modify(self.root_index, world_pos, 0, true, material);
        true
    }

    /// Clears the voxel at `world_pos`. Returns `false` for an out-of-range
    /// position.
    pub fn clear(&mut self, world_pos: Vector3<f32>) -> bool {
        if !Self::in_unit_cube(world_pos) {
            return false;
        }
        self.root_index = self.recursive_modify(self.root_index, world_pos, 0, false, 0);
        true
    }

    /// Repaints the voxel at `world_pos` without changing occupancy.
    /// A homogeneous-solid ancestor is repainted in place rather than split
    /// (spec §4.5.2 rule 1). Returns `false` for an out-of-range position
    /// or if the target voxel is unoccupied.
    pub fn paint(&mut self, world_pos: Vector3<f32>, material: u16) -> bool {
        if !Self::in_unit_cube(world_pos) {
            return false;
        }
        self.root_index = self.recursive_paint(self.root_index, world_pos, 0, material);
        true
    }

    fn recursive_modify(
        &mut self,
        node_index: u32,
        target_pos: Vector3<f32>,
        current_depth: u32,
        add_voxel: bool,
        material: u16,
    ) -> u32 {
        let mutable_index = self.ensure_node_is_mutable(node_index);

        if current_depth == self.max_depth - 1 {
            let (_, child_bit) = Self::octant_at(target_pos, current_depth);
            let node = self.nodes.get_mut(mutable_index);
            if add_voxel {
                node.child_mask |= child_bit;
                node.material = material;
            } else {
                node.child_mask &= !child_bit;
            }
            return mutable_index;
        }

        let (octant, child_bit) = Self::octant_at(target_pos, current_depth);
        let has_child = self.nodes.get(mutable_index).has_child(octant);

        if !has_child && !add_voxel {
            return mutable_index;
        }
        if !has_child {
            let new_child_index = self.nodes.push(Node::new_empty_owned());
            let node = self.nodes.get_mut(mutable_index);
            node.children[octant as usize] = new_child_index;
            node.child_mask |= child_bit;
        }

        let old_child_index = self.nodes.get(mutable_index).children[octant as usize];
        let new_child_index =
            self.recursive_modify(old_child_index, target_pos, current_depth + 1, add_voxel, material);

        if new_child_index != old_child_index {
            self.nodes.get_mut(mutable_index).children[octant as usize] = new_child_index;
            self.nodes.get_mut(old_child_index).refs -= 1;
            self.modified_indices.push(old_child_index);
        }

        mutable_index
    }

    fn recursive_paint(
        &mut self,
        node_index: u32,
        target_pos: Vector3<f32>,
        current_depth: u32,
        material: u16,
    ) -> u32 {
        if node_index == crate::node::SENTINEL {
            return node_index;
        }

        if current_depth == self.max_depth - 1 {
            let (_, child_bit) = Self::octant_at(target_pos, current_depth);
            if self.nodes.get(node_index).child_mask & child_bit != 0 {
                let mutable_index = self.ensure_node_is_mutable(node_index);
                self.nodes.get_mut(mutable_index).material = material;
                return mutable_index;
            }
            return node_index;
        }

        if self.nodes.get(node_index).is_homogeneous_solid() {
            let mutable_index = self.ensure_node_is_mutable(node_index);
            self.nodes.get_mut(mutable_index).material = material;
            return mutable_index;
        }

        let (octant, child_bit) = Self::octant_at(target_pos, current_depth);
        if self.nodes.get(node_index).child_mask & child_bit == 0 {
            return node_index;
        }

        let mutable_index = self.ensure_node_is_mutable(node_index);
        let old_child_index = self.nodes.get(mutable_index).children[octant as usize];
        let new_child_index = self.recursive_paint(old_child_index, target_pos, current_depth + 1, material);

        if new_child_index != old_child_index {
            self.nodes.get_mut(mutable_index).children[octant as usize] = new_child_index;
            self.nodes.get_mut(old_child_index).refs -= 1;
            self.modified_indices.push(old_child_index);
        }

        mutable_index
    }

    /// Adds or clears every voxel inside `target_box` (inclusive voxel
    /// coordinates). A wholly-covered node becomes a single solid leaf
    /// (add) or is dropped (clear) without descending further; a
    /// partially-covered homogeneous-solid node is split into eight solid
    /// children first so per-octant edits can proceed (spec §4.5.3). A
    /// region split this way is never automatically re-merged back into a
    /// solid node by later edits — only an offline re-canonicalize would do
    /// that (see DESIGN.md Open Questions).
    pub fn modify_region(&mut self, target_box: GridBox, add_voxels: bool, material: u16) {
        let resolution = 1u32 << self.max_depth;
        let root_box = GridBox::root(resolution);
        self.root_index =
            self.recursive_modify_region(self.root_index, target_box, root_box, 0, add_voxels, material);
    }

    fn recursive_modify_region(
        &mut self,
        node_index: u32,
        target_box: GridBox,
        node_box: GridBox,
        current_depth: u32,
        add_voxels: bool,
        material: u16,
    ) -> u32 {
        if !target_box.intersects(&node_box) {
            return node_index;
        }

        if target_box.contains(&node_box) {
            return if add_voxels {
                self.create_solid_leaf_node(material)
            } else {
                crate::node::SENTINEL
            };
        }

        if current_depth == self.max_depth - 1 {
            let mutable_index = self.ensure_node_is_mutable(node_index);
            for octant in 0..8u8 {
                let voxel_box = node_box.child_box(octant);
                if target_box.intersects(&voxel_box) {
                    let child_bit = 1u8 << octant;
                    let node = self.nodes.get_mut(mutable_index);
                    if add_voxels {
                        node.child_mask |= child_bit;
                        node.material = material;
                    } else {
                        node.child_mask &= !child_bit;
                    }
                }
            }
            return mutable_index;
        }

        let node_index = if self.nodes.get(node_index).is_homogeneous_solid() {
            let mutable_index = self.ensure_node_is_mutable(node_index);
            let original_material = self.nodes.get(mutable_index).material;
            for octant in 0..8 {
                let leaf = self.create_solid_leaf_node(original_material);
                self.nodes.get_mut(mutable_index).children[octant] = leaf;
            }
            self.nodes.get_mut(mutable_index).material = 0;
            mutable_index
        } else {
            node_index
        };

        let mutable_index = self.ensure_node_is_mutable(node_index);

        for octant in 0..8u8 {
            let child_node_box = node_box.child_box(octant);
            if !target_box.intersects(&child_node_box) {
                continue;
            }

            let child_bit = 1u8 << octant;
            let has_child = self.nodes.get(mutable_index).child_mask & child_bit != 0;

            let old_child_index = if !has_child {
                if !add_voxels {
                    continue;
                }
                let new_child_index = self.nodes.push(Node::new_empty_owned());
                let node = self.nodes.get_mut(mutable_index);
                node.children[octant as usize] = new_child_index;
                node.child_mask |= child_bit;
                new_child_index
            } else {
                self.nodes.get(mutable_index).children[octant as usize]
            };

            let new_child_index = self.recursive_modify_region(
                old_child_index,
                target_box,
                child_node_box,
                current_depth + 1,
                add_voxels,
                material,
            );

            if new_child_index != old_child_index {
                self.nodes.get_mut(mutable_index).children[octant as usize] = new_child_index;

                if old_child_index != crate::node::SENTINEL {
                    self.nodes.get_mut(old_child_index).refs -= 1;
                    self.modified_indices.push(old_child_index);
                }

                if new_child_index == crate::node::SENTINEL {
                    self.nodes.get_mut(mutable_index).child_mask &= !child_bit;
                }
            }
        }

        mutable_index
    }

    fn create_solid_leaf_node(&mut self, material: u16) -> u32 {
        self.nodes.push(Node::new_solid_leaf(material))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_editor(max_depth: u32) -> Editor {
        let mut nodes = NodeArray::new();
        let root = nodes.push(Node::new_empty_owned());
        Editor::new(nodes, root, max_depth)
    }

    #[test]
    fn set_then_get_single_voxel() {
        let mut editor = fresh_editor(3);
        assert!(editor.set(Vector3::new(0.1, 0.1, 0.1), 0x07E0));
        let root = editor.nodes().get(editor.root_index());
        assert!(root.child_mask != 0);
    }

    #[test]
    fn out_of_range_position_is_rejected() {
        let mut editor = fresh_editor(3);
        assert!(!editor.set(Vector3::new(1.5, 0.0, 0.0), 1));
    }

    #[test]
    fn clear_removes_previously_set_voxel() {
        let mut editor = fresh_editor(1);
        let pos = Vector3::new(0.1, 0.1, 0.1);
        editor.set(pos, 5);
        editor.clear(pos);
        let leaf_index = editor.root_index();
        let leaf = editor.nodes().get(leaf_index);
        assert_eq!(leaf.child_mask, 0);
    }

    #[test]
    fn copy_on_write_clones_shared_node() {
        let mut editor = fresh_editor(3);
        editor.set(Vector3::new(0.1, 0.1, 0.1), 1);
        let shared_index = editor.root_index();
        editor.nodes.get_mut(shared_index).refs = 2;

        let before_len = editor.nodes().len();
        editor.set(Vector3::new(0.1, 0.1, 0.2), 2);
        assert!(editor.nodes().len() > before_len, "a clone should have been appended");
        assert_ne!(editor.root_index(), shared_index);
    }

    #[test]
    fn paint_preserves_child_mask() {
        let mut editor = fresh_editor(3);
        editor.set(Vector3::new(0.1, 0.1, 0.1), 1);
        let before = editor.nodes().get(editor.root_index()).child_mask;
        editor.paint(Vector3::new(0.1, 0.1, 0.1), 2);
        let after = editor.nodes().get(editor.root_index());
        assert_eq!(after.child_mask, before);
        // Material repainting descends to the leaf actually touched, not
        // necessarily the root; just assert the operation didn't panic and
        // the tree shape is unchanged.
    }

    #[test]
    fn modify_region_fills_whole_tree_as_one_solid_leaf() {
        let mut editor = fresh_editor(2);
        let resolution = 1u32 << 2;
        let whole = GridBox::root(resolution);
        editor.modify_region(whole, true, 9);
        let root = editor.nodes().get(editor.root_index());
        assert!(root.is_homogeneous_solid());
        assert_eq!(root.material, 9);
    }

    #[test]
    fn modify_region_partial_splits_solid_node() {
        let mut editor = fresh_editor(2);
        let resolution = 1u32 << 2;
        editor.modify_region(GridBox::root(resolution), true, 9);

        let sub_box = GridBox::new(Vector3::new(0, 0, 0), Vector3::new(1, 1, 1));
        editor.modify_region(sub_box, true, 3);

        let root = editor.nodes().get(editor.root_index());
        assert!(!root.is_homogeneous_solid(), "partial overwrite should split the solid node");
    }
}
