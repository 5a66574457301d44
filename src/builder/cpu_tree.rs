//! Pointer-linked per-chunk octree used only during construction (spec
//! §4.4.3). Ported from `CPUNode`/`insertNodeRecursive` in
//! `examples/original_source/WorldBuilder/src/SVDAGBuilder.cpp`. Children
//! are `Rc<RefCell<CpuNode>>` rather than owned `Box`es because
//! canonicalization (spec §4.4.4) must let two parents end up sharing one
//! child node with a live, mutable `refs` count — the same aliasing the
//! original expresses with `std::shared_ptr<CPUNode>`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::node::NodeArray;

pub type CpuNodeRef = Rc<RefCell<CpuNode>>;

pub struct CpuNode {
    pub child_mask: u8,
    pub refs: u32,
    pub material: u16,
    pub children: [Option<CpuNodeRef>; 8],
}

impl CpuNode {
    pub fn new() -> CpuNodeRef {
        Rc::new(RefCell::new(CpuNode {
            child_mask: 0,
            refs: 0,
            material: 0,
            children: Default::default(),
        }))
    }

    /// Walks octant-by-octant from `depth` down to `max_depth - 1`,
    /// creating interior nodes on demand. The material written at node
    /// creation is "first-writer wins": an already-present child's material
    /// is left untouched.
    pub fn insert(node: &CpuNodeRef, morton: u64, depth: u32, max_depth: u32, material: u16) {
        let octant = crate::morton::morton_octant_at_depth(morton, depth, max_depth) as usize;
        node.borrow_mut().child_mask |= 1 << octant;

        if depth == max_depth - 1 {
            return;
        }

        let child = {
            let mut node = node.borrow_mut();
            node.children[octant]
                .get_or_insert_with(|| {
                    let child = CpuNode::new();
                    child.borrow_mut().material = material;
                    child
                })
                .clone()
        };
        CpuNode::insert(&child, morton, depth + 1, max_depth, material);
    }
}

/// Rebuilds a pointer-linked `CpuNode` tree from a linearized `NodeArray`
/// (spec §4.4.7): per-chunk builds run on a rayon worker thread and must
/// hand their result back as `Send` data, which `Rc<RefCell<_>>` is not, so
/// a chunk's locally-canonicalized tree is linearized before leaving the
/// worker and rematerialized here for the global merge/canonicalize pass.
/// Indices already shared within the array (from the chunk's local
/// dedup pass) stay shared in the rebuilt tree.
pub fn from_node_array(nodes: &NodeArray, root_index: u32) -> CpuNodeRef {
    let mut built: HashMap<u32, CpuNodeRef> = HashMap::new();
    materialize(nodes, root_index, &mut built)
}

fn materialize(nodes: &NodeArray, index: u32, built: &mut HashMap<u32, CpuNodeRef>) -> CpuNodeRef {
    if let Some(existing) = built.get(&index) {
        return existing.clone();
    }

    let record = nodes.get(index);
    let node = CpuNode::new();
    {
        let mut node_mut = node.borrow_mut();
        node_mut.child_mask = record.child_mask;
        node_mut.refs = record.refs;
        node_mut.material = record.material;
    }
    built.insert(index, node.clone());

    for octant in 0..8u8 {
        let child_index = record.children[octant as usize];
        if child_index == 0 {
            continue;
        }
        let child = materialize(nodes, child_index, built);
        node.borrow_mut().children[octant as usize] = Some(child);
    }

    node
}
