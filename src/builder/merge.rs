//! Stitches per-chunk canonical subtrees into one root by chunk-Morton
//! code, then re-canonicalizes globally (spec §4.4.5). Grounded on
//! `mergeSubtrees` in
//! `examples/original_source/WorldBuilder/src/SVDAGBuilder.cpp`.

use std::collections::HashMap;

use super::canonicalize::{canonicalize, NodeCache};
use super::cpu_tree::{CpuNode, CpuNodeRef};

/// Builds the unified tree root from a map of chunk-Morton-code -> the
/// chunk's own canonical subtree root, then re-canonicalizes the whole
/// tree so subtrees shared across chunks collapse into one node.
///
/// `levels` is the number of octree levels spanned between the root and a
/// chunk root, i.e. `log2(tree_size / chunk_size)`.
pub fn merge_subtrees(
    subtrees: HashMap<u64, CpuNodeRef>,
    levels: u32,
    max_refs: &mut u32,
) -> CpuNodeRef {
    let root = CpuNode::new();

    for (subtree_code, subtree_root) in subtrees {
        let mut current = root.clone();
        for level in 0..levels {
            let child_index = ((subtree_code >> (3 * (levels - level - 1))) & 0b111) as usize;
            current.borrow_mut().child_mask |= 1 << child_index;

            if level == levels - 1 {
                current.borrow_mut().children[child_index] = Some(subtree_root.clone());
            } else {
                let next = {
                    let mut current_mut = current.borrow_mut();
                    current_mut.children[child_index]
                        .get_or_insert_with(CpuNode::new)
                        .clone()
                };
                current = next;
            }
        }
    }

    let mut cache = NodeCache::new();
    canonicalize(root, &mut cache, max_refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morton::morton_encode;
    use nalgebra::Vector3;

    #[test]
    fn merges_two_chunks_under_shared_root() {
        let mut subtrees = HashMap::new();
        let a = CpuNode::new();
        a.borrow_mut().child_mask = 0b1;
        a.borrow_mut().refs = 1;
        let b = CpuNode::new();
        b.borrow_mut().child_mask = 0b1;
        b.borrow_mut().refs = 1;

        subtrees.insert(morton_encode(Vector3::new(0, 0, 0)), a);
        subtrees.insert(morton_encode(Vector3::new(1, 0, 0)), b);

        let mut max_refs = 0;
        let root = merge_subtrees(subtrees, 1, &mut max_refs);
        // Both chunk roots are structurally identical leaves under a single
        // level of indirection, so they should canonicalize to one node.
        assert_eq!(root.borrow().child_mask.count_ones(), 2);
        let slots: Vec<_> = root
            .borrow()
            .children
            .iter()
            .filter_map(|c| c.clone())
            .collect();
        assert_eq!(slots.len(), 2);
        assert!(std::rc::Rc::ptr_eq(&slots[0], &slots[1]));
        assert_eq!(slots[0].borrow().refs, 2);
    }
}
