//! Bottom-up structural-hash deduplication (spec §4.4.4). Ported from
//! `calculateNodeHash`/`reduceTreeRecursive` in
//! `examples/original_source/WorldBuilder/src/SVDAGBuilder.cpp`.

use std::collections::HashMap;

use super::cpu_tree::{CpuNode, CpuNodeRef};

/// Boost-style mix, matching the original `hash_combine`.
fn hash_combine(lhs: u64, rhs: u64) -> u64 {
    lhs ^ (rhs
        .wrapping_add(0x9e3779b9)
        .wrapping_add(lhs << 6)
        .wrapping_add(lhs >> 2))
}

/// `h(node) = combine(childMask, material, h(child[0]), ..., h(child[7]))`,
/// `h(null) = 0` (spec §4.4.4).
pub fn structural_hash(node: &CpuNode) -> u64 {
    let mut hash = node.child_mask as u64;
    hash = hash_combine(hash, node.material as u64);
    for child in &node.children {
        let child_hash = child.as_ref().map_or(0, |child| structural_hash(&child.borrow()));
        hash = hash_combine(hash, child_hash);
    }
    hash
}

/// Hash -> canonical node cache. A cache is thread-local for a per-chunk
/// pass and shared (but accessed single-threaded, under a mutex at the
/// handoff point) for the post-merge global pass (spec §4.4.4, §4.4.7).
pub type NodeCache = HashMap<u64, CpuNodeRef>;

/// Bottom-up dedup of `node`'s subtree, recursing into children first so
/// each slot is replaced by its canonical representative before `node`
/// itself is hashed. Returns the canonical node for this subtree — callers
/// must rewire the parent's slot to the return value and, if it differs
/// from `node`, drop their own reference to `node`.
pub fn canonicalize(node: CpuNodeRef, cache: &mut NodeCache, max_refs: &mut u32) -> CpuNodeRef {
    {
        let child_slots: Vec<Option<CpuNodeRef>> = node.borrow().children.to_vec();
        for (i, slot) in child_slots.into_iter().enumerate() {
            if let Some(child) = slot {
                let canonical = canonicalize(child, cache, max_refs);
                node.borrow_mut().children[i] = Some(canonical);
            }
        }
    }

    let hash = structural_hash(&node.borrow());
    if let Some(existing) = cache.get(&hash) {
        existing.borrow_mut().refs += 1;
        *max_refs = (*max_refs).max(existing.borrow().refs);
        existing.clone()
    } else {
        node.borrow_mut().refs = 1;
        cache.insert(hash, node.clone());
        node
    }
}
