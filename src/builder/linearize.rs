//! DFS emission of a canonicalized `CpuNode` tree into a dense,
//! file-serializable `NodeArray` (spec §4.4.6). Grounded on
//! `linearize`/`linearizeRecursive` in
//! `examples/original_source/WorldBuilder/src/SVDAGBuilder.cpp`.

use std::collections::HashMap;

use super::cpu_tree::CpuNodeRef;
use crate::node::{Node, NodeArray};

fn identity(node: &CpuNodeRef) -> usize {
    node.as_ptr() as usize
}

/// Walks `root` depth-first, assigning each distinct node (by pointer
/// identity, i.e. after canonicalization) the next free slot in the
/// output array. A node already emitted — reached again through a second
/// parent, the whole point of canonicalization — is referenced by its
/// existing index rather than re-emitted.
pub fn linearize(root: &CpuNodeRef) -> NodeArray {
    let mut nodes = NodeArray::new();
    let mut index_of: HashMap<usize, u32> = HashMap::new();

    let root_index = nodes.push(Node {
        child_mask: root.borrow().child_mask,
        refs: root.borrow().refs,
        material: root.borrow().material,
        children: [0; 8],
    });
    index_of.insert(identity(root), root_index);

    linearize_recursive(root, root_index, &mut nodes, &mut index_of);
    nodes
}

fn linearize_recursive(
    node: &CpuNodeRef,
    node_index: u32,
    nodes: &mut NodeArray,
    index_of: &mut HashMap<usize, u32>,
) {
    let children: Vec<Option<CpuNodeRef>> = node.borrow().children.to_vec();
    for (i, child) in children.into_iter().enumerate() {
        let Some(child) = child else {
            nodes.get_mut(node_index).children[i] = 0;
            continue;
        };

        if let Some(&existing) = index_of.get(&identity(&child)) {
            nodes.get_mut(node_index).children[i] = existing;
            continue;
        }

        let child_index = nodes.push(Node {
            child_mask: child.borrow().child_mask,
            refs: child.borrow().refs,
            material: child.borrow().material,
            children: [0; 8],
        });
        nodes.get_mut(node_index).children[i] = child_index;
        index_of.insert(identity(&child), child_index);

        linearize_recursive(&child, child_index, nodes, index_of);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::canonicalize::{canonicalize, NodeCache};
    use crate::builder::cpu_tree::CpuNode;
    use crate::morton::morton_encode;
    use nalgebra::Vector3;

    #[test]
    fn shared_subtrees_emit_once() {
        let root = CpuNode::new();
        let a = morton_encode(Vector3::new(0, 0, 0));
        let b = morton_encode(Vector3::new(4, 0, 0));
        CpuNode::insert(&root, a, 0, 3, 0xF800);
        CpuNode::insert(&root, b, 0, 3, 0xF800);

        let mut cache = NodeCache::new();
        let mut max_refs = 0;
        let root = canonicalize(root, &mut cache, &mut max_refs);

        let nodes = linearize(&root);
        // sentinel + root + 1 shared depth-1 node + 1 shared leaf (the two
        // inserts' depth-1 nodes, and in turn their leaves, are structurally
        // identical and canonicalize to one of each).
        assert_eq!(nodes.len(), 4);

        let root_node = nodes.get(1);
        assert_eq!(root_node.children[0], root_node.children[1]);
        assert_ne!(root_node.children[0], 0);
    }

    #[test]
    fn leaf_only_tree_emits_single_node() {
        let root = CpuNode::new();
        root.borrow_mut().child_mask = 0xFF;
        root.borrow_mut().material = 3;
        root.borrow_mut().refs = 1;

        let nodes = linearize(&root);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes.get(1).material, 3);
        assert_eq!(nodes.get(1).children, [0; 8]);
    }
}
