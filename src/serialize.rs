//! Binary DAG file layout (spec §6): `max_depth: u64`, `max_refs: u32`,
//! `node_count: u64`, then `node_count` fixed node records, no padding,
//! explicit little-endian integers. Grounded on the accumulating-buffer
//! writer / `read_exact`-based reader shape of `AssetByteWriter` /
//! `AssetByteReader` in `examples/pengiie-rogue/src/engine/asset/util.rs`,
//! but writing each field explicitly rather than relying on `bytemuck` +
//! native struct layout, since `Node` is not padding-free under
//! `#[repr(C)]` (spec §6's "no padding assumptions").

use std::collections::HashMap;
use std::io::{self, Read, Write};

use crate::error::LoadError;
use crate::node::{Node, NodeArray};
use crate::validate;

/// Renumbers the subgraph reachable from `root_index` to consecutive disk
/// indices starting at 0, root first, in DFS order — the inverse of the
/// `+1`-shift `load` applies to keep index 0 reserved as the in-memory
/// sentinel (spec §6, §9 Open Questions item 3).
fn compact_for_disk(nodes: &NodeArray, root_index: u32) -> Vec<Node> {
    let mut disk_index_of: HashMap<u32, u32> = HashMap::new();
    let mut out = Vec::new();
    let mut stack = vec![root_index];
    disk_index_of.insert(root_index, 0);
    out.push(*nodes.get(root_index));

    // A child index of 0 is always the sentinel (never a real node, per the
    // in-memory "0 = absent" convention), whether `child_mask`'s bit is an
    // interior occupancy flag or a leaf-depth voxel bitmap; either way
    // there is nothing to follow.
    let mut cursor = 0;
    while cursor < stack.len() {
        let index = stack[cursor];
        cursor += 1;
        let node = *nodes.get(index);
        for &child in node.children.iter() {
            if child == 0 {
                continue;
            }
            if let std::collections::hash_map::Entry::Vacant(entry) = disk_index_of.entry(child) {
                entry.insert(out.len() as u32);
                out.push(*nodes.get(child));
                stack.push(child);
            }
        }
    }

    for node in &mut out {
        for child in node.children.iter_mut() {
            if let Some(&mapped) = disk_index_of.get(child) {
                *child = mapped;
            }
        }
    }
    out
}

/// Writes the reachable subgraph rooted at `root_index` to `writer` in the
/// spec §6 layout.
pub fn save<W: Write>(
    writer: &mut W,
    nodes: &NodeArray,
    root_index: u32,
    max_depth: u64,
    max_refs: u32,
) -> io::Result<()> {
    let compacted = compact_for_disk(nodes, root_index);

    writer.write_all(&max_depth.to_le_bytes())?;
    writer.write_all(&max_refs.to_le_bytes())?;
    writer.write_all(&(compacted.len() as u64).to_le_bytes())?;

    for node in &compacted {
        writer.write_all(&[node.child_mask])?;
        writer.write_all(&node.refs.to_le_bytes())?;
        writer.write_all(&node.material.to_le_bytes())?;
        for child in node.children {
            writer.write_all(&child.to_le_bytes())?;
        }
    }
    Ok(())
}

fn read_u8<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// A short read while reading one of the `node_count` node records is a
/// truncated file (spec §7 `CorruptReference`), not a generic I/O failure.
fn load_record_error(err: io::Error) -> LoadError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        LoadError::Truncated
    } else {
        LoadError::Io(err)
    }
}

/// Reads a file written by [`save`]. Index 0 on disk is a real node (the
/// root); the loaded `NodeArray` reserves index 0 as the sentinel and
/// shifts every index by one so the rest of the crate's "0 = absent"
/// convention holds uniformly, returning `(nodes, root_index, max_depth,
/// max_refs)`. Rejects the file (spec §7 `CorruptReference`) if any child
/// index is out of range or disagrees with `child_mask`.
pub fn load<R: Read>(reader: &mut R) -> Result<(NodeArray, u32, u64, u32), LoadError> {
    let max_depth = read_u64(reader).map_err(LoadError::Io)?;
    let max_refs = read_u32(reader).map_err(LoadError::Io)?;
    let node_count = read_u64(reader).map_err(LoadError::Io)?;

    let record = |reader: &mut R| -> Result<Node, LoadError> {
        let child_mask = read_u8(reader).map_err(load_record_error)?;
        let refs = read_u32(reader).map_err(load_record_error)?;
        let material = read_u16(reader).map_err(load_record_error)?;
        let mut children = [0u32; 8];
        for child in children.iter_mut() {
            *child = read_u32(reader).map_err(load_record_error)?;
        }
        Ok(Node { child_mask, refs, material, children })
    };

    let mut raw = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        raw.push(record(reader)?);
    }

    for (index, node) in raw.iter().enumerate() {
        for (octant, &child) in node.children.iter().enumerate() {
            if child == 0 {
                continue;
            }
            if child as usize >= raw.len() {
                return Err(LoadError::ChildOutOfRange {
                    node: index as u32,
                    octant: octant as u8,
                    child,
                });
            }
        }
    }

    let mut shifted = Vec::with_capacity(raw.len() + 1);
    shifted.push(Node::EMPTY);
    for mut node in raw {
        for child in node.children.iter_mut() {
            if *child != 0 {
                *child += 1;
            }
        }
        shifted.push(node);
    }

    let nodes = NodeArray::from_vec(shifted);
    let root_index = 1u32;
    validate::validate(&nodes, root_index, max_depth)?;
    Ok((nodes, root_index, max_depth, max_refs))
}
