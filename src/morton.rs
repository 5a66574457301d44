//! Morton (Z-order) coding of 3-D integer coordinates into a 63-bit index,
//! plus the octant-traversal reordering the CPU/GPU tree walks use.

use nalgebra::Vector3;

fn split(x: u32) -> u64 {
    let mut x = x as u64 & 0x1f_ffff;
    x = (x | (x << 32)) & 0x001f_0000_0000_ffff;
    x = (x | (x << 16)) & 0x001f_0000_ff00_00ff;
    x = (x | (x << 8)) & 0x100f_00f0_0f00_f00f;
    x = (x | (x << 4)) & 0x10c3_0c30_c30c_30c3;
    x = (x | (x << 2)) & 0x1249_2492_4924_9249;
    x
}

fn compact(x: u64) -> u32 {
    let mut x = x & 0x1249_2492_4924_9249;
    x = (x | (x >> 2)) & 0x10c3_0c30_c30c_30c3;
    x = (x | (x >> 4)) & 0x100f_00f0_0f00_f00f;
    x = (x | (x >> 8)) & 0x001f_0000_ff00_00ff;
    x = (x | (x >> 16)) & 0x001f_0000_0000_ffff;
    x = (x | (x >> 32)) & 0x1f_ffff;
    x as u32
}

/// Interleaves `(x, y, z)` 21-bit integers into a 63-bit Morton code with
/// bit layout `... z2 y2 x2 z1 y1 x1 z0 y0 x0`. Inputs wider than 21 bits
/// are undefined, per spec.
pub fn morton_encode(position: Vector3<u32>) -> u64 {
    split(position.x) | (split(position.y) << 1) | (split(position.z) << 2)
}

/// Inverse of [`morton_encode`].
pub fn morton_decode(morton: u64) -> Vector3<u32> {
    Vector3::new(compact(morton), compact(morton >> 1), compact(morton >> 2))
}

/// Returns the octant index `o in [0, 8)` a voxel at `morton` falls into at
/// depth `d` within a tree of max depth `max_depth`: bit 0 = x, bit 1 = y,
/// bit 2 = z.
pub fn morton_octant_at_depth(morton: u64, depth: u32, max_depth: u32) -> u8 {
    ((morton >> (3 * (max_depth - depth - 1))) & 0b111) as u8
}

/// Reverses the order of the bottom `height` 3-bit octant groups of
/// `morton`, so a top-down descent can read the path front-to-back with
/// `(reversed >> (3*i)) & 0b111` for `i` increasing from the root.
pub fn morton_traversal(mut morton: u64, height: u32) -> u64 {
    let mut reverse = 0u64;
    for _ in 0..height {
        reverse = (reverse << 3) | (morton & 7);
        morton >>= 3;
    }
    reverse
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let p = Vector3::new(123u32, 456, 789);
        let m = morton_encode(p);
        assert_eq!(morton_decode(m), p);
    }

    #[test]
    fn encode_decode_zero() {
        let p = Vector3::new(0u32, 0, 0);
        assert_eq!(morton_decode(morton_encode(p)), p);
    }

    #[test]
    fn octant_matches_low_bits() {
        // depth D-1 of a max_depth=3 tree reads the lowest 3 bits.
        let p = Vector3::new(1u32, 0, 1); // bits: x=1 y=0 z=1 -> octant 0b101 = 5
        let m = morton_encode(p);
        assert_eq!(morton_octant_at_depth(m, 2, 3), 0b101);
    }

    #[test]
    fn test_traversal() {
        let a = 0x2E; // 101110
        let b = 0x35; // 110101
        assert_eq!(morton_traversal(a, 2), b);
    }
}
