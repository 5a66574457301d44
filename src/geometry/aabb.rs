//! Float-space AABBs (mesh/BVH world) and integer grid boxes (region edits,
//! spec §4.5.3).

use nalgebra::Vector3;

/// A float axis-aligned bounding box, used by the triangle BVH and the
/// mesh-voxelization path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new_two_point(a: Vector3<f32>, b: Vector3<f32>) -> Self {
        Aabb {
            min: a.zip_map(&b, |x, y| x.min(y)),
            max: a.zip_map(&b, |x, y| x.max(y)),
        }
    }

    pub fn empty() -> Self {
        Aabb {
            min: Vector3::repeat(f32::MAX),
            max: Vector3::repeat(f32::MIN),
        }
    }

    pub fn extend(&mut self, point: Vector3<f32>) {
        self.min = self.min.zip_map(&point, |a, b| a.min(b));
        self.max = self.max.zip_map(&point, |a, b| a.max(b));
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.zip_map(&other.min, |a, b| a.min(b)),
            max: self.max.zip_map(&other.max, |a, b| a.max(b)),
        }
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.max + self.min) * 0.5
    }

    pub fn half_extents(&self) -> Vector3<f32> {
        (self.max - self.min) * 0.5
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y
            || self.max.z < other.min.z
            || self.min.z > other.max.z)
    }
}

/// An inclusive integer grid box `[min, max]` in voxel coordinates, used by
/// `modify_region` (spec §4.5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBox {
    pub min: Vector3<u32>,
    pub max: Vector3<u32>,
}

impl GridBox {
    pub fn new(min: Vector3<u32>, max: Vector3<u32>) -> Self {
        GridBox { min, max }
    }

    /// The full-volume box of a tree with `resolution = 2^max_depth`.
    pub fn root(resolution: u32) -> Self {
        GridBox {
            min: Vector3::new(0, 0, 0),
            max: Vector3::repeat(resolution - 1),
        }
    }

    pub fn intersects(&self, other: &GridBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// True if `self` entirely contains `content`.
    pub fn contains(&self, content: &GridBox) -> bool {
        self.min.x <= content.min.x
            && self.min.y <= content.min.y
            && self.min.z <= content.min.z
            && self.max.x >= content.max.x
            && self.max.y >= content.max.y
            && self.max.z >= content.max.z
    }

    /// The sub-box for octant `o` of this box, splitting each axis at its
    /// midpoint (bit 0 = x, bit 1 = y, bit 2 = z), mirroring the original
    /// `getChildBox`.
    pub fn child_box(&self, octant: u8) -> GridBox {
        let parent_size = self.max - self.min + Vector3::repeat(1);
        let child_size = parent_size / 2;
        let parent_mid = self.min + child_size;

        let min = Vector3::new(
            if octant & 1 != 0 { parent_mid.x } else { self.min.x },
            if octant & 2 != 0 { parent_mid.y } else { self.min.y },
            if octant & 4 != 0 { parent_mid.z } else { self.min.z },
        );
        let max = Vector3::new(
            if octant & 1 != 0 { self.max.x } else { parent_mid.x - 1 },
            if octant & 2 != 0 { self.max.y } else { parent_mid.y - 1 },
            if octant & 4 != 0 { self.max.z } else { parent_mid.z - 1 },
        );

        GridBox { min, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_box_splits_root_into_octants() {
        let root = GridBox::root(8);
        let c0 = root.child_box(0);
        assert_eq!(c0.min, Vector3::new(0, 0, 0));
        assert_eq!(c0.max, Vector3::new(3, 3, 3));

        let c7 = root.child_box(7);
        assert_eq!(c7.min, Vector3::new(4, 4, 4));
        assert_eq!(c7.max, Vector3::new(7, 7, 7));
    }

    #[test]
    fn contains_and_intersects() {
        let root = GridBox::root(8);
        let inner = GridBox::new(Vector3::new(1, 1, 1), Vector3::new(2, 2, 2));
        assert!(root.contains(&inner));
        assert!(root.intersects(&inner));

        let disjoint = GridBox::new(Vector3::new(100, 100, 100), Vector3::new(101, 101, 101));
        assert!(!root.intersects(&disjoint));
        assert!(!root.contains(&disjoint));
    }
}
