//! Exact Akenine-Möller triangle/AABB separating-axis test (spec §4.2).

use nalgebra::{Vector2, Vector3};

use super::aabb::Aabb;

/// A mesh triangle with per-vertex UVs and a material index (spec §4.4.2).
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Vector3<f32>,
    pub v1: Vector3<f32>,
    pub v2: Vector3<f32>,
    pub uv0: Vector2<f32>,
    pub uv1: Vector2<f32>,
    pub uv2: Vector2<f32>,
    pub material_index: u32,
}

impl Triangle {
    pub fn aabb(&self) -> Aabb {
        let mut b = Aabb::empty();
        b.extend(self.v0);
        b.extend(self.v1);
        b.extend(self.v2);
        b
    }

    /// Barycentric coordinates of `p` with respect to this triangle's plane,
    /// used to interpolate UVs (spec §4.4.2).
    pub fn barycentric(&self, p: Vector3<f32>) -> Vector3<f32> {
        let v0 = self.v1 - self.v0;
        let v1 = self.v2 - self.v0;
        let v2 = p - self.v0;
        let d00 = v0.dot(&v0);
        let d01 = v0.dot(&v1);
        let d11 = v1.dot(&v1);
        let d20 = v2.dot(&v0);
        let d21 = v2.dot(&v1);
        let denom = d00 * d11 - d01 * d01;
        if denom.abs() < f32::EPSILON {
            return Vector3::new(1.0, 0.0, 0.0);
        }
        let v = (d11 * d20 - d01 * d21) / denom;
        let w = (d00 * d21 - d01 * d20) / denom;
        let u = 1.0 - v - w;
        Vector3::new(u, v, w)
    }

    pub fn interpolate_uv(&self, barycentric: Vector3<f32>) -> Vector2<f32> {
        self.uv0 * barycentric.x + self.uv1 * barycentric.y + self.uv2 * barycentric.z
    }
}

fn plane_box_overlap(normal: Vector3<f32>, vert: Vector3<f32>, maxbox: Vector3<f32>) -> bool {
    let mut vmin = Vector3::zeros();
    let mut vmax = Vector3::zeros();
    for q in 0..3 {
        let v = vert[q];
        if normal[q] > 0.0 {
            vmin[q] = -maxbox[q] - v;
            vmax[q] = maxbox[q] - v;
        } else {
            vmin[q] = maxbox[q] - v;
            vmax[q] = -maxbox[q] - v;
        }
    }
    if normal.dot(&vmin) > 0.0 {
        return false;
    }
    normal.dot(&vmax) >= 0.0
}

fn axis_test_x(
    a: f32,
    b: f32,
    fa: f32,
    fb: f32,
    v0: Vector3<f32>,
    v2: Vector3<f32>,
    boxhalf: Vector3<f32>,
) -> bool {
    let p0 = a * v0.y - b * v0.z;
    let p2 = a * v2.y - b * v2.z;
    let (min, max) = (p0.min(p2), p0.max(p2));
    let rad = fa * boxhalf.y + fb * boxhalf.z;
    !(min > rad || max < -rad)
}

fn axis_test_y(
    a: f32,
    b: f32,
    fa: f32,
    fb: f32,
    v0: Vector3<f32>,
    v2: Vector3<f32>,
    boxhalf: Vector3<f32>,
) -> bool {
    let p0 = -a * v0.x + b * v0.z;
    let p2 = -a * v2.x + b * v2.z;
    let (min, max) = (p0.min(p2), p0.max(p2));
    let rad = fa * boxhalf.x + fb * boxhalf.z;
    !(min > rad || max < -rad)
}

fn axis_test_z(
    a: f32,
    b: f32,
    fa: f32,
    fb: f32,
    v0: Vector3<f32>,
    v1: Vector3<f32>,
    boxhalf: Vector3<f32>,
) -> bool {
    let p0 = a * v0.x - b * v0.y;
    let p1 = a * v1.x - b * v1.y;
    let (min, max) = (p0.min(p1), p0.max(p1));
    let rad = fa * boxhalf.x + fb * boxhalf.y;
    !(min > rad || max < -rad)
}

/// Exact SAT overlap between a triangle and an axis-aligned box (spec
/// §4.2). A triangle that merely grazes a face counts as intersecting.
pub fn triangle_intersects_aabb(tri: &Triangle, box_center: Vector3<f32>, box_half: Vector3<f32>) -> bool {
    let tv0 = tri.v0 - box_center;
    let tv1 = tri.v1 - box_center;
    let tv2 = tri.v2 - box_center;

    let tri_min = tv0.zip_zip_map(&tv1, &tv2, |a, b, c| a.min(b).min(c));
    let tri_max = tv0.zip_zip_map(&tv1, &tv2, |a, b, c| a.max(b).max(c));
    if tri_min.x > box_half.x || tri_max.x < -box_half.x {
        return false;
    }
    if tri_min.y > box_half.y || tri_max.y < -box_half.y {
        return false;
    }
    if tri_min.z > box_half.z || tri_max.z < -box_half.z {
        return false;
    }

    let e0 = tv1 - tv0;
    let e1 = tv2 - tv1;
    let e2 = tv0 - tv2;

    let (fex, fey, fez) = (e0.x.abs(), e0.y.abs(), e0.z.abs());
    if !axis_test_x(e0.z, e0.y, fez, fey, tv0, tv2, box_half) {
        return false;
    }
    if !axis_test_y(e0.z, e0.x, fez, fex, tv0, tv2, box_half) {
        return false;
    }
    if !axis_test_z(e0.y, e0.x, fey, fex, tv1, tv2, box_half) {
        return false;
    }

    let (fex, fey, fez) = (e1.x.abs(), e1.y.abs(), e1.z.abs());
    if !axis_test_x(e1.z, e1.y, fez, fey, tv0, tv2, box_half) {
        return false;
    }
    if !axis_test_y(e1.z, e1.x, fez, fex, tv0, tv2, box_half) {
        return false;
    }
    if !axis_test_z(e1.y, e1.x, fey, fex, tv0, tv1, box_half) {
        return false;
    }

    let (fex, fey, fez) = (e2.x.abs(), e2.y.abs(), e2.z.abs());
    if !axis_test_x(e2.z, e2.y, fez, fey, tv0, tv1, box_half) {
        return false;
    }
    if !axis_test_y(e2.z, e2.x, fez, fex, tv0, tv1, box_half) {
        return false;
    }
    if !axis_test_z(e2.y, e2.x, fey, fex, tv1, tv2, box_half) {
        return false;
    }

    let normal = e0.cross(&e1);
    plane_box_overlap(normal, tv0, box_half)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(v0: Vector3<f32>, v1: Vector3<f32>, v2: Vector3<f32>) -> Triangle {
        Triangle {
            v0,
            v1,
            v2,
            uv0: Vector2::zeros(),
            uv1: Vector2::zeros(),
            uv2: Vector2::zeros(),
            material_index: 0,
        }
    }

    #[test]
    fn triangle_through_box_center_intersects() {
        let t = tri(
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        assert!(triangle_intersects_aabb(
            &t,
            Vector3::zeros(),
            Vector3::repeat(0.5)
        ));
    }

    #[test]
    fn distant_triangle_does_not_intersect() {
        let t = tri(
            Vector3::new(10.0, 10.0, 10.0),
            Vector3::new(11.0, 10.0, 10.0),
            Vector3::new(10.0, 11.0, 10.0),
        );
        assert!(!triangle_intersects_aabb(
            &t,
            Vector3::zeros(),
            Vector3::repeat(0.5)
        ));
    }

    #[test]
    fn grazing_triangle_counts_as_intersecting() {
        // Triangle lying exactly on the box's +x face.
        let t = tri(
            Vector3::new(0.5, -1.0, -1.0),
            Vector3::new(0.5, 1.0, -1.0),
            Vector3::new(0.5, 0.0, 1.0),
        );
        assert!(triangle_intersects_aabb(
            &t,
            Vector3::zeros(),
            Vector3::repeat(0.5)
        ));
    }

    #[test]
    fn barycentric_recovers_vertex() {
        let t = tri(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        let b = t.barycentric(Vector3::new(0.0, 0.0, 0.0));
        assert!((b.x - 1.0).abs() < 1e-5);
        assert!(b.y.abs() < 1e-5);
        assert!(b.z.abs() < 1e-5);
    }
}
