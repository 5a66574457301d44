//! RGB565 material encoding (spec §6) and the altitude-band material LUT
//! used by the height-map build path (spec §4.4.1).

use nalgebra::Vector3;
use noise::{NoiseFn, Simplex};

/// Packs `(r, g, b)` into RGB565: `(r<<11)|(g<<5)|b`, `r,b in [0,31]`,
/// `g in [0,63]`. `0x0000` is a legal color; there is no "no material"
/// sentinel.
pub fn rgb565(color: Vector3<f32>) -> u16 {
    let color = color.map(|c| c.clamp(0.0, 1.0));
    let r = (color.x * 31.0).round() as u16;
    let g = (color.y * 63.0).round() as u16;
    let b = (color.z * 31.0).round() as u16;
    (r << 11) | (g << 5) | b
}

const SNOW_LINE: f32 = 0.75;
const ROCK_LINE: f32 = 0.45;
const GRASS_LINE: f32 = 0.25;

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: Vector3<f32>, b: Vector3<f32>, t: f32) -> Vector3<f32> {
    a + (b - a) * t
}

/// Smoothstep-banded altitude -> terrain color (forest -> meadow -> rock ->
/// snow), perturbed by two octaves of simplex noise, then packed to RGB565.
/// `y` is normalized height in `[0, 1]`.
pub fn mountain_color(noise: &Simplex, y: f32) -> u16 {
    let noise1 = noise.get([y as f64 * 10.0, 0.5]) as f32 * 0.1;
    let noise2 = noise.get([y as f64 * 20.0, 0.7]) as f32 * 0.05;

    let color = if y > SNOW_LINE {
        let blend = smoothstep(SNOW_LINE, 0.9, y);
        let shaded = Vector3::new(0.8, 0.85, 0.95);
        let bright = Vector3::new(1.0, 1.0, 1.0);
        lerp(shaded, bright, blend) + Vector3::repeat(noise1)
    } else if y > ROCK_LINE {
        let blend = (y - ROCK_LINE) / (SNOW_LINE - ROCK_LINE);
        let lower = Vector3::new(0.5, 0.4, 0.35);
        let upper = Vector3::new(0.7, 0.7, 0.75);
        lerp(lower, upper, blend) + Vector3::repeat(noise2)
    } else if y > GRASS_LINE {
        let blend = (y - GRASS_LINE) / (ROCK_LINE - GRASS_LINE);
        let meadow = Vector3::new(0.3, 0.5, 0.2);
        let rocky = Vector3::new(0.45, 0.38, 0.32);
        lerp(meadow, rocky, blend) + Vector3::repeat(noise1 * 2.0)
    } else {
        let blend = y / GRASS_LINE;
        let dark = Vector3::new(0.1, 0.25, 0.1);
        let light = Vector3::new(0.2, 0.35, 0.15);
        lerp(dark, light, blend) + Vector3::repeat(noise2 * 1.5)
    };

    rgb565(color)
}

/// Precomputed altitude -> RGB565 lookup table, indexed by integer voxel
/// height `y in [0, tree_size)`.
pub fn build_material_lut(tree_size: u32, seed: u32) -> Vec<u16> {
    let noise = Simplex::new(seed);
    (0..tree_size)
        .map(|y| {
            let normalized = y as f32 / (tree_size - 1).max(1) as f32;
            mountain_color(&noise, normalized)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb565_packs_and_clamps() {
        assert_eq!(rgb565(Vector3::new(0.0, 0.0, 0.0)), 0x0000);
        assert_eq!(rgb565(Vector3::new(1.0, 1.0, 1.0)), 0xFFFF);
        assert_eq!(rgb565(Vector3::new(2.0, 2.0, 2.0)), 0xFFFF);
        assert_eq!(rgb565(Vector3::new(-1.0, -1.0, -1.0)), 0x0000);
    }

    #[test]
    fn material_lut_has_one_entry_per_height() {
        let lut = build_material_lut(64, 7);
        assert_eq!(lut.len(), 64);
    }

    #[test]
    fn material_lut_is_deterministic_for_seed() {
        let a = build_material_lut(32, 42);
        let b = build_material_lut(32, 42);
        assert_eq!(a, b);
    }
}
