//! Height-field generation (layered noise) and bilinear sampling (spec
//! §4.4.1). The spec treats height sampling as a pure `height(x,z)->float`
//! function supplied externally; this module is the concrete, dependency-free
//! generator that produces one, ported from
//! `examples/original_source/WorldBuilder/src/HeightMapGenerator.cpp`.

use noise::{NoiseFn, Simplex};

/// Generates a square grid of layered-noise height samples in `[0, 1]`.
/// Deterministic for a given `seed` (the original C++ reseeded from
/// `std::random_device` on every construction; this crate takes an
/// explicit seed instead — see DESIGN.md Open Questions item 4).
pub struct HeightMapGenerator {
    grid_size: u32,
    octaves: u32,
    persistence: f32,
    scale: f32,
    noise: Simplex,
    offset_x: f32,
    offset_z: f32,
}

impl HeightMapGenerator {
    pub fn new(grid_size: u32, octaves: u32, persistence: f32, scale: f32, seed: u32) -> Self {
        let noise = Simplex::new(seed);
        // Derive a pseudo-random offset from the seed instead of sampling a
        // global RNG, keeping generation a pure function of its inputs.
        let offset_x = (seed.wrapping_mul(2654435761) % 2000) as f32 - 1000.0;
        let offset_z = (seed.wrapping_mul(2246822519) % 2000) as f32 - 1000.0;
        HeightMapGenerator {
            grid_size,
            octaves,
            persistence,
            scale,
            noise,
            offset_x,
            offset_z,
        }
    }

    fn noise_01(&self, x: f32, z: f32) -> f32 {
        (self.noise.get([x as f64, z as f64]) as f32 + 1.0) / 2.0
    }

    fn layered_noise(&self, x: f32, z: f32) -> f32 {
        let mut total = 0.0;
        let mut frequency = self.scale;
        let mut amplitude = 1.0;
        let mut max_value = 0.0;

        for _ in 0..self.octaves {
            total += self.noise_01(x * frequency, z * frequency) * amplitude;
            max_value += amplitude;
            amplitude *= self.persistence;
            frequency *= 2.0;
        }

        if max_value > 0.0 {
            total / max_value
        } else {
            0.0
        }
    }

    /// Generates the full `grid_size x grid_size` height map, row-major by z.
    pub fn generate(&self) -> Vec<f32> {
        let mut height_map = vec![0.0f32; (self.grid_size * self.grid_size) as usize];
        for x in 0..self.grid_size {
            for z in 0..self.grid_size {
                let nx = x as f32 / self.grid_size as f32 + self.offset_x;
                let nz = z as f32 / self.grid_size as f32 + self.offset_z;
                height_map[(z * self.grid_size + x) as usize] = self.layered_noise(nx, nz);
            }
        }
        height_map
    }
}

/// A bilinear-sampled 2-D scalar field over a square grid (spec §4.4.1).
pub struct HeightSampler<'a> {
    heights: &'a [f32],
    grid_size: u32,
}

impl<'a> HeightSampler<'a> {
    pub fn new(heights: &'a [f32], grid_size: u32) -> Self {
        assert_eq!(heights.len(), (grid_size * grid_size) as usize);
        HeightSampler { heights, grid_size }
    }

    /// Bilinearly samples at continuous grid coordinates `(x, z)`, clamping
    /// the result to `[0, 1]`.
    pub fn sample(&self, x: f32, z: f32) -> f32 {
        let x1 = x.floor() as u32;
        let z1 = z.floor() as u32;
        let mut x2 = x1 + 1;
        let mut z2 = z1 + 1;
        if x2 >= self.grid_size {
            x2 = x1;
        }
        if z2 >= self.grid_size {
            z2 = z1;
        }

        let q11 = self.heights[(z1 * self.grid_size + x1) as usize];
        let q12 = self.heights[(z2 * self.grid_size + x1) as usize];
        let q21 = self.heights[(z1 * self.grid_size + x2) as usize];
        let q22 = self.heights[(z2 * self.grid_size + x2) as usize];

        let x_diff = x - x1 as f32;
        let z_diff = z - z1 as f32;

        let interpolated = q11 * (1.0 - x_diff) * (1.0 - z_diff)
            + q21 * x_diff * (1.0 - z_diff)
            + q12 * (1.0 - x_diff) * z_diff
            + q22 * x_diff * z_diff;

        interpolated.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_values_in_unit_range() {
        let gen = HeightMapGenerator::new(16, 4, 0.5, 0.5, 3);
        let map = gen.generate();
        assert_eq!(map.len(), 16 * 16);
        for h in map {
            assert!((0.0..=1.0).contains(&h));
        }
    }

    #[test]
    fn generate_is_deterministic() {
        let a = HeightMapGenerator::new(16, 4, 0.5, 0.5, 9).generate();
        let b = HeightMapGenerator::new(16, 4, 0.5, 0.5, 9).generate();
        assert_eq!(a, b);
    }

    #[test]
    fn sampler_returns_exact_grid_points() {
        let heights = vec![0.0, 1.0, 1.0, 0.0];
        let sampler = HeightSampler::new(&heights, 2);
        assert!((sampler.sample(0.0, 0.0) - 0.0).abs() < 1e-6);
        assert!((sampler.sample(1.0, 0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sampler_interpolates_midpoint() {
        let heights = vec![0.0, 1.0, 0.0, 1.0];
        let sampler = HeightSampler::new(&heights, 2);
        let mid = sampler.sample(0.5, 0.0);
        assert!((mid - 0.5).abs() < 1e-6);
    }
}
