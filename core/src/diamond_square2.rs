use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Result, TerrainError};
use crate::heightmap::Heightmap;
use crate::seeded_stream;

// 8193×8193 cells, ~256 MiB of f32
pub const MAX_N_POWER: u32 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiamondSquareParams {
    pub roughness: f64, // exponent of the displacement decay (default 0.8)
}

impl Default for DiamondSquareParams {
    fn default() -> Self {
        Self { roughness: 0.8 }
    }
}

impl DiamondSquareParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.roughness.is_finite() && self.roughness >= 0.0) {
            return Err(TerrainError::invalid(
                "roughness",
                format!("must be finite and non-negative, got {}", self.roughness),
            ));
        }
        Ok(())
    }
}

// 2D fractal terrain generator using the Diamond–Square algorithm
//
// The random stream is consumed in one fixed order:
// corners (top-left, top-right, bottom-left, bottom-right), then for each
// step size from largest to smallest the block centres row by row, then the
// edge midpoints row by row.
pub struct DiamondSquare2D {
    n_power: u32,
    size: usize, // 2^n + 1
    seed: u64,
    roughness: f64,
}

impl DiamondSquare2D {
    pub fn new(n_power: u32, seed: u64, params: &DiamondSquareParams) -> Result<Self> {
        if n_power > MAX_N_POWER {
            return Err(TerrainError::SizeLimitExceeded {
                n_power,
                max: MAX_N_POWER,
            });
        }
        params.validate()?;

        Ok(Self {
            n_power,
            size: (1usize << n_power) + 1,
            seed,
            roughness: params.roughness,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    // Uniform in [-1, 1)
    #[inline]
    fn draw(rng: &mut ChaCha8Rng) -> f32 {
        rng.gen_range(-1.0f32..1.0)
    }

    // Displacement amplitude for a given step: (step / full)^roughness
    fn amplitude(&self, step: usize) -> f32 {
        let full = (self.size - 1) as f64;
        (step as f64 / full).powf(self.roughness) as f32
    }

    pub fn generate(&self) -> Heightmap {
        let n = self.size;
        let mut map = Heightmap::new(n, n);
        let mut rng = seeded_stream(self.seed);

        // Initialize corners
        map.set(0, 0, Self::draw(&mut rng));
        map.set(n - 1, 0, Self::draw(&mut rng));
        map.set(0, n - 1, Self::draw(&mut rng));
        map.set(n - 1, n - 1, Self::draw(&mut rng));

        // Step is the current distance between two known points
        let mut step = n - 1;
        while step > 1 {
            let half = step / 2;
            let offset = self.amplitude(step);
            trace!(step, offset, "diamond-square level");

            // Square step: centre of every step×step block
            for y in (half..n).step_by(step) {
                for x in (half..n).step_by(step) {
                    let avg = (map.get(x - half, y - half)
                        + map.get(x + half, y - half)
                        + map.get(x - half, y + half)
                        + map.get(x + half, y + half))
                        * 0.25;
                    map.set(x, y, avg + Self::draw(&mut rng) * offset);
                }
            }

            // Diamond step: edge midpoints, 3 neighbours on the border
            for y in (0..n).step_by(half) {
                let start = (y + half) % step;
                for x in (start..n).step_by(step) {
                    let mut sum = 0.0;
                    let mut cnt = 0;
                    if x >= half {
                        sum += map.get(x - half, y);
                        cnt += 1;
                    }
                    if x + half < n {
                        sum += map.get(x + half, y);
                        cnt += 1;
                    }
                    if y >= half {
                        sum += map.get(x, y - half);
                        cnt += 1;
                    }
                    if y + half < n {
                        sum += map.get(x, y + half);
                        cnt += 1;
                    }
                    let avg = sum / cnt as f32;
                    map.set(x, y, avg + Self::draw(&mut rng) * offset);
                }
            }

            step = half;
        }

        map
    }
}

pub fn diamond_square(n_power: u32, seed: u64, params: &DiamondSquareParams) -> Result<Heightmap> {
    let generator = DiamondSquare2D::new(n_power, seed, params)?;
    debug!(n_power, size = generator.size, seed, "diamond_square start");
    let map = generator.generate();
    debug!(n_power = generator.n_power, "diamond_square done");
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::{DiamondSquare2D, DiamondSquareParams, MAX_N_POWER, diamond_square};
    use crate::error::TerrainError;

    fn corners(n_power: u32, seed: u64) -> [f32; 4] {
        let m = diamond_square(n_power, seed, &DiamondSquareParams::default()).unwrap();
        let last = m.width() - 1;
        [m.get(0, 0), m.get(last, 0), m.get(0, last), m.get(last, last)]
    }

    #[test]
    fn diamond_square_dimensions() {
        for k in 0..=7 {
            let m = diamond_square(k, 0, &DiamondSquareParams::default()).unwrap();
            let expected = (1usize << k) + 1;
            assert_eq!(m.width(), expected);
            assert_eq!(m.height(), expected);
        }
    }

    #[test]
    fn diamond_square_determinism() {
        let params = DiamondSquareParams { roughness: 0.6 };
        let a = diamond_square(6, 42, &params).unwrap();
        let b = diamond_square(6, 42, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn diamond_square_corners_follow_seed() {
        let first = corners(2, 42);
        assert_eq!(first, corners(2, 42));
        assert_ne!(first, corners(2, 43));
    }

    #[test]
    fn diamond_square_fills_every_cell() {
        // Every non-corner cell is written once: with roughness 0 each offset
        // is a fresh draw in [-1, 1), so no cell stays at the initial zero
        // unless a draw happens to be exactly zero.
        let m = diamond_square(4, 9, &DiamondSquareParams { roughness: 0.0 }).unwrap();
        let zeros = m.as_slice().iter().filter(|&&v| v == 0.0).count();
        assert!(zeros <= 1, "{} cells never written", zeros);
    }

    #[test]
    fn diamond_square_value_range() {
        // Corners lie in [-1, 1); every offset is bounded by its amplitude ≤ 1
        // and shrinks level by level, so the map stays well inside ±n_power+1.
        let m = diamond_square(5, 7, &DiamondSquareParams::default()).unwrap();
        for &v in m.as_slice() {
            assert!(v.abs() <= 6.0, "value {} out of expected range", v);
        }
    }

    #[test]
    fn diamond_square_rejects_huge_grids() {
        assert_eq!(
            diamond_square(MAX_N_POWER + 1, 1, &DiamondSquareParams::default()),
            Err(TerrainError::SizeLimitExceeded {
                n_power: MAX_N_POWER + 1,
                max: MAX_N_POWER,
            })
        );
    }

    #[test]
    fn diamond_square_generator_size_matches_map() {
        let ds = DiamondSquare2D::new(3, 5, &DiamondSquareParams::default()).unwrap();
        assert_eq!(ds.size(), 9);
        let m = ds.generate();
        assert_eq!((m.width(), m.height()), (ds.size(), ds.size()));
    }

    #[test]
    fn diamond_square_accepts_roughness_above_one() {
        // Exponents above 1 only damp fine detail faster
        let smooth = diamond_square(5, 3, &DiamondSquareParams { roughness: 2.5 }).unwrap();
        let rough = diamond_square(5, 3, &DiamondSquareParams { roughness: 0.2 }).unwrap();
        assert!(smooth.as_slice().iter().all(|v| v.is_finite()));
        assert!(smooth.max_neighbor_diff() < rough.max_neighbor_diff());
    }

    #[test]
    fn diamond_square_rejects_non_finite_roughness() {
        for roughness in [f64::NAN, f64::INFINITY] {
            assert!(matches!(
                diamond_square(3, 1, &DiamondSquareParams { roughness }),
                Err(TerrainError::InvalidParameter { name: "roughness", .. })
            ));
        }
    }

    #[test]
    fn diamond_square_rejects_negative_roughness() {
        let params = DiamondSquareParams { roughness: -0.5 };
        assert!(matches!(
            diamond_square(3, 1, &params),
            Err(TerrainError::InvalidParameter { name: "roughness", .. })
        ));
    }
}
