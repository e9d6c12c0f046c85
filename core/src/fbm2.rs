use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TerrainError};
use crate::heightmap::Heightmap;
use crate::perlin2::Perlin2D;
use crate::NoiseField;

// Past this the per-octave frequency leaves f64's useful range
pub const MAX_OCTAVES: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FbmParams {
    pub octaves: u32,    // noise layers summed, at least 1 (default 6)
    pub lacunarity: f64, // frequency multiplier between octaves (default 2.0)
    pub gain: f64,       // amplitude multiplier between octaves (default 0.5)
    pub scale: f64,      // base feature size in cells (default 8.0)
}

impl Default for FbmParams {
    fn default() -> Self {
        Self {
            octaves: 6,
            lacunarity: 2.0,
            gain: 0.5,
            scale: 8.0,
        }
    }
}

impl FbmParams {
    pub fn validate(&self) -> Result<()> {
        if self.octaves == 0 || self.octaves > MAX_OCTAVES {
            return Err(TerrainError::invalid(
                "octaves",
                format!("must be in 1..={MAX_OCTAVES}, got {}", self.octaves),
            ));
        }
        if !(self.lacunarity.is_finite() && self.lacunarity > 0.0) {
            return Err(TerrainError::invalid(
                "lacunarity",
                format!("must be finite and positive, got {}", self.lacunarity),
            ));
        }
        if !(self.gain.is_finite() && self.gain > 0.0) {
            return Err(TerrainError::invalid(
                "gain",
                format!("must be finite and positive, got {}", self.gain),
            ));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(TerrainError::invalid(
                "scale",
                format!("must be finite and positive, got {}", self.scale),
            ));
        }
        Ok(())
    }
}

// Fractal Brownian motion over Perlin noise. Each octave owns a table
// shuffled from its own derived seed, so layers are independent fields
// rather than phase-shifted copies of one.
pub struct Fbm2D {
    layers: Vec<(Perlin2D, f64, f64)>, // (noise, frequency, amplitude)
    inv_scale: f64,
    inv_total: f64,
    max_freq: f64, // highest octave frequency, bounds the sample coordinates
}

impl Fbm2D {
    pub fn new(seed: u64, params: &FbmParams) -> Result<Self> {
        params.validate()?;

        let mut layers = Vec::with_capacity(params.octaves as usize);
        let mut freq: f64 = 1.0;
        let mut amplitude: f64 = 1.0;
        let mut total = 0.0;
        let mut max_freq: f64 = 0.0;
        for k in 0..params.octaves {
            // An infinite weight turns `0 * inf` into NaN on lattice points
            if !freq.is_finite() {
                return Err(TerrainError::invalid(
                    "lacunarity",
                    format!("octave {k} frequency overflows with lacunarity {}", params.lacunarity),
                ));
            }
            if !amplitude.is_finite() {
                return Err(TerrainError::invalid(
                    "gain",
                    format!("octave {k} amplitude overflows with gain {}", params.gain),
                ));
            }
            layers.push((Perlin2D::new(seed.wrapping_add(k as u64)), freq, amplitude));
            total += amplitude;
            max_freq = max_freq.max(freq);
            freq *= params.lacunarity;
            amplitude *= params.gain;
        }
        if !total.is_finite() {
            return Err(TerrainError::invalid(
                "gain",
                format!("amplitude sum overflows with gain {}", params.gain),
            ));
        }

        Ok(Self {
            layers,
            inv_scale: 1.0 / params.scale,
            inv_total: 1.0 / total,
            max_freq,
        })
    }

    pub fn octaves(&self) -> usize {
        self.layers.len()
    }

    // Fill a width×height map, one rayon task per row
    pub fn generate(&self, width: usize, height: usize) -> Result<Heightmap> {
        if width == 0 {
            return Err(TerrainError::invalid("width", "must be greater than 0"));
        }
        if height == 0 {
            return Err(TerrainError::invalid("height", "must be greater than 0"));
        }
        let extent = (width.max(height) - 1) as f64;
        if !(extent * self.inv_scale * self.max_freq).is_finite() {
            return Err(TerrainError::invalid(
                "lacunarity",
                "highest octave frequency overflows at this map size and scale",
            ));
        }

        let mut map = Heightmap::new(width, height);
        map.as_mut_slice()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    *cell = self.sample(x as f64, y as f64) as f32;
                }
            });
        Ok(map)
    }
}

impl NoiseField for Fbm2D {
    // Weighted average of the octaves, so the result stays in [-1, 1]
    // whatever the octave count
    fn sample(&self, x: f64, y: f64) -> f64 {
        let nx = x * self.inv_scale;
        let ny = y * self.inv_scale;
        let total: f64 = self
            .layers
            .iter()
            .map(|(noise, freq, amplitude)| amplitude * noise.sample(nx * freq, ny * freq))
            .sum();
        total * self.inv_total
    }
}

pub fn fbm2d(width: usize, height: usize, seed: u64, params: &FbmParams) -> Result<Heightmap> {
    debug!(width, height, seed, octaves = params.octaves, "fbm2d start");
    let map = Fbm2D::new(seed, params)?.generate(width, height)?;
    debug!(width, height, seed, "fbm2d done");
    Ok(map)
}
