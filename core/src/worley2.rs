use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TerrainError};
use crate::heightmap::Heightmap;
use crate::{NoiseField, seeded_stream};

// 4096² feature points, two f64 tables of 128 MiB each
pub const MAX_CELLS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorleyMetric {
    #[default]
    Euclid, // squared euclidean distance
    Manhattan,
    Chebyshev,
}

impl WorleyMetric {
    #[inline]
    fn distance(self, dx: f64, dy: f64) -> f64 {
        match self {
            WorleyMetric::Euclid => dx * dx + dy * dy,
            WorleyMetric::Manhattan => dx.abs() + dy.abs(),
            WorleyMetric::Chebyshev => dx.abs().max(dy.abs()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorleyParams {
    pub cells: usize,   // feature-point grid per side (default 32)
    pub metric: WorleyMetric, // default squared euclidean
}

impl Default for WorleyParams {
    fn default() -> Self {
        Self {
            cells: 32,
            metric: WorleyMetric::Euclid,
        }
    }
}

impl WorleyParams {
    pub fn validate(&self) -> Result<()> {
        if self.cells == 0 || self.cells > MAX_CELLS {
            return Err(TerrainError::invalid(
                "cells",
                format!("must be in 1..={MAX_CELLS}, got {}", self.cells),
            ));
        }
        Ok(())
    }
}

// Cellular (Worley) noise: one seeded feature point per grid cell, the value
// at a point is the distance to the nearest feature point in the 3×3 block
// of cells around it. The grid wraps, so the field tiles every `cells` units.
#[derive(Debug, Clone)]
pub struct Worley2D {
    cells: usize,
    metric: WorleyMetric,
    fx: Vec<f64>, // feature offsets inside each cell, row-major
    fy: Vec<f64>,
}

impl Worley2D {
    pub fn new(seed: u64, params: &WorleyParams) -> Result<Self> {
        params.validate()?;
        let n = params.cells * params.cells;
        let mut rng = seeded_stream(seed);
        // All x offsets first, then all y offsets
        let fx: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
        let fy: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
        Ok(Self {
            cells: params.cells,
            metric: params.metric,
            fx,
            fy,
        })
    }

    #[inline]
    fn wrap(&self, c: i64) -> usize {
        c.rem_euclid(self.cells as i64) as usize
    }

    // Fill a width×height map over one period of the grid, rescaled into
    // [0, 1] and inverted so feature points become peaks
    pub fn generate(&self, width: usize, height: usize) -> Result<Heightmap> {
        if width == 0 {
            return Err(TerrainError::invalid("width", "must be greater than 0"));
        }
        if height == 0 {
            return Err(TerrainError::invalid("height", "must be greater than 0"));
        }

        let mut map = Heightmap::new(width, height);
        map.as_mut_slice()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                let v = y as f64 / height as f64 * self.cells as f64;
                for (x, cell) in row.iter_mut().enumerate() {
                    let u = x as f64 / width as f64 * self.cells as f64;
                    *cell = self.sample(u, v) as f32;
                }
            });

        map.normalize();
        for v in map.as_mut_slice() {
            *v = 1.0 - *v;
        }
        Ok(map)
    }
}

impl NoiseField for Worley2D {
    // Raw nearest-feature distance in cell units; (x, y) are grid coordinates
    fn sample(&self, x: f64, y: f64) -> f64 {
        let cx = x.floor() as i64;
        let cy = y.floor() as i64;
        let mut best = f64::INFINITY;
        for oy in -1..=1 {
            for ox in -1..=1 {
                let gx = cx + ox;
                let gy = cy + oy;
                let idx = self.wrap(gy) * self.cells + self.wrap(gx);
                // Unwrapped cell origin keeps the neighbour's point next to us
                let px = gx as f64 + self.fx[idx];
                let py = gy as f64 + self.fy[idx];
                best = best.min(self.metric.distance(x - px, y - py));
            }
        }
        best
    }
}

pub fn worley2d(width: usize, height: usize, seed: u64, params: &WorleyParams) -> Result<Heightmap> {
    debug!(width, height, seed, cells = params.cells, metric = ?params.metric, "worley2d start");
    let map = Worley2D::new(seed, params)?.generate(width, height)?;
    debug!(width, height, seed, "worley2d done");
    Ok(map)
}
