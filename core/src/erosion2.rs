use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Result, TerrainError, check_dimensions};

// Von Neumann neighbourhood, (dx, dy)
const NEIGHBORS: [(isize, isize); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalParams {
    pub iterations: u32, // passes to run (default 50)
    // Height difference, in the map's own units, a slope may hold
    // before material slides (default 0.012)
    pub talus: f32,
    // Share of the excess moved per pass, split over the 4 neighbours;
    // in (0, 1] (default 0.5)
    pub factor: f32,
}

impl Default for ThermalParams {
    fn default() -> Self {
        Self {
            iterations: 50,
            talus: 0.012,
            factor: 0.5,
        }
    }
}

impl ThermalParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.talus.is_finite() && self.talus >= 0.0) {
            return Err(TerrainError::invalid(
                "talus",
                format!("must be finite and non-negative, got {}", self.talus),
            ));
        }
        if !(self.factor > 0.0 && self.factor <= 1.0) {
            return Err(TerrainError::invalid(
                "factor",
                format!("must be in (0, 1], got {}", self.factor),
            ));
        }
        Ok(())
    }
}

pub struct ThermalErosion2D {
    iterations: u32,
    talus: f32,
    rate: f32, // per-neighbour share of the excess slope
}

impl ThermalErosion2D {
    // iterations - how many passes to run
    // More iterations = smoother terrain.
    // talus - slope threshold; steeper drops shed material downhill.
    pub fn new(params: &ThermalParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            iterations: params.iterations,
            talus: params.talus,
            rate: params.factor / NEIGHBORS.len() as f32,
        })
    }

    // Material sliding from a cell at `from` to a neighbour at `to`
    #[inline]
    fn flow(&self, from: f32, to: f32) -> f32 {
        let excess = from - to - self.talus;
        if excess > 0.0 { excess * self.rate } else { 0.0 }
    }

    // In-place erosion of a row-major width×height map.
    //
    // Each pass reads only the state left by the previous pass and writes
    // into a scratch buffer, so the visiting order cannot matter. A cell's
    // new height is its old height plus whatever its neighbours shed into
    // it minus whatever it sheds into them; both sides of an exchange use
    // the same `flow` call, so a pass conserves total height. The map
    // edge is closed: nothing crosses it.
    pub fn apply(&self, map: &mut [f32], width: usize, height: usize) -> Result<()> {
        check_dimensions(map.len(), width, height)?;
        debug!(
            width,
            height,
            iterations = self.iterations,
            talus = self.talus,
            "thermal erosion start"
        );
        if self.iterations == 0 {
            return Ok(());
        }

        let mut next = vec![0.0f32; map.len()];
        for iter in 0..self.iterations {
            let current: &[f32] = &*map;
            next.par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, cell) in row.iter_mut().enumerate() {
                        let h = current[y * width + x];
                        let mut delta = 0.0f32;
                        for &(dx, dy) in &NEIGHBORS {
                            let nx = x as isize + dx;
                            let ny = y as isize + dy;
                            if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                                continue;
                            }
                            let n = current[ny as usize * width + nx as usize];
                            delta += self.flow(n, h) - self.flow(h, n);
                        }
                        *cell = h + delta;
                    }
                });
            map.copy_from_slice(&next);
            trace!(iter, "thermal erosion pass");
        }

        debug!(width, height, "thermal erosion done");
        Ok(())
    }
}

pub fn thermal_erosion(
    heightmap: &mut [f32],
    width: usize,
    height: usize,
    params: &ThermalParams,
) -> Result<()> {
    // Check the buffer before the parameters are even looked at, so a bad
    // call never reaches a cell
    check_dimensions(heightmap.len(), width, height)?;
    ThermalErosion2D::new(params)?.apply(heightmap, width, height)
}
