// core holds the noise, fractal and erosion algorithms
pub mod diamond_square2;
pub mod erosion2;
pub mod error;
pub mod fbm2;
pub mod heightmap;
pub mod hydraulic2;
pub mod perlin2;
pub mod pipeline;
pub mod worley2;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub use diamond_square2::{DiamondSquare2D, DiamondSquareParams, diamond_square};
pub use erosion2::{ThermalErosion2D, ThermalParams, thermal_erosion};
pub use error::{Result, TerrainError};
pub use fbm2::{Fbm2D, FbmParams, fbm2d};
pub use heightmap::{HeightMap2D, Heightmap};
pub use hydraulic2::{HydraulicErosion2D, HydraulicParams, hydraulic_erosion};
pub use perlin2::Perlin2D;
pub use pipeline::{Backend, Erosion, TerrainConfig, generate};
pub use worley2::{Worley2D, WorleyMetric, WorleyParams, worley2d};

// Deterministic noise sampled at continuous 2D coordinates.
// Implementations carry their seed; identical (seed, x, y) always gives
// the identical value.
pub trait NoiseField {
    fn sample(&self, x: f64, y: f64) -> f64;
}

// Every seeded operation builds its own stream from here; nothing touches
// a thread-local or global generator.
pub(crate) fn seeded_stream(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}
