use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diamond_square2::{DiamondSquareParams, diamond_square};
use crate::erosion2::{ThermalParams, thermal_erosion};
use crate::error::Result;
use crate::fbm2::{FbmParams, fbm2d};
use crate::heightmap::Heightmap;
use crate::hydraulic2::{HydraulicParams, hydraulic_erosion};
use crate::worley2::{WorleyParams, worley2d};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum Backend {
    Fbm {
        width: usize,
        height: usize,
        #[serde(default)]
        fbm: FbmParams,
    },
    DiamondSquare {
        n_power: u32,
        #[serde(default)]
        diamond_square: DiamondSquareParams,
    },
    // Already rescaled into [0, 1], peaks at the feature points
    Worley {
        width: usize,
        height: usize,
        #[serde(default)]
        worley: WorleyParams,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Erosion {
    Thermal(ThermalParams),
    Hydraulic(HydraulicParams),
}

// Everything needed to reproduce one terrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainConfig {
    pub seed: u64,
    #[serde(flatten)]
    pub backend: Backend,
    #[serde(default)]
    pub erosion: Option<Erosion>,
    // Min-max rescale into [0, 1] as the last step
    #[serde(default)]
    pub normalize: bool,
}

// Generator, then optional erosion, then optional normalization
pub fn generate(config: &TerrainConfig) -> Result<Heightmap> {
    debug!(seed = config.seed, backend = ?config.backend, "terrain pipeline start");
    let mut map = match &config.backend {
        Backend::Fbm { width, height, fbm } => fbm2d(*width, *height, config.seed, fbm)?,
        Backend::DiamondSquare {
            n_power,
            diamond_square: params,
        } => diamond_square(*n_power, config.seed, params)?,
        Backend::Worley {
            width,
            height,
            worley,
        } => worley2d(*width, *height, config.seed, worley)?,
    };

    let (width, height) = (map.width(), map.height());
    match &config.erosion {
        Some(Erosion::Thermal(params)) => {
            thermal_erosion(map.as_mut_slice(), width, height, params)?
        }
        Some(Erosion::Hydraulic(params)) => {
            hydraulic_erosion(map.as_mut_slice(), width, height, config.seed, params)?
        }
        None => {}
    }

    if config.normalize {
        map.normalize();
    }
    debug!(width, height, "terrain pipeline done");
    Ok(map)
}
