//! High-level runtime engine settings
//!
//! Selects the simulation variant, the broad-phase mode and its automatic
//! switch threshold, and the positional correction policy used when a
//! `Scenario` is built

use crate::configuration::config::VariantConfig;
use crate::simulation::collision::PositionCorrection;

/// Body count above which the grid broad phase is forced on
pub const DEFAULT_GRID_THRESHOLD: usize = 801;

#[derive(Debug, Clone)]
pub struct Engine {
    pub variant: VariantConfig, // collision or gravity
    pub grid: bool, // manual broad-phase toggle, false = all pairs
    pub grid_threshold: usize, // grid forced on when body count exceeds this
    pub correction: PositionCorrection, // how overlap is split between a pair
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            variant: VariantConfig::Collision,
            grid: false,
            grid_threshold: DEFAULT_GRID_THRESHOLD,
            correction: PositionCorrection::EvenSplit,
        }
    }
}
