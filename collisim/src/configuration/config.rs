//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – variant (collision / gravity) and broad-phase options
//! - [`ParametersConfig`] – numerical parameters and physical constants
//! - [`ArenaConfig`]      – size of the simulated rectangle
//! - [`SpawnConfig`]      – optional batch of randomly generated bodies
//! - [`BodyConfig`]       – optional explicit initial state for individual bodies
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//! An example collision scenario matching these types:
//!
//! ```yaml
//! engine:
//!   variant: "collision"    # or "gravity"
//!   grid: false             # manual broad-phase toggle
//!   grid_threshold: 801     # grid forced on above this many bodies
//!   correction: "even"      # or "inverse_mass"
//!
//! arena:
//!   width: 1280.0
//!   height: 800.0
//!
//! parameters:
//!   t_end: 10.0             # total simulated time for headless runs
//!   h0: 0.0166667           # frame step size
//!   restitution: 0.95       # elasticity applied after each collision
//!   max_radius: 5.0         # largest random radius
//!   cell_size: 10.0         # defaults to 2 * max_radius
//!   seed: 42                # deterministic seed
//!
//! spawn:
//!   count: 1000
//!
//! bodies:
//!   - x: [ 100.0, 100.0 ]
//!     v: [  50.0,   0.0 ]
//!     radius: 5.0
//!     density: 4.0          # or `m: 100.0`
//! ```
//!
//! The scenario builder maps this configuration into the runtime types in
//! `simulation`.

use std::io::Read;

use serde::Deserialize;

use crate::simulation::collision::PositionCorrection;
use crate::simulation::engine::DEFAULT_GRID_THRESHOLD;

/// Which simulation the scenario runs
/// variant: "collision"` or `variant: "gravity"
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantConfig {
    #[serde(rename = "collision")] // Elastic collisions inside a walled arena
    Collision,

    #[serde(rename = "gravity")] // Mutual attraction, touching bodies merge, no walls
    Gravity,
}

fn default_grid_threshold() -> usize {
    DEFAULT_GRID_THRESHOLD
}

/// High-level engine configuration
#[derive(Deserialize, Debug)]
pub struct EngineConfig {
    pub variant: VariantConfig, // Simulation variant
    #[serde(default)]
    pub grid: bool, // `true` - uniform grid broad phase, `false` - all pairs below the threshold
    #[serde(default = "default_grid_threshold")]
    pub grid_threshold: usize, // Body count above which the grid is forced on
    #[serde(default)]
    pub correction: PositionCorrection, // Overlap split between a colliding pair
}

/// Global numerical and physical parameters for a scenario
#[allow(non_snake_case)]
#[derive(Deserialize, Debug, Clone)]
pub struct ParametersConfig {
    pub t_end: f64, // time end
    pub h0: f64, // frame step size
    pub restitution: Option<f64>, // elasticity, default 0.95
    pub max_radius: Option<f64>, // largest random radius, default 5
    pub cell_size: Option<f64>, // grid cell side, default 2 * max_radius
    pub seed: u64, // deterministic seed to make runs reproducible
    pub G: Option<f64>, // gravitational constant, default 1
    pub eps2: Option<f64>, // softening, default 0
}

/// Arena rectangle, origin at the top-left corner
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct ArenaConfig {
    pub width: f64,
    pub height: f64,
}

/// Randomly generated bodies added at startup
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct SpawnConfig {
    pub count: usize,
}

/// Configuration for a single body's initial state
#[derive(Deserialize, Debug)]
pub struct BodyConfig {
    pub x: Vec<f64>, // Initial position
    pub v: Vec<f64>, // Initial velocity
    pub m: Option<f64>, // Mass; required for gravity bodies
    pub radius: Option<f64>, // Radius; required for collision bodies
    pub density: Option<f64>, // Alternative to `m` for collision bodies: m = density * radius^2
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug)]
pub struct ScenarioConfig {
    pub engine: EngineConfig, // Variant and broad-phase options
    pub arena: ArenaConfig, // Simulated rectangle
    pub parameters: ParametersConfig, // Global numerical and physical parameters
    pub spawn: Option<SpawnConfig>, // Random bodies generated at startup
    #[serde(default)]
    pub bodies: Vec<BodyConfig>, // Explicit bodies
}

impl ScenarioConfig {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_reader(reader)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }
}
