pub mod simulation;
pub mod configuration;
#[cfg(feature = "viewer")]
pub mod visualization;
pub mod benchmark;

pub use simulation::states::{Arena, Bodies, Body, BodyHandle, BodyView, NVec2, Tint};
pub use simulation::error::{SimError, SimResult};
pub use simulation::collision::{collide, combine_restitution, penetration, resolve, PositionCorrection};
pub use simulation::grid::{CellCoord, GridStats, NeighborPairs, UniformGrid};
pub use simulation::step::{BroadPhase, CollisionSim, StepStats};
pub use simulation::gravity::GravitySim;
pub use simulation::command::{Command, Runner, Simulator, TimeScale};
pub use simulation::engine::Engine;
pub use simulation::params::Parameters;
pub use simulation::scenario::{RunSummary, Scenario};

pub use configuration::config::{ArenaConfig, BodyConfig, EngineConfig, ParametersConfig, ScenarioConfig, SpawnConfig, VariantConfig};

#[cfg(feature = "viewer")]
pub use visualization::vis2d::run_2d;

pub use benchmark::benchmark::{bench_broad_phase, count_pairs};
