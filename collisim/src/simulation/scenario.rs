//! Build fully-initialized simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a runtime bundle
//! (`Scenario`) containing:
//! - engine settings (`Engine`)
//! - numerical parameters (`Parameters`)
//! - the arena
//! - a `Runner` driving the selected simulation, already populated with
//!   the configured explicit and random bodies
//!
//! With the `viewer` feature the scenario is inserted into Bevy as a
//! `Resource` and consumed by the visualization systems

#[cfg(feature = "viewer")]
use bevy::prelude::Resource;

use crate::configuration::config::{BodyConfig, ScenarioConfig, VariantConfig};
use crate::simulation::command::{Command, Runner};
use crate::simulation::engine::Engine;
use crate::simulation::error::{SimError, SimResult};
use crate::simulation::gravity::GravitySim;
use crate::simulation::params::Parameters;
use crate::simulation::states::{Arena, NVec2};
use crate::simulation::step::CollisionSim;

/// Runtime bundle built from a [`ScenarioConfig`]
#[cfg_attr(feature = "viewer", derive(Resource))]
pub struct Scenario {
    pub engine: Engine,
    pub parameters: Parameters,
    pub arena: Arena,
    pub runner: Runner,
}

/// Summary of a headless run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub frames: usize,
    pub time: f64,
    pub bodies: usize,
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> SimResult<Self> {
        let arena = Arena::new(cfg.arena.width, cfg.arena.height)?;

        // Parameters (runtime) from ParametersConfig
        let p_cfg = cfg.parameters;
        if !(p_cfg.h0 > 0.0 && p_cfg.t_end >= 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "need h0 > 0 and t_end >= 0, got h0 = {}, t_end = {}",
                p_cfg.h0, p_cfg.t_end
            )));
        }
        let defaults = Parameters::default();
        let max_radius = p_cfg.max_radius.unwrap_or(defaults.max_radius);
        let parameters = Parameters {
            t_end: p_cfg.t_end,
            h0: p_cfg.h0,
            restitution: p_cfg.restitution.unwrap_or(defaults.restitution),
            cell_size: p_cfg.cell_size.unwrap_or(2.0 * max_radius),
            max_radius,
            seed: p_cfg.seed,
            G: p_cfg.G.unwrap_or(defaults.G),
            eps2: p_cfg.eps2.unwrap_or(defaults.eps2),
        };

        // Engine (runtime) from EngineConfig
        let e_cfg = cfg.engine;
        let engine = Engine {
            variant: e_cfg.variant,
            grid: e_cfg.grid,
            grid_threshold: e_cfg.grid_threshold,
            correction: e_cfg.correction,
        };

        let mut runner = match engine.variant {
            VariantConfig::Collision => {
                let mut sim = CollisionSim::new(arena, &parameters, &engine)?;
                for bc in &cfg.bodies {
                    let (x, v) = body_vectors(bc)?;
                    let radius = bc
                        .radius
                        .ok_or_else(|| SimError::InvalidConfig("collision bodies need a radius".into()))?;
                    let mass = match (bc.m, bc.density) {
                        (Some(m), _) => m,
                        (None, Some(density)) => density * radius * radius,
                        (None, None) => {
                            return Err(SimError::InvalidConfig("collision bodies need `m` or `density`".into()))
                        }
                    };
                    sim.spawn_body(x, v, radius, mass)?;
                }
                Runner::new(sim, parameters.seed)
            }
            VariantConfig::Gravity => {
                let mut sim = GravitySim::new(arena, &parameters)?;
                for bc in &cfg.bodies {
                    let (x, v) = body_vectors(bc)?;
                    let mass = bc.m.ok_or_else(|| SimError::InvalidConfig("gravity bodies need `m`".into()))?;
                    sim.spawn_body(x, v, mass)?;
                }
                Runner::new(sim, parameters.seed)
            }
        };

        if let Some(spawn) = cfg.spawn {
            runner.apply(Command::SpawnBodies { count: spawn.count })?;
        }

        tracing::info!(
            variant = ?engine.variant,
            bodies = runner.sim().len(),
            width = arena.width,
            height = arena.height,
            "scenario built"
        );

        Ok(Self {
            engine,
            parameters,
            arena,
            runner,
        })
    }

    /// Step `frames` fixed frames of `h0` (default: `t_end / h0`) without a window
    pub fn run_headless(&mut self, frames: Option<usize>) -> RunSummary {
        let frames = frames.unwrap_or((self.parameters.t_end / self.parameters.h0).round() as usize);
        let report_every = (frames / 10).max(1);

        for frame in 1..=frames {
            self.runner.advance(self.parameters.h0);
            if frame % report_every == 0 {
                let sim = self.runner.sim();
                tracing::info!(
                    frame,
                    t = sim.time(),
                    bodies = sim.len(),
                    broad_phase = ?sim.broad_phase(),
                    "progress"
                );
            }
        }

        let sim = self.runner.sim();
        RunSummary {
            frames,
            time: sim.time(),
            bodies: sim.len(),
        }
    }
}

fn body_vectors(bc: &BodyConfig) -> SimResult<(NVec2, NVec2)> {
    match (bc.x.as_slice(), bc.v.as_slice()) {
        ([x, y], [vx, vy]) => Ok((NVec2::new(*x, *y), NVec2::new(*vx, *vy))),
        _ => Err(SimError::InvalidConfig(format!(
            "body vectors must have 2 components, got x = {:?}, v = {:?}",
            bc.x, bc.v
        ))),
    }
}
