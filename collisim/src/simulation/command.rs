//! Input-facing control layer
//!
//! Front ends (viewer keys, scripted runs, tests) never reach into the
//! engines directly: they send [`Command`]s to a [`Runner`], which owns the
//! active simulation behind the [`Simulator`] trait together with the rng,
//! the pause flag and the time scale.

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::error::SimResult;
use super::gravity::GravitySim;
use super::states::BodyView;
use super::step::{BroadPhase, CollisionSim};

/// Discrete user action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SpawnBodies { count: usize },
    AdjustTimeScale { delta: i32 },
    TogglePause,
    ToggleGrid,
}

/// Time multipliers selectable with `AdjustTimeScale`
pub const TIME_SPEEDS: [f64; 7] = [0.125, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0];

/// Index into [`TIME_SPEEDS`]; starts at 1x
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeScale {
    shift: usize,
}

impl Default for TimeScale {
    fn default() -> Self {
        Self { shift: 3 }
    }
}

impl TimeScale {
    pub fn speed(&self) -> f64 {
        TIME_SPEEDS[self.shift]
    }

    /// Move along the ladder, clamped at both ends
    pub fn adjust(&mut self, delta: i32) {
        let max = (TIME_SPEEDS.len() - 1) as i64;
        self.shift = (self.shift as i64 + delta as i64).clamp(0, max) as usize;
    }

    /// How to cover one frame of length `dt`: `(substeps, substep_dt)`.
    /// Speeds above 1x run `speed / 2` steps of `2 dt`; slower speeds run
    /// a single shortened step.
    pub fn substeps(&self, dt: f64) -> (usize, f64) {
        let speed = self.speed();
        if speed > 1.0 {
            ((speed / 2.0) as usize, dt * 2.0)
        } else {
            (1, dt * speed)
        }
    }
}

/// Seam between the control layer and a concrete engine
pub trait Simulator {
    fn step(&mut self, dt: f64);

    /// Returns how many bodies were added
    fn spawn_random(&mut self, count: usize, rng: &mut StdRng) -> SimResult<usize>;

    fn len(&self) -> usize;

    fn time(&self) -> f64;

    fn snapshot(&self) -> Vec<BodyView>;

    /// Returns whether the grid broad phase is now in use
    fn toggle_grid(&mut self) -> bool {
        false
    }

    fn broad_phase(&self) -> Option<BroadPhase> {
        None
    }
}

impl Simulator for CollisionSim {
    fn step(&mut self, dt: f64) {
        CollisionSim::step(self, dt);
    }

    fn spawn_random(&mut self, count: usize, rng: &mut StdRng) -> SimResult<usize> {
        CollisionSim::spawn_random(self, count, rng).map(|h| h.len())
    }

    fn len(&self) -> usize {
        CollisionSim::len(self)
    }

    fn time(&self) -> f64 {
        CollisionSim::time(self)
    }

    fn snapshot(&self) -> Vec<BodyView> {
        self.all_bodies().collect()
    }

    fn toggle_grid(&mut self) -> bool {
        CollisionSim::toggle_grid(self)
    }

    fn broad_phase(&self) -> Option<BroadPhase> {
        Some(CollisionSim::broad_phase(self))
    }
}

impl Simulator for GravitySim {
    fn step(&mut self, dt: f64) {
        GravitySim::step(self, dt);
    }

    fn spawn_random(&mut self, count: usize, rng: &mut StdRng) -> SimResult<usize> {
        GravitySim::spawn_random(self, count, rng).map(|h| h.len())
    }

    fn len(&self) -> usize {
        GravitySim::len(self)
    }

    fn time(&self) -> f64 {
        GravitySim::time(self)
    }

    fn snapshot(&self) -> Vec<BodyView> {
        self.all_bodies().collect()
    }
}

/// Owns the active simulation and applies commands to it
pub struct Runner {
    sim: Box<dyn Simulator + Send + Sync>,
    rng: StdRng,
    time_scale: TimeScale,
    paused: bool,
}

impl Runner {
    pub fn new<S>(sim: S, seed: u64) -> Self
    where
        S: Simulator + Send + Sync + 'static,
    {
        Self {
            sim: Box::new(sim),
            rng: StdRng::seed_from_u64(seed),
            time_scale: TimeScale::default(),
            paused: false,
        }
    }

    pub fn sim(&self) -> &(dyn Simulator + Send + Sync) {
        self.sim.as_ref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn time_scale(&self) -> TimeScale {
        self.time_scale
    }

    pub fn apply(&mut self, command: Command) -> SimResult<()> {
        match command {
            Command::SpawnBodies { count } => {
                let added = self.sim.spawn_random(count, &mut self.rng)?;
                tracing::info!(added, total = self.sim.len(), "spawned bodies");
            }
            Command::AdjustTimeScale { delta } => {
                // the speed is frozen while paused
                if !self.paused {
                    self.time_scale.adjust(delta);
                    tracing::info!(speed = self.time_scale.speed(), "time scale");
                }
            }
            Command::TogglePause => {
                self.paused = !self.paused;
                tracing::info!(paused = self.paused, "pause toggled");
            }
            Command::ToggleGrid => {
                let grid = self.sim.toggle_grid();
                tracing::info!(grid, "broad phase toggled");
            }
        }
        Ok(())
    }

    /// Advance by one frame of wall time `frame_dt`, honoring pause and time scale
    pub fn advance(&mut self, frame_dt: f64) {
        if self.paused {
            return;
        }
        let (n, dt) = self.time_scale.substeps(frame_dt);
        for _ in 0..n {
            self.sim.step(dt);
        }
    }
}
