//! Per-frame advance of the elastic collision simulation
//!
//! One `step(dt)`:
//! 1. drift every body by `dt` and contain it in the arena
//! 2. rebucket the grid (grid mode only)
//! 3. enumerate candidate pairs, resolve the ones that overlap
//! 4. contain every body again
//!
//! Both broad-phase modes feed the same narrow phase; they only differ in
//! which pairs they propose.

use std::f64::consts::TAU;

use rand::Rng;

use super::collision::{self, PositionCorrection};
use super::engine::Engine;
use super::error::{SimError, SimResult};
use super::grid::UniformGrid;
use super::params::Parameters;
use super::states::{Arena, Bodies, Body, BodyHandle, BodyView, NVec2, Tint};

/// Candidate-pair selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadPhase {
    /// Every unordered pair, O(n^2)
    #[default]
    AllPairs,
    /// Same and forward-neighbor grid cells
    Grid,
}

/// Work done by the last `step`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepStats {
    pub broad_phase: BroadPhase,
    pub candidate_pairs: usize, // pairs handed to the narrow phase
    pub contacts: usize, // pairs found overlapping
}

pub struct CollisionSim {
    arena: Arena,
    bodies: Bodies,
    grid: UniformGrid,
    restitution: f64,
    max_radius: f64,
    correction: PositionCorrection,
    grid_enabled: bool,
    grid_threshold: usize,
    t: f64,
    last_stats: StepStats,
}

impl CollisionSim {
    pub fn new(arena: Arena, parameters: &Parameters, engine: &Engine) -> SimResult<Self> {
        if !(0.0..=1.0).contains(&parameters.restitution) {
            return Err(SimError::InvalidConfig(format!(
                "restitution must be in [0, 1], got {}",
                parameters.restitution
            )));
        }
        if !(parameters.max_radius > 0.0) || 2.0 * parameters.max_radius > parameters.cell_size {
            return Err(SimError::InvalidConfig(format!(
                "cell size {} must be at least twice the max radius {}",
                parameters.cell_size, parameters.max_radius
            )));
        }

        let grid = UniformGrid::new(arena, parameters.cell_size)?;

        Ok(Self {
            arena,
            bodies: Bodies::new(),
            grid,
            restitution: parameters.restitution,
            max_radius: parameters.max_radius,
            correction: engine.correction,
            grid_enabled: engine.grid,
            grid_threshold: engine.grid_threshold,
            t: 0.0,
            last_stats: StepStats::default(),
        })
    }

    pub fn arena(&self) -> Arena {
        self.arena
    }

    pub fn bodies(&self) -> &Bodies {
        &self.bodies
    }

    pub fn grid(&self) -> &UniformGrid {
        &self.grid
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn last_stats(&self) -> StepStats {
        self.last_stats
    }

    /// Add a body. Its center must lie inside the arena and its diameter
    /// must fit in one grid cell.
    pub fn spawn_body(&mut self, x: NVec2, v: NVec2, radius: f64, mass: f64) -> SimResult<BodyHandle> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(SimError::InvalidBody(format!("radius must be positive, got {radius}")));
        }
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(SimError::InvalidBody(format!("mass must be positive, got {mass}")));
        }
        if 2.0 * radius > self.grid.cell_size() {
            return Err(SimError::InvalidBody(format!(
                "diameter {} exceeds grid cell size {}",
                2.0 * radius,
                self.grid.cell_size()
            )));
        }
        if !v.iter().all(|c| c.is_finite()) {
            return Err(SimError::InvalidBody("velocity must be finite".into()));
        }
        if !(x.x >= 0.0 && x.x <= self.arena.width && x.y >= 0.0 && x.y <= self.arena.height) {
            return Err(self.arena.out_of_bounds(&x));
        }

        let mut body = Body::new(x, v, mass, radius).with_restitution(self.restitution);
        body.tint = Tint::from_density(mass / (radius * radius));

        let handle = self.bodies.insert(body);
        if let Err(e) = self.grid.insert(handle, &x) {
            self.bodies.remove(handle);
            return Err(e);
        }
        Ok(handle)
    }

    /// Spawn `count` bodies with random radius, position, heading and density
    pub fn spawn_random<R: Rng>(&mut self, count: usize, rng: &mut R) -> SimResult<Vec<BodyHandle>> {
        let max_r = self.max_radius.floor();
        let mut handles = Vec::with_capacity(count);

        for _ in 0..count {
            let radius = if max_r >= 2.0 {
                rng.gen_range(2..=max_r as u32) as f64
            } else {
                self.max_radius
            };
            if self.arena.width < 2.0 * radius || self.arena.height < 2.0 * radius {
                return Err(SimError::InvalidConfig(format!(
                    "arena {}x{} cannot hold a body of radius {radius}",
                    self.arena.width, self.arena.height
                )));
            }

            let x = NVec2::new(
                rng.gen_range(radius..=self.arena.width - radius),
                rng.gen_range(radius..=self.arena.height - radius),
            );
            let speed = rng.gen_range(100.0..=200.0);
            let angle = rng.gen_range(0.0..TAU);
            let v = NVec2::new(speed * angle.cos(), speed * angle.sin());
            let density = rng.gen_range(1..=20) as f64;

            handles.push(self.spawn_body(x, v, radius, density * radius * radius)?);
        }

        tracing::debug!(count, total = self.bodies.len(), "spawned random bodies");
        Ok(handles)
    }

    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<Body> {
        self.grid.remove(handle);
        self.bodies.remove(handle)
    }

    /// Manual broad-phase toggle; ignored while the body count forces the grid on
    pub fn set_grid_enabled(&mut self, enabled: bool) {
        self.grid_enabled = enabled;
    }

    /// Flip the manual toggle when it is available. Returns whether the grid is now in use.
    pub fn toggle_grid(&mut self) -> bool {
        if !self.grid_forced() {
            self.grid_enabled = !self.grid_enabled;
        }
        self.broad_phase() == BroadPhase::Grid
    }

    pub fn set_grid_threshold(&mut self, threshold: usize) {
        self.grid_threshold = threshold;
    }

    fn grid_forced(&self) -> bool {
        self.bodies.len() > self.grid_threshold
    }

    /// Mode the next `step` will use
    pub fn broad_phase(&self) -> BroadPhase {
        if self.grid_enabled || self.grid_forced() {
            BroadPhase::Grid
        } else {
            BroadPhase::AllPairs
        }
    }

    /// Advance the simulation by one frame of length `dt >= 0`
    pub fn step(&mut self, dt: f64) -> StepStats {
        debug_assert!(dt >= 0.0, "negative time step {dt}");
        let Arena { width, height } = self.arena;
        let broad_phase = self.broad_phase();

        for b in self.bodies.iter_mut() {
            b.integrate(dt);
            b.contain_in_bounds(width, height);
        }

        let (candidate_pairs, contacts) = match broad_phase {
            BroadPhase::Grid => {
                self.grid.rebucket(&self.bodies);
                resolve_candidates(&mut self.bodies, self.grid.neighbor_pairs(), self.correction)
            }
            BroadPhase::AllPairs => {
                let handles = self.bodies.handles();
                let hs = &handles;
                let pairs = (0..hs.len()).flat_map(move |i| ((i + 1)..hs.len()).map(move |j| (hs[i], hs[j])));
                resolve_candidates(&mut self.bodies, pairs, self.correction)
            }
        };

        for b in self.bodies.iter_mut() {
            b.contain_in_bounds(width, height);
        }

        self.t += dt;
        self.last_stats = StepStats {
            broad_phase,
            candidate_pairs,
            contacts,
        };
        tracing::trace!(t = self.t, bodies = self.bodies.len(), candidate_pairs, contacts, ?broad_phase, "step");
        self.last_stats
    }

    /// Read-only view of every body for rendering
    pub fn all_bodies(&self) -> impl Iterator<Item = BodyView> + '_ {
        self.bodies.iter().map(|(h, b)| BodyView::of(h, b))
    }
}

/// Narrow phase over a stream of candidate pairs. Returns (candidates, contacts).
fn resolve_candidates<I>(bodies: &mut Bodies, pairs: I, correction: PositionCorrection) -> (usize, usize)
where
    I: Iterator<Item = (BodyHandle, BodyHandle)>,
{
    let mut candidates = 0;
    let mut contacts = 0;
    for (a, b) in pairs {
        candidates += 1;
        if let Some((pa, pb)) = bodies.pair_mut(a, b) {
            if collision::collide(pa, pb, correction) {
                contacts += 1;
            }
        }
    }
    (candidates, contacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn sim(grid: bool) -> CollisionSim {
        let engine = Engine {
            grid,
            ..Engine::default()
        };
        let params = Parameters {
            restitution: 1.0,
            ..Parameters::default()
        };
        CollisionSim::new(Arena::new(200.0, 100.0).expect("arena"), &params, &engine).expect("sim")
    }

    #[test]
    fn spawn_validates_body() {
        let mut s = sim(true);
        let zero = NVec2::zeros();
        assert!(matches!(
            s.spawn_body(NVec2::new(-1.0, 5.0), zero, 2.0, 1.0),
            Err(SimError::OutOfBounds { .. })
        ));
        assert!(matches!(s.spawn_body(NVec2::new(5.0, 5.0), zero, 0.0, 1.0), Err(SimError::InvalidBody(_))));
        assert!(matches!(s.spawn_body(NVec2::new(5.0, 5.0), zero, 2.0, -1.0), Err(SimError::InvalidBody(_))));
        assert!(matches!(s.spawn_body(NVec2::new(5.0, 5.0), zero, 6.0, 1.0), Err(SimError::InvalidBody(_))));
        assert!(s.is_empty());
    }

    #[test]
    fn rejects_cell_smaller_than_a_diameter() {
        let params = Parameters {
            cell_size: 8.0,
            max_radius: 5.0,
            ..Parameters::default()
        };
        let arena = Arena::new(100.0, 100.0).expect("arena");
        assert!(CollisionSim::new(arena, &params, &Engine::default()).is_err());
    }

    #[test]
    fn threshold_forces_grid_and_locks_toggle() {
        let mut s = sim(false);
        s.set_grid_threshold(3);
        let mut rng = StdRng::seed_from_u64(1);
        s.spawn_random(3, &mut rng).expect("spawn");
        assert_eq!(s.broad_phase(), BroadPhase::AllPairs);
        assert!(s.toggle_grid());
        assert!(!s.toggle_grid());

        s.spawn_random(1, &mut rng).expect("spawn");
        assert_eq!(s.broad_phase(), BroadPhase::Grid);
        assert!(s.toggle_grid(), "toggle is locked above the threshold");
        assert_eq!(s.step(0.01).broad_phase, BroadPhase::Grid);
    }

    #[test]
    fn removed_body_leaves_grid_and_registry() {
        let mut s = sim(true);
        let h = s.spawn_body(NVec2::new(50.0, 50.0), NVec2::zeros(), 2.0, 1.0).expect("spawn");
        assert!(s.remove_body(h).is_some());
        assert!(s.remove_body(h).is_none());
        assert_eq!(s.grid().stats().total_entries, 0);
        assert_eq!(s.all_bodies().count(), 0);
    }

    #[test]
    fn zero_dt_step_is_valid() {
        let mut s = sim(true);
        let a = s.spawn_body(NVec2::new(50.0, 50.0), NVec2::new(3.0, 0.0), 2.0, 1.0).expect("spawn");
        let stats = s.step(0.0);
        assert_eq!(stats.contacts, 0);
        assert_eq!(s.bodies().get(a).map(|b| b.x), Some(NVec2::new(50.0, 50.0)));
    }
}
