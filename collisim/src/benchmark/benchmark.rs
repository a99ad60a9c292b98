use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::simulation::engine::Engine;
use crate::simulation::error::SimResult;
use crate::simulation::params::Parameters;
use crate::simulation::states::Arena;
use crate::simulation::step::{CollisionSim, StepStats};

const ARENA_W: f64 = 1280.0;
const ARENA_H: f64 = 800.0;
const FRAME_DT: f64 = 1.0 / 60.0;

/// Collision sim over the reference 1280x800 arena with `n` random bodies.
/// The threshold is lifted so the requested mode is never overridden.
fn make_sim(n: usize, grid: bool, seed: u64) -> SimResult<CollisionSim> {
    let engine = Engine {
        grid,
        grid_threshold: usize::MAX,
        ..Engine::default()
    };
    let params = Parameters {
        seed,
        ..Parameters::default()
    };

    let mut sim = CollisionSim::new(Arena::new(ARENA_W, ARENA_H)?, &params, &engine)?;
    let mut rng = StdRng::seed_from_u64(seed);
    sim.spawn_random(n, &mut rng)?;
    Ok(sim)
}

/// Candidate pairs examined by one step of (all-pairs, grid) over the same
/// `n` random bodies
pub fn count_pairs(n: usize, seed: u64) -> SimResult<(StepStats, StepStats)> {
    let mut all_pairs = make_sim(n, false, seed)?;
    let mut grid = make_sim(n, true, seed)?;
    Ok((all_pairs.step(FRAME_DT), grid.step(FRAME_DT)))
}

/// Time per step for both broad phases over a range of body counts
/// Paste output directly into a spreadsheet to graph
pub fn bench_broad_phase() -> SimResult<()> {
    println!("N,all_pairs_ms,grid_ms,all_pairs_candidates,grid_candidates,contacts");

    for n in [100, 200, 400, 801, 1000, 1600, 3200] {
        // Large n: fewer steps to keep the all-pairs side bounded
        let steps = if n <= 801 { 20 } else { 5 };

        let mut all_pairs = make_sim(n, false, 42)?;
        let mut grid = make_sim(n, true, 42)?;

        // Warm up
        all_pairs.step(FRAME_DT);
        grid.step(FRAME_DT);

        let t0 = Instant::now();
        let mut naive = StepStats::default();
        for _ in 0..steps {
            naive = all_pairs.step(FRAME_DT);
        }
        let ms_naive = t0.elapsed().as_secs_f64() * 1000.0 / steps as f64;

        let t1 = Instant::now();
        let mut cells = StepStats::default();
        for _ in 0..steps {
            cells = grid.step(FRAME_DT);
        }
        let ms_grid = t1.elapsed().as_secs_f64() * 1000.0 / steps as f64;

        println!(
            "{},{:.6},{:.6},{},{},{}",
            n, ms_naive, ms_grid, naive.candidate_pairs, cells.candidate_pairs, cells.contacts
        );
    }

    Ok(())
}
