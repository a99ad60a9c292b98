use collisim::simulation::states::{Arena, Bodies, Body, NVec2};
use collisim::simulation::engine::Engine;
use collisim::simulation::params::Parameters;
use collisim::simulation::step::{BroadPhase, CollisionSim};
use collisim::simulation::collision::{collide, PositionCorrection};
use collisim::simulation::grid::UniformGrid;
use collisim::simulation::command::{Command, Simulator};
use collisim::{count_pairs, Scenario, ScenarioConfig};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Collision sim over a 400x300 arena, lossless unless stated otherwise
pub fn collision_sim(grid: bool, restitution: f64) -> CollisionSim {
    let engine = Engine {
        grid,
        grid_threshold: usize::MAX,
        ..Engine::default()
    };
    let params = Parameters {
        restitution,
        ..Parameters::default()
    };
    CollisionSim::new(Arena::new(400.0, 300.0).unwrap(), &params, &engine).unwrap()
}

/// Random overlapping pair: centers closer than the radii sum, any velocities
pub fn overlapping_pair(rng: &mut StdRng, restitution: f64) -> (Body, Body) {
    let r1 = rng.gen_range(1.0..5.0);
    let r2 = rng.gen_range(1.0..5.0);
    let angle: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
    let dist = rng.gen_range(0.1..(r1 + r2));

    let x1 = NVec2::new(50.0, 50.0);
    let x2 = x1 + dist * NVec2::new(angle.cos(), angle.sin());
    let mut v = || NVec2::new(rng.gen_range(-200.0..200.0), rng.gen_range(-200.0..200.0));
    let (v1, v2) = (v(), v());

    let m1 = rng.gen_range(1.0..20.0) * r1 * r1;
    let m2 = rng.gen_range(1.0..20.0) * r2 * r2;
    (
        Body::new(x1, v1, m1, r1).with_restitution(restitution),
        Body::new(x2, v2, m2, r2).with_restitution(restitution),
    )
}

/// Isolated overlapping pairs straddling cell borders, far from each other and the walls
pub fn spawn_isolated_pairs(sim: &mut CollisionSim, rng: &mut StdRng) {
    for ix in 0..8 {
        for iy in 0..6 {
            // cell size is 10: x0 sits at 6 inside a cell, its partner 8 further lands in the next
            let x0 = NVec2::new(36.0 + 40.0 * ix as f64, 36.0 + 40.0 * iy as f64);
            let offset = match (ix + iy) % 3 {
                0 => NVec2::new(8.0, 0.0),
                1 => NVec2::new(0.0, 8.0),
                _ => NVec2::new(6.0, 6.0),
            };
            let mut v = || NVec2::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
            let (va, vb) = (v(), v());
            sim.spawn_body(x0, va, 5.0, 25.0 * rng.gen_range(1.0..20.0)).unwrap();
            sim.spawn_body(x0 + offset, vb, 5.0, 25.0 * rng.gen_range(1.0..20.0)).unwrap();
        }
    }
}

// ==================================================================================
// Collision resolver tests
// ==================================================================================

#[test]
fn head_on_equal_masses_exchange_velocities() {
    let mut sim = collision_sim(true, 1.0);
    let a = sim.spawn_body(NVec2::new(100.0, 100.0), NVec2::new(10.0, 0.0), 5.0, 1.0).unwrap();
    let b = sim.spawn_body(NVec2::new(109.0, 100.0), NVec2::new(-10.0, 0.0), 5.0, 1.0).unwrap();

    let stats = sim.step(0.0);
    assert_eq!(stats.contacts, 1);

    let (pa, pb) = (sim.bodies().get(a).unwrap(), sim.bodies().get(b).unwrap());
    assert!((pa.v - NVec2::new(-10.0, 0.0)).norm() < 1e-9, "a: {:?}", pa.v);
    assert!((pb.v - NVec2::new(10.0, 0.0)).norm() < 1e-9, "b: {:?}", pb.v);
    assert!(((pb.x - pa.x).norm() - 10.0).abs() < 1e-9);
}

#[test]
fn lossless_collision_conserves_momentum() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..500 {
        let (mut a, mut b) = overlapping_pair(&mut rng, 1.0);
        let before = a.momentum() + b.momentum();
        assert!(collide(&mut a, &mut b, PositionCorrection::EvenSplit));
        let after = a.momentum() + b.momentum();

        let scale = a.m * a.v.norm() + b.m * b.v.norm() + 1.0;
        assert!((after - before).norm() <= 1e-9 * scale, "{before:?} -> {after:?}");
    }
}

#[test]
fn collision_never_adds_kinetic_energy() {
    let mut rng = StdRng::seed_from_u64(5);
    for restitution in [1.0, 0.95, 0.5, 0.0] {
        for _ in 0..200 {
            let (mut a, mut b) = overlapping_pair(&mut rng, restitution);
            let before = a.kinetic_energy() + b.kinetic_energy();
            collide(&mut a, &mut b, PositionCorrection::InverseMass);
            let after = a.kinetic_energy() + b.kinetic_energy();
            assert!(after <= before * (1.0 + 1e-9) + 1e-12, "e = {restitution}: {before} -> {after}");
        }
    }
}

// ==================================================================================
// Simulation step tests
// ==================================================================================

#[test]
fn separated_bodies_keep_their_velocities() {
    for grid in [false, true] {
        let mut sim = collision_sim(grid, 0.95);
        let mut rng = StdRng::seed_from_u64(11);

        let mut expected = Vec::new();
        for ix in 1..12 {
            for iy in 1..9 {
                let x = NVec2::new(30.0 * ix as f64, 30.0 * iy as f64);
                let v = NVec2::new(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0));
                let h = sim.spawn_body(x, v, rng.gen_range(1.0..5.0), 10.0).unwrap();
                expected.push((h, v));
            }
        }

        for _ in 0..5 {
            let stats = sim.step(0.01);
            assert_eq!(stats.contacts, 0);
        }
        for (h, v) in expected {
            assert_eq!(sim.bodies().get(h).unwrap().v, v);
        }
    }
}

#[test]
fn grid_and_all_pairs_resolve_identically() {
    let mut naive = collision_sim(false, 0.95);
    let mut grid = collision_sim(true, 0.95);
    spawn_isolated_pairs(&mut naive, &mut StdRng::seed_from_u64(21));
    spawn_isolated_pairs(&mut grid, &mut StdRng::seed_from_u64(21));

    let s_naive = naive.step(0.001);
    let s_grid = grid.step(0.001);
    assert_eq!(s_naive.broad_phase, BroadPhase::AllPairs);
    assert_eq!(s_grid.broad_phase, BroadPhase::Grid);
    assert_eq!(s_naive.contacts, 48);
    assert_eq!(s_grid.contacts, s_naive.contacts);
    assert!(s_grid.candidate_pairs < s_naive.candidate_pairs);

    for ((ha, a), (hb, b)) in naive.bodies().iter().zip(grid.bodies().iter()) {
        assert_eq!(ha, hb);
        assert!((a.v - b.v).norm() < 1e-9, "{:?} vs {:?}", a.v, b.v);
        assert!((a.x - b.x).norm() < 1e-9);
    }
}

#[test]
fn grid_checks_far_fewer_pairs_for_a_thousand_bodies() {
    let (naive, grid) = count_pairs(1000, 42).unwrap();
    assert_eq!(naive.candidate_pairs, 1000 * 999 / 2);
    assert!(grid.candidate_pairs * 10 < naive.candidate_pairs, "grid checked {}", grid.candidate_pairs);
}

#[test]
fn bodies_stay_inside_the_arena() {
    let mut sim = collision_sim(true, 0.95);
    let mut rng = StdRng::seed_from_u64(8);
    sim.spawn_random(400, &mut rng).unwrap();

    for _ in 0..200 {
        sim.step(1.0 / 60.0);
    }

    let arena = sim.arena();
    for (_, b) in sim.bodies().iter() {
        assert!(arena.contains(&b.x, b.radius), "escaped: {:?} r = {}", b.x, b.radius);
    }
}

#[test]
fn threshold_switches_to_grid() {
    let engine = Engine::default();
    let params = Parameters::default();
    let mut sim = CollisionSim::new(Arena::new(1280.0, 800.0).unwrap(), &params, &engine).unwrap();
    let mut rng = StdRng::seed_from_u64(2);

    sim.spawn_random(801, &mut rng).unwrap();
    assert_eq!(sim.step(0.0).broad_phase, BroadPhase::AllPairs);

    sim.spawn_random(1, &mut rng).unwrap();
    assert_eq!(sim.step(0.0).broad_phase, BroadPhase::Grid);
}

// ==================================================================================
// Uniform grid tests
// ==================================================================================

#[test]
fn rebucket_keeps_cells_matching_positions() {
    let arena = Arena::new(640.0, 480.0).unwrap();
    let mut grid = UniformGrid::new(arena, 10.0).unwrap();
    let mut bodies = Bodies::new();
    let mut rng = StdRng::seed_from_u64(13);

    for _ in 0..300 {
        let x = NVec2::new(rng.gen_range(0.0..640.0), rng.gen_range(0.0..480.0));
        let h = bodies.insert(Body::new(x, NVec2::zeros(), 1.0, 2.0));
        grid.insert(h, &x).unwrap();
    }

    for round in 0..20 {
        for b in bodies.iter_mut() {
            // mostly small hops, sometimes across the arena
            let jump = if round % 5 == 0 { 200.0 } else { 12.0 };
            let dx = NVec2::new(rng.gen_range(-jump..jump), rng.gen_range(-jump..jump));
            b.x = NVec2::new((b.x.x + dx.x).clamp(0.0, 640.0), (b.x.y + dx.y).clamp(0.0, 480.0));
        }
        grid.rebucket(&bodies);
        assert!(grid.is_consistent(&bodies), "round {round}");

        for (h, b) in bodies.iter() {
            let cell = grid.cell_of_handle(h).unwrap();
            assert_eq!(cell.row, (b.x.x / 10.0).floor() as usize);
            assert_eq!(cell.col, (b.x.y / 10.0).floor() as usize);
        }
    }
}

#[test]
fn containment_reflects_only_outward_motion() {
    let mut out = Body::new(NVec2::new(2.0, 50.0), NVec2::new(-7.0, 0.0), 1.0, 5.0);
    out.contain_in_bounds(100.0, 100.0);
    assert_eq!(out.x.x, 2.0 * 5.0 - 2.0);
    assert_eq!(out.v.x, 7.0);

    let mut inward = Body::new(NVec2::new(2.0, 50.0), NVec2::new(3.0, 0.0), 1.0, 5.0);
    inward.contain_in_bounds(100.0, 100.0);
    assert_eq!(inward.x.x, 8.0);
    assert_eq!(inward.v.x, 3.0);
}

// ==================================================================================
// Scenario / command tests
// ==================================================================================

#[test]
fn scenario_from_yaml_spawns_and_runs() {
    let cfg = ScenarioConfig::from_yaml_str(
        r#"
engine:
  variant: "collision"
  grid: true
arena: { width: 320.0, height: 240.0 }
parameters:
  t_end: 0.5
  h0: 0.01
  restitution: 0.9
  seed: 4
spawn: { count: 50 }
bodies:
  - { x: [10.0, 10.0], v: [1.0, 0.0], radius: 3.0, density: 2.0 }
"#,
    )
    .unwrap();

    let mut scenario = Scenario::build_scenario(cfg).unwrap();
    assert_eq!(scenario.parameters.cell_size, 10.0);
    assert_eq!(scenario.runner.sim().len(), 51);

    let summary = scenario.run_headless(None);
    assert_eq!(summary.frames, 50);
    assert_eq!(summary.bodies, 51);
    assert!((summary.time - 0.5).abs() < 1e-9);
}

#[test]
fn invalid_arena_is_a_configuration_error() {
    let cfg = ScenarioConfig::from_yaml_str(
        r#"
engine: { variant: "collision" }
arena: { width: 0.0, height: 240.0 }
parameters: { t_end: 1.0, h0: 0.01, seed: 1 }
"#,
    )
    .unwrap();
    assert!(Scenario::build_scenario(cfg).is_err());
}

#[test]
fn commands_drive_the_runner() {
    let cfg = ScenarioConfig::from_yaml_str(
        r#"
engine: { variant: "gravity" }
arena: { width: 1280.0, height: 800.0 }
parameters: { t_end: 1.0, h0: 0.01, seed: 9 }
"#,
    )
    .unwrap();
    let mut scenario = Scenario::build_scenario(cfg).unwrap();
    let runner = &mut scenario.runner;

    runner.apply(Command::SpawnBodies { count: 10 }).unwrap();
    assert_eq!(runner.sim().len(), 10);

    runner.apply(Command::TogglePause).unwrap();
    runner.advance(0.1);
    assert_eq!(runner.sim().time(), 0.0);

    // time scale is frozen while paused
    runner.apply(Command::AdjustTimeScale { delta: 1 }).unwrap();
    assert_eq!(runner.time_scale().speed(), 1.0);

    runner.apply(Command::TogglePause).unwrap();
    runner.apply(Command::AdjustTimeScale { delta: 1 }).unwrap();
    runner.advance(0.1);
    assert!((runner.sim().time() - 0.2).abs() < 1e-12);

    // gravity has no broad phase to toggle
    runner.apply(Command::ToggleGrid).unwrap();
    assert_eq!(runner.sim().broad_phase(), None);
}

#[test]
fn gravity_merging_conserves_mass() {
    let cfg = ScenarioConfig::from_yaml_str(
        r#"
engine: { variant: "gravity" }
arena: { width: 200.0, height: 200.0 }
parameters: { t_end: 0.1, h0: 0.01, seed: 5 }
bodies:
  - { x: [100.0, 100.0], v: [0.0, 0.0], m: 4000.0 }
  - { x: [103.0, 100.0], v: [5.0, 0.0], m: 2000.0 }
  - { x: [100.0, 104.0], v: [0.0, -5.0], m: 1000.0 }
  - { x: [180.0, 180.0], v: [0.0, 0.0], m: 2000.0 }
"#,
    )
    .unwrap();
    let mut scenario = Scenario::build_scenario(cfg).unwrap();
    scenario.runner.advance(0.01);

    let views = scenario.runner.sim().snapshot();
    assert_eq!(views.len(), 2, "the touching cluster collapses into one body");
    // mass is recoverable from the radius: m = 20 r^3
    let total: f64 = views.iter().map(|v| 20.0 * v.radius.powi(3)).sum();
    assert!((total - 9000.0).abs() < 1e-6 * total);
}
