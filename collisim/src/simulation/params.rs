//! Numerical and physical parameters for the simulation
//!
//! `Parameters` holds runtime settings:
//! - frame step size and end time for headless runs,
//! - restitution applied to collision responses,
//! - grid cell size and the largest radius random spawns may use,
//! - gravitational constant and softening (`G`, `eps2`) for the merge variant,
//! - random seed

#[allow(non_snake_case)]
#[derive(Debug, Clone)]
pub struct Parameters {
    pub t_end: f64, // time end (headless runs)
    pub h0: f64, // frame step size
    pub restitution: f64, // elasticity applied after every collision
    pub cell_size: f64, // uniform grid cell side
    pub max_radius: f64, // largest radius of randomly spawned bodies
    pub seed: u64, // deterministic seed
    pub G: f64, // gravitational constant
    pub eps2: f64, // softening
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            t_end: 10.0,
            h0: 1.0 / 60.0,
            restitution: 0.95,
            cell_size: 10.0,
            max_radius: 5.0,
            seed: 42,
            G: 1.0,
            eps2: 0.0,
        }
    }
}
