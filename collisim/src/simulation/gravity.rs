//! Gravitational attraction with merging ("nebula" variant)
//!
//! Bodies attract each other pairwise with softened Newtonian gravity.
//! When two circles touch, the heavier one absorbs the lighter one:
//!
//! - mass:     `m = m_1 + m_2`
//! - velocity: `v = (m_1 v_1 + m_2 v_2) / m` (momentum conserved)
//! - position: the absorber stays where it is
//! - radius:   `cbrt(m / 20)`
//!
//! A body can touch several others in one pass, so every absorbed body is
//! recorded in a per-frame consumed set; a consumed body never merges
//! again in the same pass and is removed once the pass is over. Survivors
//! then advance with semi-implicit Euler.

use std::collections::HashSet;
use std::f64::consts::TAU;

use rand::Rng;

use super::error::{SimError, SimResult};
use super::params::Parameters;
use super::states::{Arena, Bodies, Body, BodyHandle, BodyView, NVec2, Tint};

/// Mass of every randomly spawned body
pub const SPAWN_MASS: f64 = 2000.0;

/// Radius of a body of mass `m`
pub fn radius_for_mass(m: f64) -> f64 {
    (m / 20.0).cbrt()
}

#[allow(non_snake_case)]
pub struct GravitySim {
    bodies: Bodies,
    view: Arena, // spawn area for random bodies
    G: f64,
    eps2: f64,
    t: f64,
    consumed: HashSet<BodyHandle>,
    merges: usize, // merges during the last step
}

impl GravitySim {
    pub fn new(view: Arena, parameters: &Parameters) -> SimResult<Self> {
        if !(parameters.G.is_finite() && parameters.eps2 >= 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "invalid gravity constants G = {}, eps2 = {}",
                parameters.G, parameters.eps2
            )));
        }

        Ok(Self {
            bodies: Bodies::new(),
            view,
            G: parameters.G,
            eps2: parameters.eps2,
            t: 0.0,
            consumed: HashSet::new(),
            merges: 0,
        })
    }

    pub fn bodies(&self) -> &Bodies {
        &self.bodies
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

    pub fn last_merges(&self) -> usize {
        self.merges
    }

    pub fn spawn_body(&mut self, x: NVec2, v: NVec2, mass: f64) -> SimResult<BodyHandle> {
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(SimError::InvalidBody(format!("mass must be positive, got {mass}")));
        }
        if !x.iter().chain(v.iter()).all(|c| c.is_finite()) {
            return Err(SimError::InvalidBody("position and velocity must be finite".into()));
        }

        let mut body = Body::new(x, v, mass, radius_for_mass(mass));
        body.tint = Tint::from_mass(mass);
        Ok(self.bodies.insert(body))
    }

    /// Spawn `count` bodies of [`SPAWN_MASS`] inside the view, drifting slowly
    pub fn spawn_random<R: Rng>(&mut self, count: usize, rng: &mut R) -> SimResult<Vec<BodyHandle>> {
        let margin = 5.0_f64.min(0.5 * self.view.width.min(self.view.height));
        let mut handles = Vec::with_capacity(count);

        for _ in 0..count {
            let x = NVec2::new(
                rng.gen_range(margin..=self.view.width - margin),
                rng.gen_range(margin..=self.view.height - margin),
            );
            let speed = rng.gen_range(10.0..=20.0);
            let angle = rng.gen_range(0.0..TAU);
            let v = NVec2::new(speed * angle.cos(), speed * angle.sin());
            handles.push(self.spawn_body(x, v, SPAWN_MASS)?);
        }

        tracing::debug!(count, total = self.bodies.len(), "spawned random bodies");
        Ok(handles)
    }

    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<Body> {
        self.bodies.remove(handle)
    }

    /// Advance by `dt`: attract and merge, drop absorbed bodies, then integrate
    pub fn step(&mut self, dt: f64) {
        debug_assert!(dt >= 0.0, "negative time step {dt}");
        let handles = self.bodies.handles();
        let accel = self.attract(&handles);

        for handle in self.consumed.drain() {
            self.bodies.remove(handle);
        }

        for (handle, a) in handles.iter().zip(accel.iter()) {
            if let Some(b) = self.bodies.get_mut(*handle) {
                b.v += *a * dt;
                b.x += b.v * dt;
            }
        }

        self.t += dt;
        tracing::trace!(t = self.t, bodies = self.bodies.len(), merges = self.merges, "gravity step");
    }

    /// Pairwise pass: accumulate accelerations for separated pairs, merge touching ones.
    /// `out[k]` is the acceleration of `handles[k]`.
    fn attract(&mut self, handles: &[BodyHandle]) -> Vec<NVec2> {
        let n = handles.len();
        let mut out = vec![NVec2::zeros(); n];
        self.consumed.clear();
        self.merges = 0;

        for i in 0..n {
            for j in (i + 1)..n {
                let (hi, hj) = (handles[i], handles[j]);
                let Some((bi, bj)) = self.bodies.pair_mut(hi, hj) else {
                    continue;
                };

                // r points from i to j
                let r = bj.x - bi.x;
                let d2 = r.norm_squared();
                let d = d2.sqrt();

                if d < bi.radius + bj.radius {
                    if self.consumed.contains(&hi) || self.consumed.contains(&hj) {
                        continue;
                    }

                    let m = bi.m + bj.m;
                    let v = (bi.m * bi.v + bj.m * bj.v) / m;
                    if bi.m >= bj.m {
                        absorb(bi, m, v);
                        self.consumed.insert(hj);
                    } else {
                        absorb(bj, m, v);
                        self.consumed.insert(hi);
                    }
                    self.merges += 1;
                } else {
                    // a_i += G m_j r / |r_soft|^3, a_j -= G m_i r / |r_soft|^3
                    let inv_r = (d2 + self.eps2).sqrt().recip();
                    let coef = self.G * inv_r * inv_r * inv_r;
                    out[i] += coef * bj.m * r;
                    out[j] -= coef * bi.m * r;
                }
            }
        }

        out
    }

    pub fn all_bodies(&self) -> impl Iterator<Item = BodyView> + '_ {
        self.bodies.iter().map(|(h, b)| BodyView::of(h, b))
    }
}

fn absorb(body: &mut Body, mass: f64, v: NVec2) {
    body.m = mass;
    body.radius = radius_for_mass(mass);
    body.tint = Tint::from_mass(mass);
    body.v = v;
}
