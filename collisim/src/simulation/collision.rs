//! Narrow phase: exact overlap test and elastic response for one pair
//!
//! The response is the standard two-body impulse along the line of
//! centers, computed from the pre-collision state of both bodies:
//!
//! ```text
//! v_i' = v_i - 2 m_j / (m_i + m_j) * ((v_i - v_j) . (x_i - x_j)) / |x_i - x_j|^2 * (x_i - x_j)
//! ```
//!
//! Both velocities are then scaled by the pair restitution, and the pair
//! is pushed apart by the penetration depth.

use serde::Deserialize;

use super::states::Body;

/// How the penetration depth is split between the two bodies
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionCorrection {
    /// Each body moves by half the overlap, regardless of mass
    #[default]
    #[serde(rename = "even")]
    EvenSplit,

    /// Each body moves by a share proportional to its inverse mass
    #[serde(rename = "inverse_mass")]
    InverseMass,
}

/// Overlap depth `r_a + r_b - |x_a - x_b|` when the circles intersect
pub fn penetration(a: &Body, b: &Body) -> Option<f64> {
    let overlap = a.radius + b.radius - (a.x - b.x).norm();
    (overlap > 0.0).then_some(overlap)
}

/// Geometric mean, so two equal elasticities combine to themselves
pub fn combine_restitution(ea: f64, eb: f64) -> f64 {
    (ea * eb).sqrt()
}

/// Resolve an overlapping pair in place.
///
/// `overlap` is the depth returned by [`penetration`]. Coincident centers
/// have no collision normal; the pair is left untouched and separates
/// on a later frame once the positions differ.
pub fn resolve(a: &mut Body, b: &mut Body, overlap: f64, restitution: f64, correction: PositionCorrection) {
    let rel_pos = a.x - b.x; // from b to a
    let dist2 = rel_pos.norm_squared();
    if dist2 == 0.0 || !dist2.is_finite() {
        tracing::trace!(x = a.x.x, y = a.x.y, "skipping contact with coincident centers");
        return;
    }

    let rel_vel = a.v - b.v;
    let total_m = a.m + b.m;

    // same scalar for both sides: (v_a - v_b).(x_a - x_b) == (v_b - v_a).(x_b - x_a)
    let k = rel_vel.dot(&rel_pos) / dist2;

    let va = a.v - (2.0 * b.m / total_m) * k * rel_pos;
    let vb = b.v + (2.0 * a.m / total_m) * k * rel_pos;

    a.v = va * restitution;
    b.v = vb * restitution;

    // unit separation vector scaled to the penetration depth
    let push = rel_pos * (overlap / dist2.sqrt());
    let (share_a, share_b) = match correction {
        PositionCorrection::EvenSplit => (0.5, 0.5),
        PositionCorrection::InverseMass => (b.m / total_m, a.m / total_m),
    };
    a.x += push * share_a;
    b.x -= push * share_b;
}

/// Test-and-resolve convenience used by both broad-phase strategies.
/// Returns whether the pair was in contact.
pub fn collide(a: &mut Body, b: &mut Body, correction: PositionCorrection) -> bool {
    match penetration(a, b) {
        Some(overlap) => {
            let e = combine_restitution(a.restitution, b.restitution);
            resolve(a, b, overlap, e, correction);
            true
        }
        None => false,
    }
}
