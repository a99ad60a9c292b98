//! Core state types for the simulation.
//!
//! - `Body`: a circle with position `x`, velocity `v`, mass and radius
//! - `Bodies`: generational slot registry that owns every live body
//! - `BodyHandle`: stable, non-owning reference into `Bodies`
//! - `Arena`: the fixed `width x height` rectangle bodies live in
//!
//! The grid and the collision passes only ever hold `BodyHandle`s; the
//! registry is the single owner of body state.

use nalgebra::Vector2;

use super::error::{SimError, SimResult};

pub type NVec2 = Vector2<f64>;

/// Render color hint (r, g, b)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tint(pub [u8; 3]);

impl Tint {
    /// Denser bodies are a deeper blue
    pub fn from_density(density: f64) -> Self {
        let rg = (200.0 - density * 10.0).clamp(0.0, 255.0) as u8;
        Tint([rg, rg, 255])
    }

    /// Heavier bodies are a deeper yellow
    pub fn from_mass(mass: f64) -> Self {
        let b = (255.0 - mass / 250.0).clamp(0.0, 255.0) as u8;
        Tint([255, 255, b])
    }
}

impl Default for Tint {
    fn default() -> Self {
        Tint([255, 255, 255])
    }
}

#[derive(Debug, Clone)]
pub struct Body {
    pub x: NVec2, // position
    pub v: NVec2, // velocity
    pub m: f64, // mass
    pub radius: f64, // radius
    pub restitution: f64, // elasticity in [0, 1]
    pub tint: Tint, // color hint for the renderer
}

impl Body {
    pub fn new(x: NVec2, v: NVec2, m: f64, radius: f64) -> Self {
        Self {
            x,
            v,
            m,
            radius,
            restitution: 1.0,
            tint: Tint::default(),
        }
    }

    /// Body whose mass is area-proportional: `m = density * r^2`
    pub fn with_density(x: NVec2, v: NVec2, radius: f64, density: f64) -> Self {
        let mut body = Self::new(x, v, density * radius * radius, radius);
        body.tint = Tint::from_density(density);
        body
    }

    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Drift: x += v dt
    pub fn integrate(&mut self, dt: f64) {
        self.x += self.v * dt;
    }

    /// Reflect the body back into `[radius, dim - radius]` on each axis.
    ///
    /// The position is mirrored about the violated bound; the velocity
    /// component is negated only while it still points outward, so a body
    /// already turned around by a collision is not flipped twice.
    pub fn contain_in_bounds(&mut self, width: f64, height: f64) {
        let r = self.radius;
        contain_axis(&mut self.x.x, &mut self.v.x, r, width - r);
        contain_axis(&mut self.x.y, &mut self.v.y, r, height - r);
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.m * self.v.norm_squared()
    }

    pub fn momentum(&self) -> NVec2 {
        self.m * self.v
    }
}

fn contain_axis(pos: &mut f64, vel: &mut f64, lo: f64, hi: f64) {
    if *pos < lo {
        *pos = 2.0 * lo - *pos;
        if *vel < 0.0 {
            *vel = -*vel;
        }
    } else if *pos > hi {
        *pos = 2.0 * hi - *pos;
        if *vel > 0.0 {
            *vel = -*vel;
        }
    }

    // a displacement larger than the arena itself overshoots the mirror
    if *pos < lo || *pos > hi {
        *pos = pos.clamp(lo.min(hi), hi.max(lo));
    }
}

/// Fixed simulation rectangle, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub width: f64,
    pub height: f64,
}

impl Arena {
    pub fn new(width: f64, height: f64) -> SimResult<Self> {
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(SimError::InvalidConfig(format!(
                "arena dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Whether a circle of `radius` at `x` lies fully inside the arena
    pub fn contains(&self, x: &NVec2, radius: f64) -> bool {
        x.x >= radius && x.x <= self.width - radius && x.y >= radius && x.y <= self.height - radius
    }

    pub fn out_of_bounds(&self, x: &NVec2) -> SimError {
        SimError::OutOfBounds {
            x: x.x,
            y: x.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Stable reference to a body slot in [`Bodies`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    body: Option<Body>,
}

/// Registry owning all live bodies.
///
/// Removed slots are recycled with a bumped generation, so a stale handle
/// never aliases a newer body.
#[derive(Debug, Clone, Default)]
pub struct Bodies {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl Bodies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever allocated (upper bound on `BodyHandle::index`)
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn insert(&mut self, body: Body) -> BodyHandle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            return BodyHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            body: Some(body),
        });
        BodyHandle { index, generation: 0 }
    }

    pub fn remove(&mut self, handle: BodyHandle) -> Option<Body> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        let body = slot.body.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(body)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&Body> {
        self.slots
            .get(handle.index())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_ref())
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_mut())
    }

    /// Two disjoint mutable borrows; `None` for `a == b` or stale handles
    pub fn pair_mut(&mut self, a: BodyHandle, b: BodyHandle) -> Option<(&mut Body, &mut Body)> {
        if a.index == b.index || !self.contains(a) || !self.contains(b) {
            return None;
        }

        let (lo, hi, swapped) = if a.index < b.index {
            (a.index(), b.index(), false)
        } else {
            (b.index(), a.index(), true)
        };
        let (head, tail) = self.slots.split_at_mut(hi);
        let first = head[lo].body.as_mut()?;
        let second = tail[0].body.as_mut()?;

        if swapped {
            Some((second, first))
        } else {
            Some((first, second))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &Body)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.body.as_ref().map(|b| {
                (
                    BodyHandle {
                        index: i as u32,
                        generation: s.generation,
                    },
                    b,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Body> + '_ {
        self.slots.iter_mut().filter_map(|s| s.body.as_mut())
    }

    pub fn handles(&self) -> Vec<BodyHandle> {
        self.iter().map(|(h, _)| h).collect()
    }

    pub fn total_momentum(&self) -> NVec2 {
        self.iter().fold(NVec2::zeros(), |acc, (_, b)| acc + b.momentum())
    }

    pub fn total_kinetic_energy(&self) -> f64 {
        self.iter().map(|(_, b)| b.kinetic_energy()).sum()
    }
}

/// Read-only view of a body for renderers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyView {
    pub handle: BodyHandle,
    pub x: NVec2,
    pub radius: f64,
    pub tint: Tint,
}

impl BodyView {
    pub fn of(handle: BodyHandle, body: &Body) -> Self {
        Self {
            handle,
            x: body.x,
            radius: body.radius,
            tint: body.tint,
        }
    }
}
