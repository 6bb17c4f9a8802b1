//! # Particle Model
//!
//! One falling glyph, and the store that owns every live one.
//!
//! The store is an unordered arena: the spawn scheduler appends, the physics
//! step compacts in place with swap-remove. Nothing else mutates it.

use std::time::Duration;

use crate::color::Rgba8;

/// One falling text cluster.
///
/// `glyph`, `width`, `speed` and `color` are fixed at spawn. Position and
/// velocity change only inside the physics step.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    /// A single user-perceived cluster (may span several code points).
    pub glyph: String,
    /// Horizontal center in pixels.
    pub x: f32,
    /// Top edge in pixels.
    pub y: f32,
    /// Measured width of `glyph`.
    pub width: f32,
    /// Horizontal velocity (px/frame).
    pub vx: f32,
    /// Vertical velocity (px/frame), positive is down.
    pub vy: f32,
    /// Terminal fall speed (px/frame).
    pub speed: f32,
    /// Display color, shared by every glyph of the source string.
    pub color: Rgba8,
    /// Simulation time at spawn.
    pub created_at: Duration,
}

impl Particle {
    /// Creates a resting particle at `(x, y)`.
    #[must_use]
    pub fn new(
        glyph: impl Into<String>,
        x: f32,
        y: f32,
        width: f32,
        speed: f32,
        color: Rgba8,
        created_at: Duration,
    ) -> Self {
        Self {
            glyph: glyph.into(),
            x,
            y,
            width,
            vx: 0.0,
            vy: 0.0,
            speed,
            color,
            created_at,
        }
    }

    /// Time since spawn.
    #[inline]
    #[must_use]
    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.created_at)
    }

    /// Whether the particle has outlived `lifetime` at `now`.
    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: Duration, lifetime: Option<Duration>) -> bool {
        lifetime.is_some_and(|limit| self.age(now) > limit)
    }

    /// Left edge of the collision footprint.
    #[inline]
    #[must_use]
    pub fn left(&self) -> f32 {
        self.x - self.width / 2.0
    }

    /// Right edge of the collision footprint.
    #[inline]
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Glyph box for diagnostics.
    #[must_use]
    pub fn hitbox(&self, font_size: f32) -> Hitbox {
        Hitbox {
            x: self.left(),
            y: self.y,
            width: self.width,
            height: font_size,
        }
    }
}

/// Axis-aligned glyph box in surface pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Hitbox {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Hitbox {
    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Every live particle. Iteration order is unspecified.
#[derive(Debug, Default)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl ParticleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with room for `capacity` particles.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
        }
    }

    /// Adds one particle.
    pub fn push(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    /// Number of live particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// True when no particle is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Read-only view for renderers.
    #[must_use]
    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    /// Iterates over live particles.
    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    /// Mutable view for the physics step.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Particle> {
        self.particles.iter_mut()
    }

    /// Removes every particle.
    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Keeps particles for which `keep` returns true, compacting in place.
    ///
    /// Removal swaps the last particle into the hole, so order is not
    /// preserved. `keep` may mutate the particle it inspects. Returns the
    /// number of particles removed.
    pub fn retain_swap<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&mut Particle) -> bool,
    {
        let before = self.particles.len();
        let mut i = 0;
        while i < self.particles.len() {
            if keep(&mut self.particles[i]) {
                i += 1;
            } else {
                self.particles.swap_remove(i);
            }
        }
        before - self.particles.len()
    }
}

impl Extend<Particle> for ParticleStore {
    fn extend<I: IntoIterator<Item = Particle>>(&mut self, iter: I) {
        self.particles.extend(iter);
    }
}

impl<'a> IntoIterator for &'a ParticleStore {
    type Item = &'a Particle;
    type IntoIter = std::slice::Iter<'a, Particle>;

    fn into_iter(self) -> Self::IntoIter {
        self.particles.iter()
    }
}
