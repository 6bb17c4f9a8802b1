//! # Physics & Collision Engine
//!
//! Advances every live particle once per rendered frame against the latest
//! occupancy mask.
//!
//! ## Per-Particle Order
//!
//! ```text
//! 1. age check          expired -> removed, nothing else runs
//! 2. gravity            vy = min(vy + g, speed)
//! 3. tentative move     next_y = y + vy
//!    ├─ floor reached   -> snap to floor, go to 6
//!    ├─ mask free       -> commit (4)
//!    └─ mask blocked    -> lateral deflection (5), vy = 0
//! 6. overlap            push up, then ring search, then pop upward
//! 7. floor clamp
//! 8. lateral motion     friction, then 1px steps until blocked
//! ```
//!
//! The footprint tested against the mask is the glyph's bottom row,
//! `[x - w/2, x + w/2]` at `y + font_size`, sampled every `sample_stride`
//! pixels. Velocities are pixels per frame.

use std::time::Duration;

use tracing::trace;

use crate::config::{GlyphfallConfig, PhysicsConfig};
use crate::mask::OccupancyMask;
use crate::particle::{Particle, ParticleStore};

/// Render surface dimensions in mask pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surface {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Surface {
    /// Creates a surface.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Counters from one physics step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Particles removed for age.
    pub reaped: usize,
    /// Particles that reached the floor this step.
    pub floor_contacts: usize,
    /// Particles whose fall was blocked by the mask and turned sideways.
    pub deflected: usize,
    /// Overlaps cleared.
    pub resolved: usize,
    /// Overlaps left in place after the search budget ran out.
    pub unresolved: usize,
}

/// Search order at every ring radius: cardinals first, then diagonals.
const RING: [(f32, f32); 8] = [
    (0.0, -1.0),
    (-1.0, 0.0),
    (1.0, 0.0),
    (0.0, 1.0),
    (-1.0, -1.0),
    (1.0, -1.0),
    (-1.0, 1.0),
    (1.0, 1.0),
];

/// Gravity, mask collision and lifetime for the particle store.
#[derive(Clone, Debug)]
pub struct PhysicsEngine {
    config: PhysicsConfig,
    font_size: f32,
    lifetime: Option<Duration>,
    surface: Surface,
}

impl PhysicsEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(
        config: PhysicsConfig,
        font_size: f32,
        lifetime: Option<Duration>,
        surface: Surface,
    ) -> Self {
        Self {
            config,
            font_size,
            lifetime,
            surface,
        }
    }

    /// Creates an engine from the engine configuration.
    #[must_use]
    pub fn from_config(config: &GlyphfallConfig, surface: Surface) -> Self {
        Self::new(
            config.physics.clone(),
            config.font.size,
            config.lifetime.duration(),
            surface,
        )
    }

    /// Current surface.
    #[must_use]
    pub fn surface(&self) -> Surface {
        self.surface
    }

    /// Replaces the surface (window resize).
    pub fn set_surface(&mut self, surface: Surface) {
        self.surface = surface;
    }

    /// Font size used for the glyph box height.
    #[must_use]
    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Highest `y` a particle may rest at.
    #[must_use]
    pub fn floor_y(&self) -> f32 {
        (self.surface.height - self.font_size).max(0.0)
    }

    /// Runs one frame over the whole store.
    ///
    /// A missing or zero-dimension mask means no collisions this frame.
    pub fn step(
        &self,
        store: &mut ParticleStore,
        mask: Option<&OccupancyMask>,
        now: Duration,
    ) -> StepReport {
        let mask = mask.filter(|m| !m.is_empty());
        let mut report = StepReport::default();
        let reaped = store.retain_swap(|p| {
            if p.is_expired(now, self.lifetime) {
                return false;
            }
            self.advance(p, mask, &mut report);
            true
        });
        report.reaped = reaped;
        report
    }

    /// Moves a particle horizontally inside the surface and above the
    /// floor. A glyph wider than the surface is pinned to its left edge.
    pub fn clamp_to_surface(&self, p: &mut Particle) {
        let half = p.width / 2.0;
        p.x = p.x.clamp(half, (self.surface.width - half).max(half));
        p.y = p.y.min(self.floor_y());
    }

    /// Advances one particle by one frame (steps 2 through 8).
    pub fn advance(&self, p: &mut Particle, mask: Option<&OccupancyMask>, report: &mut StepReport) {
        let floor = self.floor_y();

        p.vy = (p.vy + self.config.gravity).min(p.speed);
        let next_y = p.y + p.vy;

        let mut supported = false;
        let overlapping = if next_y >= floor {
            p.y = floor;
            if p.vy > 0.0 {
                p.vy = 0.0;
            }
            report.floor_contacts += 1;
            supported = true;
            self.collides(p.x, p.width, p.y, mask)
        } else if !self.collides(p.x, p.width, next_y, mask) {
            p.y = next_y;
            false
        } else if self.collides(p.x, p.width, p.y, mask) {
            true
        } else {
            p.vx += self.deflection(p, next_y, mask);
            p.vy = 0.0;
            report.deflected += 1;
            supported = true;
            false
        };

        if overlapping {
            if self.resolve_overlap(p, mask) {
                report.resolved += 1;
            } else {
                report.unresolved += 1;
                trace!(glyph = %p.glyph, x = p.x, y = p.y, "overlap left unresolved");
            }
        }

        if p.y > floor {
            p.y = floor;
            if p.vy > 0.0 {
                p.vy = 0.0;
            }
        }

        let on_floor = p.y >= floor - 0.5;
        self.integrate_lateral(p, mask, supported || on_floor);
    }

    /// Whether the glyph footprint centered at `x` with top edge `y`
    /// touches an occupied pixel.
    #[must_use]
    pub fn collides(&self, x: f32, width: f32, y: f32, mask: Option<&OccupancyMask>) -> bool {
        let Some(mask) = mask else {
            return false;
        };
        let row = (y + self.font_size).floor() as i32;
        if row < 0 || row >= mask.height() as i32 {
            return false;
        }
        let left = (x - width / 2.0).floor() as i32;
        let right = (x + width / 2.0).floor() as i32;
        (left..=right)
            .step_by(self.config.sample_stride.max(1) as usize)
            .any(|px| mask.is_occupied(px, row))
    }

    /// Horizontal impulse toward the less occupied side below a blocked
    /// fall. Positive pushes right.
    fn deflection(&self, p: &Particle, next_y: f32, mask: Option<&OccupancyMask>) -> f32 {
        let Some(mask) = mask else {
            return 0.0;
        };
        let samples = self.config.probe_samples.max(1);
        let depth = self.config.probe_depth.max(1);
        let contact_row = (next_y + self.font_size).floor() as i32;
        let spacing = (p.width / 2.0 + self.config.sample_stride as f32) / samples as f32;

        let mut left = 0_u32;
        let mut right = 0_u32;
        for k in 1..=samples {
            let dx = spacing * k as f32;
            let lx = (p.x - dx).floor() as i32;
            let rx = (p.x + dx).floor() as i32;
            for row in contact_row..contact_row + depth as i32 {
                left += u32::from(mask.is_occupied(lx, row));
                right += u32::from(mask.is_occupied(rx, row));
            }
        }

        let total = (samples * depth) as f32;
        (left as f32 - right as f32) / total * self.config.deflect_strength
    }

    /// Moves an overlapping particle to a clear spot. Returns false when the
    /// budget ran out and the particle was only nudged.
    fn resolve_overlap(&self, p: &mut Particle, mask: Option<&OccupancyMask>) -> bool {
        let origin_y = p.y;

        for _ in 0..self.config.max_resolve_steps {
            if !self.collides(p.x, p.width, p.y, mask) || p.y <= 0.0 {
                break;
            }
            p.y -= 1.0;
        }
        if !self.collides(p.x, p.width, p.y, mask) {
            self.pop(p);
            return true;
        }

        p.y = origin_y;
        let half = p.width / 2.0;
        let max_x = (self.surface.width - half).max(half);
        let step = self.config.search_step.max(1);
        let mut radius = step;
        while radius <= self.config.max_search_radius {
            let r = radius as f32;
            for (dx, dy) in RING {
                let cx = (p.x + dx * r).clamp(half, max_x);
                let cy = (origin_y + dy * r).clamp(0.0, self.floor_y());
                if !self.collides(cx, p.width, cy, mask) {
                    p.x = cx;
                    p.y = cy;
                    self.pop(p);
                    return true;
                }
            }
            radius += step;
        }

        p.y = (origin_y - 1.0).max(0.0);
        p.vy = 0.0;
        false
    }

    fn pop(&self, p: &mut Particle) {
        p.vy = p.vy.min(-self.config.pop_velocity);
    }

    fn integrate_lateral(&self, p: &mut Particle, mask: Option<&OccupancyMask>, grounded: bool) {
        p.vx *= if grounded {
            self.config.floor_friction
        } else {
            self.config.air_friction
        };
        if p.vx.abs() < self.config.vx_epsilon {
            p.vx = 0.0;
            return;
        }

        let cap = self.config.max_lateral_steps as f32;
        let travel = p.vx.clamp(-cap, cap);
        let steps = travel.abs().ceil() as u32;
        if steps == 0 {
            return;
        }
        let step = travel / steps as f32;
        let half = p.width / 2.0;

        for _ in 0..steps {
            let nx = p.x + step;
            let off_surface = nx - half < 0.0 || nx + half > self.surface.width;
            if off_surface || self.collides(nx, p.width, p.y, mask) {
                p.vx = 0.0;
                break;
            }
            p.x = nx;
        }
    }
}
