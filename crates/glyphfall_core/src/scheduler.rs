//! # Spawn Scheduler
//!
//! Converts an emission rate and real elapsed time into particles.
//!
//! ## Rate Control
//!
//! ```text
//! carry += rate * dt
//! emit   = floor(carry)            carry keeps the fraction
//! emit   > max_per_tick ?          excess goes back into carry
//! ```
//!
//! Fractional progress is never lost, so emission over many ticks tracks
//! `rate * elapsed` within one particle. A slow frame is smoothed over the
//! following ticks instead of arriving as one burst.
//!
//! ## Emission
//!
//! Clusters of the current string are drawn at random without replacement
//! from its [`LayoutPlan`]. Positions come from the plan, so a half-revealed
//! string already sits where the full string will.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::config::GlyphfallConfig;
use crate::layout::{build_layout, LayoutOptions, LayoutPlan};
use crate::measure::Measure;
use crate::particle::Particle;
use crate::queue::TextQueue;

/// Emission tunables.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnSettings {
    /// Particles per second.
    pub rate: f64,
    /// Ceiling on particles emitted in one tick.
    pub max_per_tick: u32,
    /// Terminal speed bounds, in either order.
    pub speed_range: (f32, f32),
    /// Vertical distance between wrapped lines, in pixels.
    pub line_spacing: f32,
    /// Top edge of the first line at spawn.
    pub spawn_y: f32,
}

impl SpawnSettings {
    /// Extracts emission settings from the engine configuration.
    #[must_use]
    pub fn from_config(config: &GlyphfallConfig) -> Self {
        Self {
            rate: config.emission.rate,
            max_per_tick: config.emission.max_per_tick,
            speed_range: (config.emission.speed_min, config.emission.speed_max),
            line_spacing: config.emission.line_height * config.font.size,
            spawn_y: 0.0,
        }
    }
}

/// Plan for the string at the queue cursor, with the text it was built from
/// so an externally edited queue is detected instead of trusted.
#[derive(Debug)]
struct ActivePlan {
    source: String,
    plan: LayoutPlan,
}

/// Rate-limited, backpressured emitter of glyph particles.
#[derive(Debug)]
pub struct SpawnScheduler<R> {
    settings: SpawnSettings,
    layout: LayoutOptions,
    carry: f64,
    cursor: usize,
    active: Option<ActivePlan>,
    rng: R,
}

impl<R: Rng> SpawnScheduler<R> {
    /// Creates a scheduler drawing all randomness from `rng`.
    #[must_use]
    pub fn new(settings: SpawnSettings, layout: LayoutOptions, rng: R) -> Self {
        Self {
            settings,
            layout,
            carry: 0.0,
            cursor: 0,
            active: None,
            rng,
        }
    }

    /// Creates a scheduler for a surface of `surface_width` pixels.
    #[must_use]
    pub fn from_config(config: &GlyphfallConfig, surface_width: f32, rng: R) -> Self {
        let layout = LayoutOptions {
            target_width: surface_width,
            max_glyphs: config.emission.max_glyphs_per_string,
            segmentation: config.emission.segmentation,
        };
        Self::new(SpawnSettings::from_config(config), layout, rng)
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> &SpawnSettings {
        &self.settings
    }

    /// Fractional emission progress carried into the next tick.
    #[must_use]
    pub fn carry(&self) -> f64 {
        self.carry
    }

    /// Plan of the string currently being emitted, if one is in progress.
    #[must_use]
    pub fn current_plan(&self) -> Option<&LayoutPlan> {
        self.active.as_ref().map(|a| &a.plan)
    }

    /// Changes the wrap width. Takes effect from the next string; the plan
    /// in progress keeps its offsets.
    pub fn set_target_width(&mut self, width: f32) {
        self.layout.target_width = width;
    }

    /// Drops the in-progress plan and the carry.
    pub fn reset(&mut self) {
        self.carry = 0.0;
        self.cursor = 0;
        self.active = None;
    }

    /// Advances the carry accumulator by `dt` and returns how many particles
    /// this tick may emit.
    pub fn emission_count(&mut self, dt: Duration) -> u32 {
        self.carry += self.settings.rate * dt.as_secs_f64();
        let whole = self.carry.floor();
        self.carry -= whole;

        let ceiling = f64::from(self.settings.max_per_tick);
        if whole > ceiling {
            self.carry += whole - ceiling;
            self.settings.max_per_tick
        } else {
            whole as u32
        }
    }

    /// Runs one tick: emits up to the rate-limited count of particles,
    /// stamped with simulation time `now`.
    ///
    /// Never fails. Empty or unusable strings are removed from the queue
    /// and skipped without consuming an emission slot.
    pub fn tick<Q, M>(
        &mut self,
        dt: Duration,
        now: Duration,
        queue: &mut Q,
        measure: &M,
    ) -> Vec<Particle>
    where
        Q: TextQueue + ?Sized,
        M: Measure + ?Sized,
    {
        let count = self.emission_count(dt);
        let mut spawned = Vec::with_capacity(count as usize);
        for _ in 0..count {
            match self.next_particle(now, queue, measure) {
                Some(particle) => spawned.push(particle),
                None => break,
            }
        }
        spawned
    }

    fn next_particle<Q, M>(&mut self, now: Duration, queue: &mut Q, measure: &M) -> Option<Particle>
    where
        Q: TextQueue + ?Sized,
        M: Measure + ?Sized,
    {
        loop {
            let text = queue.get(self.cursor)?;

            let stale = self.active.as_ref().is_some_and(|a| a.source != text);
            if stale {
                debug!("queue changed under the active string, rebuilding layout");
                self.active = None;
            }

            if self.active.is_none() {
                let plan = build_layout(text, measure, &self.layout, &mut self.rng);
                if plan.is_empty() {
                    debug!(index = self.cursor, "skipping empty entry");
                    self.finish_current(queue);
                    continue;
                }
                debug!(
                    glyphs = plan.len(),
                    lines = plan.line_count(),
                    color = %plan.color().to_css(),
                    "starting string"
                );
                self.active = Some(ActivePlan {
                    source: text.to_string(),
                    plan,
                });
            }

            let speed = self.draw_speed();
            let Some(active) = self.active.as_mut() else {
                continue;
            };
            let Some(index) = active.plan.take_random(&mut self.rng) else {
                self.finish_current(queue);
                continue;
            };
            let Some(glyph) = active.plan.glyph(index) else {
                continue;
            };

            let particle = Particle::new(
                glyph.glyph,
                glyph.offset,
                self.settings.spawn_y - glyph.line as f32 * self.settings.line_spacing,
                glyph.width,
                speed,
                active.plan.color(),
                now,
            );

            if active.plan.is_exhausted() {
                self.finish_current(queue);
            }
            return Some(particle);
        }
    }

    fn finish_current<Q: TextQueue + ?Sized>(&mut self, queue: &mut Q) {
        queue.remove(self.cursor);
        self.cursor = 0;
        self.active = None;
    }

    fn draw_speed(&mut self) -> f32 {
        let (a, b) = self.settings.speed_range;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        if hi - lo <= f32::EPSILON {
            lo
        } else {
            self.rng.gen_range(lo..=hi)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::MonospaceMeasure;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const FRAME: Duration = Duration::from_micros(16_667);

    fn scheduler(rate: f64, max_per_tick: u32) -> SpawnScheduler<ChaCha8Rng> {
        SpawnScheduler::new(
            SpawnSettings {
                rate,
                max_per_tick,
                speed_range: (2.0, 6.0),
                line_spacing: 10.0,
                spawn_y: 0.0,
            },
            LayoutOptions::for_width(400.0),
            ChaCha8Rng::seed_from_u64(1),
        )
    }

    fn queue(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_carry_accumulates_fractions() {
        let mut s = scheduler(10.0, 16);
        let total: u32 = (0..60).map(|_| s.emission_count(FRAME)).sum();
        assert!((9..=10).contains(&total), "emitted {total}");
        assert!(s.carry() < 1.0);
    }

    #[test]
    fn test_burst_is_clamped_and_carried() {
        let mut s = scheduler(100.0, 16);
        assert_eq!(s.emission_count(Duration::from_secs(1)), 16);
        assert!((s.carry() - 84.0).abs() < 1e-9);
        assert_eq!(s.emission_count(Duration::ZERO), 16);
        assert!((s.carry() - 68.0).abs() < 1e-9);
    }

    #[test]
    fn test_emits_every_cluster_then_removes_string() {
        let mut s = scheduler(1000.0, 16);
        let mut q = queue(&["ab cd"]);
        let measure = MonospaceMeasure::new(10.0);

        let spawned = s.tick(Duration::from_secs(1), Duration::ZERO, &mut q, &measure);
        assert_eq!(spawned.len(), 4);
        assert!(q.is_empty(), "exhausted string removed in the same tick");
        assert!(s.current_plan().is_none());

        let mut glyphs: Vec<&str> = spawned.iter().map(|p| p.glyph.as_str()).collect();
        glyphs.sort_unstable();
        assert_eq!(glyphs, ["a", "b", "c", "d"]);
        assert!(spawned.iter().all(|p| p.color == spawned[0].color));
        assert!(spawned.iter().all(|p| (2.0..=6.0).contains(&p.speed)));
        assert!(spawned.iter().all(|p| p.vx == 0.0 && p.vy == 0.0));
    }

    #[test]
    fn test_whitespace_entries_are_skipped_without_spawning() {
        let mut s = scheduler(1000.0, 16);
        let mut q = queue(&["   ", "", "x"]);
        let measure = MonospaceMeasure::new(10.0);
        let spawned = s.tick(Duration::from_secs(1), Duration::ZERO, &mut q, &measure);
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].glyph, "x");
        assert!(q.is_empty());
    }

    #[test]
    fn test_empty_queue_is_noop() {
        let mut s = scheduler(1000.0, 16);
        let mut q: Vec<String> = Vec::new();
        assert!(s.tick(FRAME, Duration::ZERO, &mut q, &MonospaceMeasure::new(10.0)).is_empty());
    }

    #[test]
    fn test_next_string_starts_in_same_tick() {
        let mut s = scheduler(1000.0, 3);
        let mut q = queue(&["ab", "cd"]);
        let measure = MonospaceMeasure::new(10.0);
        let spawned = s.tick(Duration::from_secs(1), Duration::ZERO, &mut q, &measure);
        assert_eq!(spawned.len(), 3);
        assert_eq!(q.len(), 1);
        assert_eq!(s.current_plan().map(LayoutPlan::remaining), Some(1));
    }

    #[test]
    fn test_speed_bounds_accept_either_order() {
        let mut s = scheduler(1.0, 1);
        s.settings.speed_range = (6.0, 2.0);
        for _ in 0..64 {
            let v = s.draw_speed();
            assert!((2.0..=6.0).contains(&v));
        }
        s.settings.speed_range = (4.0, 4.0);
        assert!((s.draw_speed() - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_wrapped_lines_spawn_stacked() {
        let mut s = SpawnScheduler::new(
            SpawnSettings {
                rate: 1000.0,
                max_per_tick: 16,
                speed_range: (1.0, 1.0),
                line_spacing: 12.0,
                spawn_y: 0.0,
            },
            LayoutOptions::for_width(30.0),
            ChaCha8Rng::seed_from_u64(3),
        );
        let mut q = queue(&["aa bb"]);
        let measure = MonospaceMeasure::new(10.0);
        let spawned = s.tick(Duration::from_secs(1), Duration::ZERO, &mut q, &measure);
        for p in &spawned {
            let expected = if p.glyph == "a" { 0.0 } else { -12.0 };
            assert!((p.y - expected).abs() < f32::EPSILON, "{} at {}", p.glyph, p.y);
        }
    }

    #[test]
    fn test_external_queue_edit_rebuilds_plan() {
        let mut s = scheduler(1.0, 16);
        let mut q = queue(&["abc", "xyz"]);
        let measure = MonospaceMeasure::new(10.0);
        let first = s.tick(Duration::from_secs(1), Duration::ZERO, &mut q, &measure);
        assert_eq!(first.len(), 1);

        let _ = q.remove(0);
        let next = s.tick(Duration::from_secs(1), Duration::ZERO, &mut q, &measure);
        assert_eq!(next.len(), 1);
        assert!("xyz".contains(next[0].glyph.as_str()));
        assert_eq!(s.current_plan().map(LayoutPlan::len), Some(3));
    }
}
