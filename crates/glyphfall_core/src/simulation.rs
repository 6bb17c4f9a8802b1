//! # Simulation
//!
//! Owns the particle store and runs one frame at a time: spawn, then
//! physics. Time only advances through [`Simulation::tick`], so the whole
//! engine is deterministic for a given seed, `dt` sequence and input.

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::GlyphfallConfig;
use crate::mask::OccupancyMask;
use crate::measure::Measure;
use crate::particle::{Hitbox, Particle, ParticleStore};
use crate::physics::{PhysicsEngine, StepReport, Surface};
use crate::queue::TextQueue;
use crate::scheduler::SpawnScheduler;

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Particles emitted this tick.
    pub spawned: usize,
    /// Physics counters.
    pub physics: StepReport,
    /// Live particles after the tick.
    pub live: usize,
}

/// Spawn scheduler, physics engine and particle store behind one clock.
#[derive(Debug)]
pub struct Simulation<R = ChaCha8Rng> {
    scheduler: SpawnScheduler<R>,
    physics: PhysicsEngine,
    store: ParticleStore,
    clock: Duration,
    frame: u64,
    show_hitboxes: bool,
    spawning: bool,
}

impl Simulation<ChaCha8Rng> {
    /// Creates a simulation with a `ChaCha8` generator seeded from `seed`.
    #[must_use]
    pub fn with_seed(config: &GlyphfallConfig, surface: Surface, seed: u64) -> Self {
        Self::new(config, surface, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> Simulation<R> {
    /// Creates a simulation drawing all randomness from `rng`.
    #[must_use]
    pub fn new(config: &GlyphfallConfig, surface: Surface, rng: R) -> Self {
        Self {
            scheduler: SpawnScheduler::from_config(config, surface.width, rng),
            physics: PhysicsEngine::from_config(config, surface),
            store: ParticleStore::with_capacity(256),
            clock: Duration::ZERO,
            frame: 0,
            show_hitboxes: config.diagnostics.show_hitboxes,
            spawning: config.emission.enabled,
        }
    }

    /// Runs one frame. `dt` is real time since the previous frame; `mask`
    /// is the latest snapshot, or `None` for no collisions.
    ///
    /// While spawning is paused the queue is left alone and no emission
    /// time accrues, but live particles keep falling and expiring.
    pub fn tick<Q, M>(
        &mut self,
        dt: Duration,
        queue: &mut Q,
        measure: &M,
        mask: Option<&OccupancyMask>,
    ) -> TickReport
    where
        Q: TextQueue + ?Sized,
        M: Measure + ?Sized,
    {
        self.clock += dt;
        self.frame += 1;

        let mut spawned_count = 0;
        if self.spawning {
            let spawned = self.scheduler.tick(dt, self.clock, queue, measure);
            spawned_count = spawned.len();
            self.store.extend(spawned);
        }

        let physics = self.physics.step(&mut self.store, mask, self.clock);

        TickReport {
            frame: self.frame,
            spawned: spawned_count,
            physics,
            live: self.store.len(),
        }
    }

    /// Live particles, for rendering.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        self.store.as_slice()
    }

    /// The particle store.
    #[must_use]
    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    /// Glyph boxes when hitbox diagnostics are enabled, otherwise empty.
    #[must_use]
    pub fn hitboxes(&self) -> Vec<Hitbox> {
        if !self.show_hitboxes {
            return Vec::new();
        }
        let font_size = self.physics.font_size();
        self.store.iter().map(|p| p.hitbox(font_size)).collect()
    }

    /// Toggles hitbox diagnostics.
    pub fn set_show_hitboxes(&mut self, show: bool) {
        self.show_hitboxes = show;
    }

    /// Pauses or resumes emission. The string being emitted and the
    /// fractional carry are kept, so resuming continues where it left off.
    pub fn set_spawning(&mut self, spawning: bool) {
        self.spawning = spawning;
    }

    /// Whether new particles are being emitted.
    #[must_use]
    pub fn is_spawning(&self) -> bool {
        self.spawning
    }

    /// Simulation time: the sum of every `dt` seen.
    #[must_use]
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// Frames run so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// The spawn scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &SpawnScheduler<R> {
        &self.scheduler
    }

    /// The physics engine.
    #[must_use]
    pub fn physics(&self) -> &PhysicsEngine {
        &self.physics
    }

    /// Applies a new surface size. Live particles are pulled back inside
    /// the new width; the next physics step settles them on the new floor.
    pub fn resize(&mut self, surface: Surface) {
        self.physics.set_surface(surface);
        self.scheduler.set_target_width(surface.width);
        for p in self.store.iter_mut() {
            self.physics.clamp_to_surface(p);
        }
    }

    /// Removes every particle and forgets emission progress.
    pub fn clear(&mut self) {
        self.store.clear();
        self.scheduler.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::MonospaceMeasure;

    #[test]
    fn test_tick_advances_clock_and_frame() {
        let config = GlyphfallConfig::default();
        let mut sim = Simulation::with_seed(&config, Surface::new(320.0, 240.0), 1);
        let mut queue: Vec<String> = Vec::new();
        let measure = MonospaceMeasure::new(24.0);
        let report = sim.tick(Duration::from_millis(16), &mut queue, &measure, None);
        assert_eq!(report.frame, 1);
        assert_eq!(report.live, 0);
        assert_eq!(sim.clock(), Duration::from_millis(16));
    }

    #[test]
    fn test_hitboxes_follow_diagnostics_toggle() {
        let mut config = GlyphfallConfig::default();
        config.emission.rate = 100.0;
        let mut sim = Simulation::with_seed(&config, Surface::new(320.0, 240.0), 1);
        let mut queue = vec!["hi".to_string()];
        sim.tick(Duration::from_secs(1), &mut queue, &MonospaceMeasure::new(24.0), None);

        assert!(sim.hitboxes().is_empty());
        sim.set_show_hitboxes(true);
        let boxes = sim.hitboxes();
        assert_eq!(boxes.len(), 2);
        assert!(boxes.iter().all(|b| (b.height - 40.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_clear_empties_store() {
        let mut config = GlyphfallConfig::default();
        config.emission.rate = 100.0;
        let mut sim = Simulation::with_seed(&config, Surface::new(320.0, 240.0), 1);
        let mut queue = vec!["abc".to_string()];
        sim.tick(Duration::from_secs(1), &mut queue, &MonospaceMeasure::new(24.0), None);
        assert_eq!(sim.particles().len(), 3);
        sim.clear();
        assert!(sim.particles().is_empty());
        assert!(sim.scheduler().carry().abs() < f64::EPSILON);
    }

    #[test]
    fn test_resize_pulls_particles_inside_new_width() {
        let mut config = GlyphfallConfig::default();
        config.emission.rate = 1000.0;
        config.emission.max_per_tick = 64;
        config.lifetime.millis = 0;
        let mut sim = Simulation::with_seed(&config, Surface::new(400.0, 400.0), 9);
        let mut queue = vec!["abcdefghijklmnopqrstuvwxyz".to_string()];
        let measure = MonospaceMeasure::new(12.0);
        sim.tick(Duration::from_millis(100), &mut queue, &measure, None);
        assert_eq!(sim.particles().len(), 26);
        assert!(sim.particles().iter().any(|p| p.right() > 100.0));

        sim.resize(Surface::new(100.0, 100.0));
        for _ in 0..120 {
            sim.tick(Duration::from_millis(16), &mut queue, &measure, None);
        }
        assert_eq!(sim.particles().len(), 26);
        for p in sim.particles() {
            assert!(p.left() >= 0.0 && p.right() <= 100.0, "off surface at x={}", p.x);
            assert!((p.y - 60.0).abs() < f32::EPSILON, "rests on the new floor");
        }
    }

    #[test]
    fn test_paused_spawning_keeps_physics_running() {
        let mut config = GlyphfallConfig::default();
        config.emission.rate = 100.0;
        config.lifetime.millis = 1000;
        let mut sim = Simulation::with_seed(&config, Surface::new(320.0, 240.0), 2);
        let mut queue = vec!["ab".to_string(), "cd".to_string()];
        let measure = MonospaceMeasure::new(24.0);

        sim.tick(Duration::from_millis(15), &mut queue, &measure, None);
        assert_eq!(sim.particles().len(), 1);
        sim.set_spawning(false);
        assert!(!sim.is_spawning());

        let y = sim.particles()[0].y;
        let carry = sim.scheduler().carry();
        let report = sim.tick(Duration::from_millis(500), &mut queue, &measure, None);
        assert_eq!(report.spawned, 0);
        assert_eq!(sim.particles().len(), 1);
        assert!(sim.particles()[0].y > y, "keeps falling");
        assert!((sim.scheduler().carry() - carry).abs() < f64::EPSILON);
        assert_eq!(queue.len(), 2);

        let report = sim.tick(Duration::from_millis(600), &mut queue, &measure, None);
        assert_eq!(report.physics.reaped, 1);
        assert!(sim.particles().is_empty());

        sim.set_spawning(true);
        let report = sim.tick(Duration::from_millis(10), &mut queue, &measure, None);
        assert_eq!(report.spawned, 1);
        assert_eq!(queue.len(), 1, "first string finished after resuming");
    }

    #[test]
    fn test_spawning_follows_emission_config() {
        let mut config = GlyphfallConfig::default();
        config.emission.enabled = false;
        let sim = Simulation::with_seed(&config, Surface::new(320.0, 240.0), 2);
        assert!(!sim.is_spawning());
    }
}
