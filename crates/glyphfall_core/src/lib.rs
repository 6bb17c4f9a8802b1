//! # Glyphfall Core
//!
//! Particle lifecycle engine for streams of falling text.
//!
//! Strings arrive from a queue, are laid out once, and are revealed one
//! cluster at a time as particles that fall under gravity and pile up on a
//! per-pixel occupancy mask (a body silhouette from an external segmenter).
//!
//! ## Data Flow
//!
//! ```text
//! TextQueue ──▶ build_layout ──▶ SpawnScheduler ──▶ ParticleStore ──▶ renderer
//!                (per string)     (rate + carry)        ▲
//!                                                       │ every frame
//!                               OccupancyMask ──▶ PhysicsEngine
//! ```
//!
//! ## Rules
//!
//! 1. **Single mutator per phase** - the scheduler appends, physics compacts
//! 2. **No fatal per-frame path** - bad strings, bad widths and missing masks
//!    degrade the picture, never the simulation
//! 3. **Injected randomness** - every random draw goes through one seeded RNG
//!
//! ## Example
//!
//! ```rust,ignore
//! use glyphfall_core::{GlyphfallConfig, MonospaceMeasure, Simulation, Surface};
//!
//! let config = GlyphfallConfig::default();
//! let mut sim = Simulation::with_seed(&config, Surface::new(640.0, 480.0), 7);
//! let mut queue = vec!["hello world".to_string()];
//! let measure = MonospaceMeasure::for_font(40.0, 0.6);
//!
//! let report = sim.tick(frame_dt, &mut queue, &measure, latest_mask.as_deref());
//! for p in sim.particles() { /* draw p.glyph at (p.x, p.y) in p.color */ }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod color;
pub mod config;
pub mod error;
pub mod layout;
pub mod mask;
pub mod measure;
pub mod particle;
pub mod physics;
pub mod queue;
pub mod scheduler;
pub mod simulation;

pub use color::Rgba8;
pub use config::{
    DiagnosticsConfig, EmissionConfig, FeedConfig, FontConfig, FrameConfig, GlyphfallConfig,
    LifetimeConfig, PhysicsConfig, Segmentation,
};
pub use error::{GlyphfallError, GlyphfallResult};
pub use layout::{build_layout, LayoutOptions, LayoutPlan, PlannedGlyph};
pub use mask::{MaskProvider, OccupancyMask};
pub use measure::{Measure, MonospaceMeasure};
pub use particle::{Hitbox, Particle, ParticleStore};
pub use physics::{PhysicsEngine, StepReport, Surface};
pub use queue::{TextQueue, TitleQueue};
pub use scheduler::{SpawnScheduler, SpawnSettings};
pub use simulation::{Simulation, TickReport};
