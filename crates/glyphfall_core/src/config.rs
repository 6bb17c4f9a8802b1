//! # Engine Configuration
//!
//! All tunables live in one TOML file, loaded once at startup.
//! Every field has a default, so a partial file only overrides what it names.
//!
//! ```toml
//! [emission]
//! rate = 8.0
//! speed_min = 2.0
//! speed_max = 5.0
//!
//! [lifetime]
//! millis = 6000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GlyphfallError, GlyphfallResult};

/// How a string is split into spawnable clusters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segmentation {
    /// Extended grapheme clusters (combining marks and emoji stay whole).
    #[default]
    Graphemes,
    /// Degraded mode: one cluster per Unicode scalar value.
    CodePoints,
}

/// Emission settings for the spawn scheduler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionConfig {
    /// Whether strings are emitted at all. Live particles are simulated
    /// either way.
    pub enabled: bool,
    /// Particles emitted per second.
    pub rate: f64,
    /// Hard ceiling on particles emitted in a single tick.
    pub max_per_tick: u32,
    /// One end of the terminal fall speed range (px/frame).
    pub speed_min: f32,
    /// Other end of the terminal fall speed range (px/frame).
    pub speed_max: f32,
    /// Cap on clusters laid out per string.
    pub max_glyphs_per_string: usize,
    /// Vertical distance between wrapped lines, as a multiple of font size.
    pub line_height: f32,
    /// Cluster segmentation mode.
    pub segmentation: Segmentation,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 5.0,
            max_per_tick: 16,
            speed_min: 3.0,
            speed_max: 3.0,
            max_glyphs_per_string: 4000,
            line_height: 1.0,
            segmentation: Segmentation::Graphemes,
        }
    }
}

/// Font settings shared by layout, collision and rendering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Font size in pixels; also the glyph box height.
    pub size: f32,
    /// Font family handed to the renderer.
    pub family: String,
    /// Monospace advance as a fraction of `size` (built-in measurer).
    pub advance_ratio: f32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            size: 40.0,
            family: "monospace".to_string(),
            advance_ratio: 0.6,
        }
    }
}

/// Particle lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifetimeConfig {
    /// Milliseconds a particle lives. `0` disables age-based reaping.
    pub millis: u64,
}

impl Default for LifetimeConfig {
    fn default() -> Self {
        Self { millis: 4_000 }
    }
}

impl LifetimeConfig {
    /// Returns the lifetime, or `None` when particles never expire.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        (self.millis > 0).then(|| Duration::from_millis(self.millis))
    }
}

/// Physics and collision tunables. Distances are mask pixels, velocities
/// are pixels per frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Added to `vy` every frame, capped by the particle's terminal speed.
    pub gravity: f32,
    /// Horizontal stride between collision samples.
    pub sample_stride: u32,
    /// Maximum one-pixel upward pushes when resolving an overlap.
    pub max_resolve_steps: u32,
    /// Largest ring radius searched once upward pushing gives up.
    pub max_search_radius: u32,
    /// Radius increment between search rings.
    pub search_step: u32,
    /// Upward velocity imparted after an overlap is resolved.
    pub pop_velocity: f32,
    /// Rows below the blocked position inspected for slide direction.
    pub probe_depth: u32,
    /// Lateral samples taken on each side when probing.
    pub probe_samples: u32,
    /// Scales the probe asymmetry into a horizontal impulse.
    pub deflect_strength: f32,
    /// `vx` multiplier per frame while resting on the floor.
    pub floor_friction: f32,
    /// `vx` multiplier per frame while airborne.
    pub air_friction: f32,
    /// `|vx|` below this snaps to zero.
    pub vx_epsilon: f32,
    /// Maximum one-pixel lateral moves per frame.
    pub max_lateral_steps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.5,
            sample_stride: 4,
            max_resolve_steps: 48,
            max_search_radius: 64,
            search_step: 4,
            pop_velocity: 1.5,
            probe_depth: 4,
            probe_samples: 4,
            deflect_strength: 2.0,
            floor_friction: 0.8,
            air_friction: 0.98,
            vx_epsilon: 0.05,
            max_lateral_steps: 4,
        }
    }
}

/// Diagnostic toggles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Expose particle hitboxes to the renderer.
    pub show_hitboxes: bool,
}

/// Text feed settings (consumed by the runtime crate).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Milliseconds between polls of the text source.
    pub poll_interval_ms: u64,
    /// Maximum strings waiting in the queue.
    pub max_pending: usize,
    /// Number of recently seen strings remembered for deduplication.
    pub history: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            max_pending: 64,
            history: 512,
        }
    }
}

/// Frame loop settings (consumed by the runtime crate).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Target frames per second.
    pub target_fps: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { target_fps: 60 }
    }
}

/// Complete engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphfallConfig {
    /// Spawn scheduler settings.
    pub emission: EmissionConfig,
    /// Font settings.
    pub font: FontConfig,
    /// Particle lifetime.
    pub lifetime: LifetimeConfig,
    /// Physics tunables.
    pub physics: PhysicsConfig,
    /// Diagnostic toggles.
    pub diagnostics: DiagnosticsConfig,
    /// Text feed settings.
    pub feed: FeedConfig,
    /// Frame loop settings.
    pub frame: FrameConfig,
}

impl GlyphfallConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema or a
    /// value fails validation.
    pub fn from_toml_str(text: &str) -> GlyphfallResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> GlyphfallResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Checks every value against its valid range.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphfallError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> GlyphfallResult<()> {
        let e = &self.emission;
        if !e.rate.is_finite() || e.rate < 0.0 {
            return Err(invalid("emission.rate must be a finite, non-negative number"));
        }
        if e.max_per_tick == 0 {
            return Err(invalid("emission.max_per_tick must be at least 1"));
        }
        if !finite_non_negative(e.speed_min) || !finite_non_negative(e.speed_max) {
            return Err(invalid("emission speeds must be finite and non-negative"));
        }
        if e.max_glyphs_per_string == 0 {
            return Err(invalid("emission.max_glyphs_per_string must be at least 1"));
        }
        if !finite_non_negative(e.line_height) {
            return Err(invalid("emission.line_height must be finite and non-negative"));
        }

        if !self.font.size.is_finite() || self.font.size <= 0.0 {
            return Err(invalid("font.size must be positive"));
        }
        if !self.font.advance_ratio.is_finite() || self.font.advance_ratio <= 0.0 {
            return Err(invalid("font.advance_ratio must be positive"));
        }

        let p = &self.physics;
        if !finite_non_negative(p.gravity) {
            return Err(invalid("physics.gravity must be finite and non-negative"));
        }
        if p.sample_stride == 0 || p.search_step == 0 {
            return Err(invalid("physics strides must be at least 1"));
        }
        if p.probe_samples == 0 {
            return Err(invalid("physics.probe_samples must be at least 1"));
        }
        for (name, value) in [
            ("physics.floor_friction", p.floor_friction),
            ("physics.air_friction", p.air_friction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GlyphfallError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if !finite_non_negative(p.pop_velocity)
            || !finite_non_negative(p.deflect_strength)
            || !finite_non_negative(p.vx_epsilon)
        {
            return Err(invalid("physics velocities must be finite and non-negative"));
        }

        if self.feed.poll_interval_ms == 0 {
            return Err(invalid("feed.poll_interval_ms must be at least 1"));
        }
        if self.frame.target_fps == 0 {
            return Err(invalid("frame.target_fps must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> GlyphfallError {
    GlyphfallError::InvalidConfig(message.to_string())
}

fn finite_non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GlyphfallConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.emission.max_per_tick, 16);
        assert_eq!(config.emission.max_glyphs_per_string, 4000);
        assert_eq!(config.physics.sample_stride, 4);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = GlyphfallConfig::from_toml_str(
            r#"
            [emission]
            rate = 12.5

            [font]
            size = 24.0
            "#,
        )
        .unwrap();

        assert!((config.emission.rate - 12.5).abs() < f64::EPSILON);
        assert!((config.font.size - 24.0).abs() < f32::EPSILON);
        assert_eq!(config.font.family, "monospace");
        assert_eq!(config.lifetime.millis, 4_000);
        assert!(config.emission.enabled);
    }

    #[test]
    fn test_emission_can_start_paused() {
        let config = GlyphfallConfig::from_toml_str("[emission]
enabled = false
").unwrap();
        assert!(!config.emission.enabled);
        assert!((config.emission.rate - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_lifetime_never_expires() {
        let config = GlyphfallConfig::from_toml_str("[lifetime]\nmillis = 0\n").unwrap();
        assert_eq!(config.lifetime.duration(), None);
    }

    #[test]
    fn test_segmentation_parses_snake_case() {
        let config =
            GlyphfallConfig::from_toml_str("[emission]\nsegmentation = \"code_points\"\n").unwrap();
        assert_eq!(config.emission.segmentation, Segmentation::CodePoints);
    }

    #[test]
    fn test_rejects_bad_values() {
        for text in [
            "[emission]\nrate = -1.0\n",
            "[emission]\nmax_per_tick = 0\n",
            "[font]\nsize = 0.0\n",
            "[physics]\nsample_stride = 0\n",
            "[physics]\nfloor_friction = 1.5\n",
            "[frame]\ntarget_fps = 0\n",
        ] {
            let result = GlyphfallConfig::from_toml_str(text);
            assert!(
                matches!(result, Err(GlyphfallError::InvalidConfig(_))),
                "expected rejection for {text:?}"
            );
        }
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let result = GlyphfallConfig::from_toml_str("[emission\nrate = ");
        assert!(matches!(result, Err(GlyphfallError::ConfigParse(_))));
    }
}
