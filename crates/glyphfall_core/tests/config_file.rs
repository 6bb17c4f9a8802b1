//! The shipped configuration file must stay in sync with the defaults.

use glyphfall_core::GlyphfallConfig;

const SHIPPED: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/glyphfall.toml");

#[test]
fn shipped_config_matches_defaults() {
    let config = GlyphfallConfig::from_file(SHIPPED).unwrap();
    assert_eq!(config, GlyphfallConfig::default());
}
