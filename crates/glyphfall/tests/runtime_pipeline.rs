//! # Runtime Pipeline Tests
//!
//! Feed poller -> title queue -> animator -> mask slot, wired the way the
//! headless binary wires them, but with fixed frame times.
//!
//! Run with: cargo test -p glyphfall --test runtime_pipeline

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glyphfall::{Animator, FeedPoller, FrameClock, MaskSlot, StaticSource};
use glyphfall_core::{
    GlyphfallConfig, MonospaceMeasure, OccupancyMask, Simulation, Surface, TextQueue, TitleQueue,
};

const FRAME: Duration = Duration::from_micros(16_667);

fn config() -> GlyphfallConfig {
    let mut config = GlyphfallConfig::default();
    config.emission.rate = 60.0;
    config.font.size = 12.0;
    config
}

#[test]
fn verify_feed_strings_become_particles() {
    let config = config();
    let surface = Surface::new(320.0, 180.0);
    let source = StaticSource::new(["alpha", "beta", "alpha"]);
    let feed = FeedPoller::spawn(source, Duration::from_millis(5)).unwrap();

    // A second poll only starts after the first batch was handed over.
    let deadline = Instant::now() + Duration::from_secs(2);
    while feed.stats().polls.load(Ordering::Relaxed) < 2 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }

    let mut animator = Animator::new(
        Simulation::with_seed(&config, surface, 12),
        TitleQueue::new(8, 64),
        MonospaceMeasure::new(7.0),
        MaskSlot::new(),
        FrameClock::new(60),
    )
    .with_feed(feed);

    animator.run_frames(120, FRAME);

    let mut glyphs: Vec<&str> = animator
        .simulation()
        .particles()
        .iter()
        .map(|p| p.glyph.as_str())
        .collect();
    glyphs.sort_unstable();
    // "alpha" once (deduplicated) plus "beta".
    assert_eq!(glyphs, ["a", "a", "a", "b", "e", "h", "l", "p", "t"]);
    assert!(animator.queue().is_empty());
}

#[test]
fn verify_published_mask_is_used_next_frame() {
    let mut config = config();
    config.emission.speed_min = 6.0;
    config.emission.speed_max = 6.0;
    let surface = Surface::new(200.0, 120.0);
    let masks = MaskSlot::new();

    let mut queue = TitleQueue::default();
    queue.offer(["M"]);
    let mut animator = Animator::new(
        Simulation::with_seed(&config, surface, 3),
        queue,
        MonospaceMeasure::new(7.0),
        Arc::clone(&masks),
        FrameClock::new(60),
    );

    // Falling freely for a few frames, nothing published yet.
    animator.run_frames(5, FRAME);
    assert!(animator.simulation().particles()[0].y < 48.0);

    // A block rising from y=60 appears under the falling glyph.
    masks.publish(OccupancyMask::from_fn(200, 120, |_, y| y >= 60));
    for _ in 0..60 {
        animator.run_frames(1, FRAME);
        let p = &animator.simulation().particles()[0];
        assert!(p.y + 12.0 <= 60.0, "fell into the block, y={}", p.y);
    }
    assert!(animator.simulation().particles()[0].y > 40.0, "came to rest on the block");
}

#[test]
fn verify_stop_handle_freezes_store() {
    let config = config();
    let mut queue = TitleQueue::default();
    queue.offer(["freeze frame"]);
    let mut animator = Animator::new(
        Simulation::with_seed(&config, Surface::new(320.0, 180.0), 1),
        queue,
        MonospaceMeasure::new(7.0),
        MaskSlot::new(),
        FrameClock::new(60),
    );

    animator.run_frames(20, FRAME);
    let snapshot = animator.simulation().particles().to_vec();

    let stop = animator.stop_handle();
    std::thread::spawn(move || stop.stop()).join().unwrap();

    assert_eq!(animator.run_frames(100, FRAME), 0);
    assert_eq!(animator.simulation().particles(), snapshot.as_slice());
    assert!(animator.stop_handle().is_stopped());
}
