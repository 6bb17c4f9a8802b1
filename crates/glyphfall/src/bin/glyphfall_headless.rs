//! # Headless Glyphfall Run
//!
//! Runs the engine in real time against a synthetic, swaying silhouette and
//! prints frame statistics plus an ASCII preview of the final frame.
//!
//! Run with: cargo run --bin glyphfall_headless -- [config.toml] [titles.txt]
//!
//! Set `RUST_LOG=glyphfall=debug` to follow strings as they start.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use glyphfall::{
    AsciiPreview, Animator, FeedPoller, FrameClock, LinesFileSource, MaskSlot, StaticSource,
};
use glyphfall_core::{
    GlyphfallConfig, MaskProvider, MonospaceMeasure, OccupancyMask, Simulation, Surface, TextQueue,
    TitleQueue,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 360;
const RUN_FOR: Duration = Duration::from_secs(6);

const SAMPLE_TITLES: [&str; 6] = [
    "Local bakery wins regional sourdough championship",
    "Night trains return to the northern line",
    "Researchers map the quietest place in the city",
    "Volunteers plant 4,000 trees along the river",
    "\u{1f308} Festival of lights opens this weekend",
    "Library extends opening hours for exam season",
];

/// Head and shoulders centered at `sway` pixels from the middle.
fn silhouette(sway: f32) -> OccupancyMask {
    let cx = WIDTH as f32 / 2.0 + sway;
    OccupancyMask::from_fn(WIDTH, HEIGHT, |x, y| {
        let (dx, dy) = (x as f32 - cx, y as f32 - 170.0);
        let head = dx * dx / 0.7 + dy * dy <= 60.0 * 60.0;
        let shoulders = y >= 250 && (x as f32 - cx).abs() <= 180.0 - (360.0 - y as f32) * 0.4;
        head || shoulders
    })
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("glyphfall=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match GlyphfallConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                error!(path = %path, error = %e, "invalid configuration");
                return ExitCode::FAILURE;
            }
        },
        None => GlyphfallConfig::default(),
    };
    let interval = Duration::from_millis(config.feed.poll_interval_ms);
    let feed = match args.next() {
        Some(path) => FeedPoller::spawn(LinesFileSource::new(path), interval),
        None => FeedPoller::spawn(StaticSource::new(SAMPLE_TITLES), interval),
    };
    let feed = match feed {
        Ok(feed) => feed,
        Err(e) => {
            error!(error = %e, "could not start the text feed");
            return ExitCode::FAILURE;
        }
    };

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║              GLYPHFALL - HEADLESS RUN                            ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!("│ Surface:            {WIDTH}x{HEIGHT}");
    println!("│ Emission Rate:      {} glyphs/s", config.emission.rate);
    println!(
        "│ Fall Speed:         {}..{} px/frame",
        config.emission.speed_min, config.emission.speed_max
    );
    println!("│ Font:               {}px {}", config.font.size, config.font.family);
    println!("│ Lifetime:           {} ms", config.lifetime.millis);
    println!("│ Target FPS:         {}", config.frame.target_fps);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos() as u64);
    let surface = Surface::new(WIDTH as f32, HEIGHT as f32);
    let simulation = Simulation::with_seed(&config, surface, seed);
    let queue = TitleQueue::new(config.feed.max_pending, config.feed.history);
    let measure = MonospaceMeasure::for_font(config.font.size, config.font.advance_ratio);

    // Stand-in for the segmenter: republishes a swaying silhouette at ~15 Hz.
    let masks = MaskSlot::new();
    let segmenting = Arc::new(AtomicBool::new(true));
    let segmenter = {
        let masks = Arc::clone(&masks);
        let segmenting = Arc::clone(&segmenting);
        std::thread::spawn(move || {
            let start = Instant::now();
            while segmenting.load(Ordering::Relaxed) {
                let sway = (start.elapsed().as_secs_f32() * 1.3).sin() * 40.0;
                masks.publish(silhouette(sway));
                std::thread::sleep(Duration::from_millis(66));
            }
        })
    };

    let mut animator = Animator::new(
        simulation,
        queue,
        measure,
        Arc::clone(&masks),
        FrameClock::from_config(&config.frame),
    )
    .with_feed(feed);

    let stop = animator.stop_handle();
    let timer = std::thread::spawn(move || {
        std::thread::sleep(RUN_FOR);
        stop.stop();
    });

    info!(seed, "running for {} seconds", RUN_FOR.as_secs());
    let started = Instant::now();
    let frames = animator.run();
    let elapsed = started.elapsed();

    segmenting.store(false, Ordering::Relaxed);
    if timer.join().is_err() || segmenter.join().is_err() {
        error!("helper thread panicked");
    }

    let stats = *animator.clock().stats();
    let sim = animator.simulation();
    println!("┌─ RESULTS ───────────────────────────────────────────────────────┐");
    println!("│ Frames:             {frames} in {:.2}s", elapsed.as_secs_f64());
    println!("│ Mean Frame Work:    {} μs", stats.mean().as_micros());
    println!("│ Worst Frame Work:   {} μs", stats.worst.as_micros());
    println!("│ Late Frames:        {}", stats.late);
    println!("│ Live Glyphs:        {}", sim.particles().len());
    println!("│ Pending Strings:    {}", animator.queue().len());
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let mut preview = AsciiPreview::new(surface, 80);
    let mask = masks.latest();
    preview.draw(animator.simulation().particles(), mask.as_deref());
    print!("{}", preview.render());

    ExitCode::SUCCESS
}
