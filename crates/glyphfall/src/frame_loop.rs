//! # Frame Loop
//!
//! Fixed-rate driver for the simulation.
//!
//! ## Design
//!
//! Each frame, in order:
//! - Drain the text feed into the queue
//! - Read the latest mask snapshot (never wait for a new one)
//! - Run exactly one simulation tick with the real elapsed time
//!
//! Stopping is deterministic: once [`StopHandle::stop`] returns, at most the
//! tick already in flight completes and the particle store is never touched
//! again by this animator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glyphfall_core::{FrameConfig, MaskProvider, Measure, Simulation, TickReport, TitleQueue};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace, warn};

use crate::feed::FeedPoller;

/// Paces frames at a fixed rate and measures the work done in each.
///
/// The clock hands out the real time between frame starts as the frame's
/// `dt`; the simulation never reads the wall clock itself.
#[derive(Debug)]
pub struct FrameClock {
    budget: Duration,
    previous: Option<Instant>,
    stats: FrameStats,
}

/// Work time per frame, as measured by [`FrameClock`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames finished.
    pub frames: u64,
    /// Frames whose work took longer than the budget.
    pub late: u64,
    /// Longest work time seen.
    pub worst: Duration,
    /// Work time summed over every frame.
    pub total: Duration,
}

impl FrameStats {
    /// Mean work time per frame, zero before the first frame.
    #[must_use]
    pub fn mean(&self) -> Duration {
        u32::try_from(self.frames)
            .ok()
            .filter(|&n| n > 0)
            .map_or(Duration::ZERO, |n| self.total / n)
    }

    fn record(&mut self, work: Duration, budget: Duration) -> bool {
        self.frames += 1;
        self.total += work;
        self.worst = self.worst.max(work);
        let late = work > budget;
        self.late += u64::from(late);
        late
    }
}

/// A frame in progress, returned by [`FrameClock::begin`].
#[derive(Clone, Copy, Debug)]
pub struct Frame {
    started: Instant,
    /// Real time since the previous frame began; zero for the first.
    pub dt: Duration,
}

impl FrameClock {
    /// Creates a clock targeting `fps` frames per second.
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self {
            budget: Duration::from_secs(1) / fps.max(1),
            previous: None,
            stats: FrameStats::default(),
        }
    }

    /// Creates a clock from the frame configuration.
    #[must_use]
    pub fn from_config(config: &FrameConfig) -> Self {
        Self::new(config.target_fps)
    }

    /// Target frame duration.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        self.budget
    }

    /// Work statistics so far.
    #[must_use]
    pub const fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Forgets the previous frame, so the next `dt` starts from zero.
    pub fn restart(&mut self) {
        self.previous = None;
    }

    /// Starts a frame.
    pub fn begin(&mut self) -> Frame {
        let now = Instant::now();
        let dt = self
            .previous
            .map_or(Duration::ZERO, |previous| now.duration_since(previous));
        self.previous = Some(now);
        Frame { started: now, dt }
    }

    /// Finishes a frame and records how long its work took.
    pub fn finish(&mut self, frame: Frame) {
        let work = frame.started.elapsed();
        if self.stats.record(work, self.budget) {
            warn!(
                frame = self.stats.frames,
                work_us = work.as_micros() as u64,
                budget_us = self.budget.as_micros() as u64,
                "frame over budget"
            );
        }
    }

    /// Sleeps until the next frame is due. Returns at once when the
    /// previous frame already used up its budget.
    pub fn wait(&self) {
        let Some(previous) = self.previous else {
            return;
        };
        let due = previous + self.budget;
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(60)
    }
}

/// Cancels an [`Animator`] from any thread.
#[derive(Clone, Debug)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Requests the animator to stop before its next tick.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Pauses and resumes emission on an [`Animator`] from any thread.
/// Particles already falling are unaffected.
#[derive(Clone, Debug)]
pub struct SpawnToggle {
    spawning: Arc<AtomicBool>,
}

impl SpawnToggle {
    /// Resumes or pauses emission from the next frame on.
    pub fn set(&self, spawning: bool) {
        self.spawning.store(spawning, Ordering::SeqCst);
    }

    /// Whether emission is on.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.spawning.load(Ordering::SeqCst)
    }
}

/// Drives a [`Simulation`] once per frame from a queue, a mask provider and
/// an optional text feed.
pub struct Animator<M, P, R = ChaCha8Rng> {
    simulation: Simulation<R>,
    queue: TitleQueue,
    measure: M,
    masks: P,
    feed: Option<FeedPoller>,
    clock: FrameClock,
    stopped: Arc<AtomicBool>,
    spawning: Arc<AtomicBool>,
}

impl<M, P, R> Animator<M, P, R>
where
    M: Measure,
    P: MaskProvider,
    R: Rng,
{
    /// Creates an animator.
    #[must_use]
    pub fn new(
        simulation: Simulation<R>,
        queue: TitleQueue,
        measure: M,
        masks: P,
        clock: FrameClock,
    ) -> Self {
        let spawning = Arc::new(AtomicBool::new(simulation.is_spawning()));
        Self {
            simulation,
            queue,
            measure,
            masks,
            feed: None,
            clock,
            stopped: Arc::new(AtomicBool::new(false)),
            spawning,
        }
    }

    /// Attaches a feed whose batches are drained into the queue each frame.
    #[must_use]
    pub fn with_feed(mut self, feed: FeedPoller) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Handle that stops this animator.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stopped: Arc::clone(&self.stopped),
        }
    }

    /// Whether a stop was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Handle that pauses and resumes emission.
    #[must_use]
    pub fn spawn_toggle(&self) -> SpawnToggle {
        SpawnToggle {
            spawning: Arc::clone(&self.spawning),
        }
    }

    /// The simulation.
    #[must_use]
    pub fn simulation(&self) -> &Simulation<R> {
        &self.simulation
    }

    /// Mutable access to the simulation (resize, diagnostics).
    pub fn simulation_mut(&mut self) -> &mut Simulation<R> {
        &mut self.simulation
    }

    /// The pending strings.
    #[must_use]
    pub fn queue(&self) -> &TitleQueue {
        &self.queue
    }

    /// Mutable access to the pending strings.
    pub fn queue_mut(&mut self) -> &mut TitleQueue {
        &mut self.queue
    }

    /// Frame pacing state.
    #[must_use]
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Runs one frame with the given elapsed time. Returns `None` without
    /// touching anything once stopped.
    pub fn step(&mut self, dt: Duration) -> Option<TickReport> {
        if self.is_stopped() {
            return None;
        }
        if let Some(feed) = &self.feed {
            feed.drain_into(&mut self.queue);
        }
        let spawning = self.spawning.load(Ordering::SeqCst);
        if spawning != self.simulation.is_spawning() {
            debug!(spawning, "emission toggled");
            self.simulation.set_spawning(spawning);
        }
        let mask = self.masks.latest();
        let report = self
            .simulation
            .tick(dt, &mut self.queue, &self.measure, mask.as_deref());
        trace!(
            frame = report.frame,
            spawned = report.spawned,
            live = report.live,
            "frame"
        );
        Some(report)
    }

    /// Runs up to `frames` frames of `dt` each, back to back, with no
    /// pacing. Returns how many ran before a stop.
    pub fn run_frames(&mut self, frames: u64, dt: Duration) -> u64 {
        let mut ran = 0;
        while ran < frames && self.step(dt).is_some() {
            ran += 1;
        }
        ran
    }

    /// Runs paced frames in real time until stopped. Returns the number of
    /// frames run.
    pub fn run(&mut self) -> u64 {
        info!(
            frame_us = self.clock.budget().as_micros() as u64,
            "animation started"
        );
        self.clock.restart();
        let mut frames = 0;
        loop {
            self.clock.wait();
            let frame = self.clock.begin();
            if self.step(frame.dt).is_none() {
                break;
            }
            frames += 1;
            self.clock.finish(frame);
        }
        let stats = self.clock.stats();
        info!(
            frames,
            late = stats.late,
            mean_us = stats.mean().as_micros() as u64,
            "animation stopped"
        );
        frames
    }
}
