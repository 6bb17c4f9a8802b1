//! # Glyphfall Runtime
//!
//! Wires the pure [`glyphfall_core`] simulation to its collaborators.
//!
//! ## Threads
//!
//! ```text
//! ┌──────────────┐                         ┌──────────────┐
//! │  Segmenter   │ ── publish ──▶ MaskSlot │              │
//! └──────────────┘                    │    │   Animator   │ ──▶ renderer
//! ┌──────────────┐                    └──▶ │ (frame loop) │
//! │ Feed poller  │ ── batches ──▶ channel ▶│              │
//! └──────────────┘                         └──────────────┘
//! ```
//!
//! Only the animator's thread ever touches the particle store. The other
//! two hand over data and never wait on it.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod feed;
pub mod frame_loop;
pub mod mask_slot;
pub mod preview;

pub use feed::{FeedError, FeedPoller, FeedStats, LinesFileSource, StaticSource, TextSource};
pub use frame_loop::{Animator, Frame, FrameClock, FrameStats, SpawnToggle, StopHandle};
pub use mask_slot::MaskSlot;
pub use preview::AsciiPreview;
