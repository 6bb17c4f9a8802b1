//! # Mask Slot
//!
//! Latest-snapshot handoff between the segmentation side and the frame loop.
//!
//! ```text
//! ┌──────────────┐  publish   ┌──────────────┐  latest   ┌──────────────┐
//! │  Segmenter   │ ─────────▶ │   MaskSlot   │ ◀──────── │  Frame loop  │
//! │ (own cadence)│            │ Option<Arc>  │           │  (60 Hz)     │
//! └──────────────┘            └──────────────┘           └──────────────┘
//! ```
//!
//! Readers clone an `Arc` under a read lock held for a pointer copy, so the
//! frame loop never waits on mask production. A reader may see the previous
//! snapshot for a frame; that is expected.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glyphfall_core::{MaskProvider, OccupancyMask};
use parking_lot::RwLock;
use tracing::debug;

/// Shared slot holding the most recently published mask.
#[derive(Debug, Default)]
pub struct MaskSlot {
    current: RwLock<Option<Arc<OccupancyMask>>>,
    generation: AtomicU64,
}

impl MaskSlot {
    /// Creates an empty slot (no collisions until the first publish).
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replaces the current snapshot.
    pub fn publish(&self, mask: OccupancyMask) {
        self.publish_arc(Arc::new(mask));
    }

    /// Replaces the current snapshot with an already shared mask.
    pub fn publish_arc(&self, mask: Arc<OccupancyMask>) {
        debug!(width = mask.width(), height = mask.height(), "mask published");
        *self.current.write() = Some(mask);
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Drops the current snapshot. Collisions stop until the next publish.
    pub fn clear(&self) {
        *self.current.write() = None;
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Number of publishes and clears so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl MaskProvider for MaskSlot {
    fn latest(&self) -> Option<Arc<OccupancyMask>> {
        self.current.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slot_has_no_mask() {
        let slot = MaskSlot::new();
        assert!(slot.latest().is_none());
        assert_eq!(slot.generation(), 0);
    }

    #[test]
    fn test_latest_snapshot_wins() {
        let slot = MaskSlot::new();
        slot.publish(OccupancyMask::empty(4, 4));
        slot.publish(OccupancyMask::from_fn(8, 2, |_, _| true));

        let mask = slot.latest().unwrap();
        assert_eq!(mask.width(), 8);
        assert_eq!(slot.generation(), 2);

        slot.clear();
        assert!(slot.latest().is_none());
    }

    #[test]
    fn test_reader_keeps_old_snapshot_alive() {
        let slot = MaskSlot::new();
        slot.publish(OccupancyMask::from_fn(2, 2, |_, _| true));
        let held = slot.latest().unwrap();
        slot.publish(OccupancyMask::empty(2, 2));
        assert_eq!(held.occupied_count(), 4);
    }

    #[test]
    fn test_publish_from_another_thread() {
        let slot = MaskSlot::new();
        let writer = Arc::clone(&slot);
        std::thread::spawn(move || writer.publish(OccupancyMask::empty(3, 3)))
            .join()
            .unwrap();
        assert_eq!(slot.latest().map(|m| m.height()), Some(3));
    }
}
