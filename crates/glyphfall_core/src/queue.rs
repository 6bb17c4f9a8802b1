//! # Text Queue
//!
//! The scheduler reads strings by index and asks for removal once a string
//! is exhausted or unusable. That is the only mutation it ever requests.
//!
//! [`TitleQueue`] is the in-process implementation: it deduplicates by
//! content against a bounded history of everything it has accepted, so a
//! polling source that keeps returning the same strings does not replay them.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

/// Read/consume view of the pending strings.
pub trait TextQueue {
    /// Number of pending strings.
    fn len(&self) -> usize;

    /// True when nothing is pending.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The string at `index`, if any.
    fn get(&self, index: usize) -> Option<&str>;

    /// Removes the string at `index`. Out-of-range indices are ignored.
    fn remove(&mut self, index: usize);
}

impl TextQueue for Vec<String> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get(&self, index: usize) -> Option<&str> {
        self.as_slice().get(index).map(String::as_str)
    }

    fn remove(&mut self, index: usize) {
        if index < Vec::len(self) {
            Vec::remove(self, index);
        }
    }
}

impl TextQueue for VecDeque<String> {
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn get(&self, index: usize) -> Option<&str> {
        VecDeque::get(self, index).map(String::as_str)
    }

    fn remove(&mut self, index: usize) {
        let _ = VecDeque::remove(self, index);
    }
}

/// Deduplicating FIFO of strings waiting to be emitted.
#[derive(Debug)]
pub struct TitleQueue {
    pending: VecDeque<String>,
    seen: HashSet<String>,
    seen_order: VecDeque<String>,
    max_pending: usize,
    history: usize,
}

impl TitleQueue {
    /// Creates a queue holding at most `max_pending` strings and remembering
    /// the last `history` accepted strings for deduplication.
    #[must_use]
    pub fn new(max_pending: usize, history: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(max_pending),
            seen: HashSet::with_capacity(history),
            seen_order: VecDeque::with_capacity(history),
            max_pending,
            history: history.max(max_pending),
        }
    }

    /// Offers a polled batch. Strings already seen, or arriving while the
    /// queue is full, are dropped. Returns how many were accepted.
    pub fn offer<I, S>(&mut self, batch: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut accepted = 0;
        for text in batch {
            let text = text.into();
            if self.seen.contains(&text) {
                continue;
            }
            if self.pending.len() >= self.max_pending {
                debug!(pending = self.pending.len(), "title queue full, dropping rest of batch");
                break;
            }
            self.remember(text.clone());
            self.pending.push_back(text);
            accepted += 1;
        }
        accepted
    }

    /// Pending strings, front first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    /// Whether `text` is still inside the deduplication window.
    #[must_use]
    pub fn has_seen(&self, text: &str) -> bool {
        self.seen.contains(text)
    }

    fn remember(&mut self, text: String) {
        if self.seen_order.len() >= self.history {
            if let Some(oldest) = self.seen_order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(text.clone());
        self.seen_order.push_back(text);
    }
}

impl Default for TitleQueue {
    fn default() -> Self {
        Self::new(64, 512)
    }
}

impl TextQueue for TitleQueue {
    fn len(&self) -> usize {
        self.pending.len()
    }

    fn get(&self, index: usize) -> Option<&str> {
        self.pending.get(index).map(String::as_str)
    }

    fn remove(&mut self, index: usize) {
        let _ = self.pending.remove(index);
    }
}
