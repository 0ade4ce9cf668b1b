//! Miscellaneous utility structs and functions.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A time series of per-step samples which keeps at most `capacity` entries,
/// discarding the oldest once full.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawHistory<T>", bound(deserialize = "T: Deserialize<'de>"))]
pub struct History<T> {
    capacity: usize,
    samples: VecDeque<T>,
}

/// The stored form of a [History], checked on load.
#[derive(Deserialize)]
struct RawHistory<T> {
    capacity: usize,
    samples: VecDeque<T>,
}

impl<T> From<RawHistory<T>> for History<T> {
    fn from(raw: RawHistory<T>) -> Self {
        let mut history = History::new(raw.capacity);
        let excess = raw.samples.len().saturating_sub(history.capacity);
        history.samples = raw.samples;
        history.samples.drain(..excess);
        history
    }
}

impl<T> History<T> {
    /// Creates an empty history holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: VecDeque::new(),
        }
    }

    /// Appends a sample.
    pub fn push(&mut self, sample: T) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// The most recent sample.
    pub fn latest(&self) -> Option<&T> {
        self.samples.back()
    }

    /// The number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The maximum number of retained samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates over the retained samples, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.samples.iter()
    }
}

impl<T: Copy + Default> History<T> {
    /// The most recent sample, or the default value if there is none.
    pub fn last_or_default(&self) -> T {
        self.latest().copied().unwrap_or_default()
    }
}
