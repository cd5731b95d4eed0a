//! Per-session load tracking and least-loaded selection

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Live count of in-flight streams per session
///
/// All operations are lock-free; counters are only touched through atomic
/// increments and decrements.
#[derive(Debug)]
pub struct LoadTracker {
    loads: Vec<AtomicUsize>,
}

impl LoadTracker {
    /// Create a tracker for `sessions` sessions, all idle
    pub fn new(sessions: usize) -> Self {
        LoadTracker {
            loads: (0..sessions).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    /// Number of tracked sessions
    pub fn len(&self) -> usize {
        self.loads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }

    /// Index of the least-loaded session, ties going to the lowest index
    pub fn select(&self) -> usize {
        self.select_excluding(&[]).unwrap_or(0)
    }

    /// Least-loaded session not in `excluded`, if any remain
    pub fn select_excluding(&self, excluded: &[usize]) -> Option<usize> {
        self.loads
            .iter()
            .enumerate()
            .filter(|(index, _)| !excluded.contains(index))
            .map(|(index, load)| (load.load(Ordering::Acquire), index))
            .min()
            .map(|(_, index)| index)
    }

    /// Current load of one session
    pub fn load(&self, index: usize) -> usize {
        self.loads
            .get(index)
            .map(|l| l.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Mark a stream as started on `index`
    pub fn begin(&self, index: usize) {
        if let Some(load) = self.loads.get(index) {
            load.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Mark a stream as finished on `index`
    ///
    /// Never drops below zero; an unmatched call is logged and ignored.
    pub fn end(&self, index: usize) {
        let Some(load) = self.loads.get(index) else {
            return;
        };
        let result = load.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            current.checked_sub(1)
        });
        if result.is_err() {
            warn!("Unmatched end() for idle session {}", index);
        }
    }

    /// Begin a stream and return a guard that ends it when dropped
    pub fn acquire(self: &Arc<Self>, index: usize) -> LoadGuard {
        self.begin(index);
        LoadGuard {
            tracker: Arc::clone(self),
            index,
        }
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> Vec<usize> {
        self.loads
            .iter()
            .map(|l| l.load(Ordering::Acquire))
            .collect()
    }

    /// Sum of all counters
    pub fn total(&self) -> usize {
        self.snapshot().iter().sum()
    }
}

/// Releases one unit of load on drop
///
/// Held by the chunk stream so the release happens on completion, error and
/// client disconnect alike.
#[derive(Debug)]
pub struct LoadGuard {
    tracker: Arc<LoadTracker>,
    index: usize,
}

impl LoadGuard {
    /// Session this guard accounts against
    pub fn session_index(&self) -> usize {
        self.index
    }
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        self.tracker.end(self.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_prefers_lowest_index_on_tie() {
        let tracker = LoadTracker::new(3);
        assert_eq!(tracker.select(), 0);
    }

    #[test]
    fn test_select_least_loaded() {
        let tracker = LoadTracker::new(3);
        tracker.begin(0);
        tracker.begin(0);
        tracker.begin(1);
        assert_eq!(tracker.select(), 2);

        tracker.begin(2);
        tracker.begin(2);
        assert_eq!(tracker.select(), 1);
    }

    #[test]
    fn test_begin_end_round_trip() {
        let tracker = LoadTracker::new(2);
        tracker.begin(1);
        let before = tracker.load(1);
        tracker.begin(1);
        tracker.end(1);
        assert_eq!(tracker.load(1), before);
    }

    #[test]
    fn test_end_never_underflows() {
        let tracker = LoadTracker::new(1);
        tracker.end(0);
        assert_eq!(tracker.load(0), 0);
    }

    #[test]
    fn test_select_excluding() {
        let tracker = LoadTracker::new(3);
        assert_eq!(tracker.select_excluding(&[0]), Some(1));
        assert_eq!(tracker.select_excluding(&[0, 1]), Some(2));
        assert_eq!(tracker.select_excluding(&[0, 1, 2]), None);
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let tracker = Arc::new(LoadTracker::new(2));
        {
            let guard = tracker.acquire(1);
            assert_eq!(guard.session_index(), 1);
            assert_eq!(tracker.load(1), 1);
            assert_eq!(tracker.select(), 0);
        }
        assert_eq!(tracker.load(1), 0);
        assert_eq!(tracker.total(), 0);
    }

    #[test]
    fn test_concurrent_guards_balance() {
        let tracker = Arc::new(LoadTracker::new(4));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let index = tracker.select();
                        let _guard = tracker.acquire(index);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.snapshot(), vec![0, 0, 0, 0]);
    }
}
