//! Single-threaded timer queue
//!
//! Every delayed callback in the game (round clock, feedback delay, reconnect
//! backoff, ...) is an entry here. Nothing fires on its own: the owner polls
//! with the current time and handles whatever is due. Due entries come out
//! ordered by deadline, then by the order they were scheduled.

/// Handle for cancelling a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Entry<K> {
    id: TimerId,
    at: f64,
    kind: K,
}

/// Deadline-ordered queue of pending timers
#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    entries: Vec<Entry<K>>,
    next_id: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Schedule `kind` to fire once the clock reaches `at`
    pub fn schedule(&mut self, at: f64, kind: K) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        // Keep sorted by (deadline, id); ties stay in scheduling order
        let pos = self.entries.partition_point(|e| e.at <= at);
        self.entries.insert(pos, Entry { id, at, kind });
        id
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Cancel every timer whose kind matches
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !pred(&e.kind));
        before - self.entries.len()
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove and return the earliest timer due at `now` with its deadline
    pub fn pop_due(&mut self, now: f64) -> Option<(f64, K)> {
        match self.entries.first() {
            Some(first) if first.at <= now => {
                let entry = self.entries.remove(0);
                Some((entry.at, entry.kind))
            }
            _ => None,
        }
    }

    /// Deadline of the earliest pending timer
    pub fn next_deadline(&self) -> Option<f64> {
        self.entries.first().map(|e| e.at)
    }

    pub fn contains(&self, mut pred: impl FnMut(&K) -> bool) -> bool {
        self.entries.iter().any(|e| pred(&e.kind))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_due_orders_by_deadline_then_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule(200.0, "late");
        q.schedule(100.0, "first");
        q.schedule(100.0, "second");

        assert!(q.pop_due(99.0).is_none());
        assert_eq!(q.pop_due(250.0), Some((100.0, "first")));
        assert_eq!(q.pop_due(250.0).map(|(_, k)| k), Some("second"));
        assert_eq!(q.pop_due(250.0).map(|(_, k)| k), Some("late"));
        assert!(q.is_empty());
    }

    #[test]
    fn test_cancel() {
        let mut q = TimerQueue::new();
        let a = q.schedule(10.0, 1);
        q.schedule(20.0, 2);

        assert!(q.cancel(a));
        assert!(!q.cancel(a));
        assert_eq!(q.next_deadline(), Some(20.0));
    }

    #[test]
    fn test_cancel_where_and_clear() {
        let mut q = TimerQueue::new();
        q.schedule(10.0, 1);
        q.schedule(20.0, 2);
        q.schedule(30.0, 1);

        assert_eq!(q.cancel_where(|k| *k == 1), 2);
        assert_eq!(q.len(), 1);
        assert!(q.contains(|k| *k == 2));

        q.clear();
        assert!(q.next_deadline().is_none());
    }
}
